//! The plugin registry.
//!
//! A plugin bundles the renderer, serializer and tool for one annotation
//! kind. Activation acquires every registration through a `PluginContext`
//! and keeps the resulting handles; deactivation releases exactly those
//! handles, so a plugin can never leave stray registrations behind. At
//! most one tool is active at a time.

use std::collections::HashMap;

use crate::input::{CallbackStatus, KeyEvent, PointerEvent};
use crate::geometry::ImagePoint;
use crate::model::AnnotationKind;
use crate::renderer::Renderer;
use crate::serializer::Serializer;
use crate::tool::{Tool, ToolContext};

/// One annotation kind's bundle of engine components. Tag-like kinds may
/// omit the renderer or tool.
pub struct AnnotationPlugin {
    pub name: &'static str,
    pub renderer: Option<Box<dyn Renderer>>,
    pub serializer: Option<Box<dyn Serializer>>,
    pub tool: Option<Box<dyn Tool>>,
}

/// Token for one registration, released on plugin deactivation.
#[derive(Debug, Clone, PartialEq, Eq)]
enum RegistrationHandle {
    Renderer(AnnotationKind),
    Serializer(AnnotationKind),
    Tool(String),
    Command(String),
}

/// A command a plugin exposes by name, e.g. `bounding_box_tool.cancel`.
enum Command {
    CancelTool(String),
}

#[derive(Default)]
pub struct PluginRegistry {
    renderers: HashMap<AnnotationKind, Box<dyn Renderer>>,
    serializers: HashMap<AnnotationKind, Box<dyn Serializer>>,
    tools: HashMap<String, Box<dyn Tool>>,
    commands: HashMap<String, Command>,
    /// Handles acquired by each activated plugin, keyed by plugin name.
    plugin_handles: HashMap<&'static str, Vec<RegistrationHandle>>,
    active_tool: Option<String>,
}

/// Scoped registration surface handed to a plugin during activation.
/// Everything registered through it is recorded and released together.
pub struct PluginContext<'a> {
    registry: &'a mut PluginRegistry,
    handles: Vec<RegistrationHandle>,
}

impl PluginContext<'_> {
    pub fn register_renderer(&mut self, renderer: Box<dyn Renderer>) {
        let kind = renderer.kind();
        if self.registry.renderers.insert(kind, renderer).is_some() {
            log::warn!("renderer for {kind} replaced an existing registration");
        }
        self.handles.push(RegistrationHandle::Renderer(kind));
    }

    pub fn register_serializer(&mut self, serializer: Box<dyn Serializer>) {
        let kind = serializer.kind();
        if self.registry.serializers.insert(kind, serializer).is_some() {
            log::warn!("serializer for {kind} replaced an existing registration");
        }
        self.handles.push(RegistrationHandle::Serializer(kind));
    }

    pub fn register_tool(&mut self, tool: Box<dyn Tool>) {
        let name = tool.name().to_string();
        self.registry.tools.insert(name.clone(), tool);
        // Every tool gets a cancel command under its own name.
        let command = format!("{name}.cancel");
        self.registry
            .commands
            .insert(command.clone(), Command::CancelTool(name.clone()));
        self.handles.push(RegistrationHandle::Command(command));
        self.handles.push(RegistrationHandle::Tool(name));
    }
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Plugin Lifecycle
    // ========================================================================

    /// Register the plugin's components. Re-activating a plugin releases
    /// its previous registrations first.
    pub fn activate(&mut self, mut plugin: AnnotationPlugin) {
        if self.plugin_handles.contains_key(plugin.name) {
            self.deactivate(plugin.name);
        }

        let mut ctx = PluginContext {
            registry: self,
            handles: Vec::new(),
        };
        if let Some(renderer) = plugin.renderer.take() {
            ctx.register_renderer(renderer);
        }
        if let Some(serializer) = plugin.serializer.take() {
            ctx.register_serializer(serializer);
        }
        if let Some(tool) = plugin.tool.take() {
            ctx.register_tool(tool);
        }
        let handles = ctx.handles;
        self.plugin_handles.insert(plugin.name, handles);
    }

    /// Release every registration the named plugin acquired.
    pub fn deactivate(&mut self, name: &str) {
        let Some(handles) = self.plugin_handles.remove(name) else {
            log::warn!("deactivate of unknown plugin {name}");
            return;
        };
        for handle in handles {
            match handle {
                RegistrationHandle::Renderer(kind) => self.unregister_renderer(kind),
                RegistrationHandle::Serializer(kind) => self.unregister_serializer(kind),
                RegistrationHandle::Tool(tool) => self.unregister_tool(&tool),
                RegistrationHandle::Command(command) => self.unregister_command(&command),
            }
        }
    }

    pub fn unregister_renderer(&mut self, kind: AnnotationKind) {
        self.renderers.remove(&kind);
    }

    pub fn unregister_serializer(&mut self, kind: AnnotationKind) {
        self.serializers.remove(&kind);
    }

    /// Remove a tool; an active tool loses activation with it.
    pub fn unregister_tool(&mut self, name: &str) {
        if self.active_tool.as_deref() == Some(name) {
            self.active_tool = None;
        }
        self.tools.remove(name);
    }

    pub fn unregister_command(&mut self, name: &str) {
        self.commands.remove(name);
    }

    // ========================================================================
    // Lookup
    // ========================================================================

    pub fn renderer(&self, kind: AnnotationKind) -> Option<&dyn Renderer> {
        self.renderers.get(&kind).map(|r| r.as_ref())
    }

    pub fn renderers(&self) -> &HashMap<AnnotationKind, Box<dyn Renderer>> {
        &self.renderers
    }

    pub fn serializer(&self, kind: AnnotationKind) -> Option<&dyn Serializer> {
        self.serializers.get(&kind).map(|s| s.as_ref())
    }

    pub fn active_tool(&self) -> Option<&str> {
        self.active_tool.as_deref()
    }

    // ========================================================================
    // Tool Activation & Dispatch
    // ========================================================================

    /// Make `name` the active tool, deactivating the previous one first.
    pub fn activate_tool(&mut self, name: &str, ctx: &mut ToolContext) -> bool {
        if !self.tools.contains_key(name) {
            log::warn!("activate of unknown tool {name}");
            return false;
        }
        if self.active_tool.as_deref() == Some(name) {
            return true;
        }
        if let Some(previous) = self.active_tool.take() {
            self.with_tool(&previous, |tool| {
                tool.deactivate(ctx);
                CallbackStatus::Continue
            });
        }
        self.active_tool = Some(name.to_string());
        self.with_tool(name, |tool| {
            tool.activate(ctx);
            CallbackStatus::Continue
        });
        true
    }

    /// Take a tool out of the registry for a dispatch call. The caller
    /// must `put_tool` it back; taking it out lets the tool context
    /// borrow the registry's renderer map at the same time.
    pub fn take_tool(&mut self, name: &str) -> Option<Box<dyn Tool>> {
        self.tools.remove(name)
    }

    pub fn put_tool(&mut self, tool: Box<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    /// Run `f` against a tool taken out of the map for the duration of
    /// the call, so the tool can receive a context that borrows the rest
    /// of the engine.
    fn with_tool(
        &mut self,
        name: &str,
        f: impl FnOnce(&mut dyn Tool) -> CallbackStatus,
    ) -> CallbackStatus {
        let Some(mut tool) = self.tools.remove(name) else {
            return CallbackStatus::Continue;
        };
        let status = f(tool.as_mut());
        self.tools.insert(name.to_string(), tool);
        status
    }

    fn with_active_tool(
        &mut self,
        f: impl FnOnce(&mut dyn Tool) -> CallbackStatus,
    ) -> CallbackStatus {
        let Some(name) = self.active_tool.clone() else {
            return CallbackStatus::Continue;
        };
        self.with_tool(&name, f)
    }

    pub fn pointer_start(
        &mut self,
        point: ImagePoint,
        event: &PointerEvent,
        ctx: &mut ToolContext,
    ) -> CallbackStatus {
        self.with_active_tool(|tool| tool.on_start(point, event, ctx))
    }

    pub fn pointer_move(
        &mut self,
        point: ImagePoint,
        event: &PointerEvent,
        ctx: &mut ToolContext,
    ) -> CallbackStatus {
        self.with_active_tool(|tool| tool.on_move(point, event, ctx))
    }

    pub fn pointer_end(
        &mut self,
        point: ImagePoint,
        event: &PointerEvent,
        ctx: &mut ToolContext,
    ) -> CallbackStatus {
        self.with_active_tool(|tool| tool.on_end(point, event, ctx))
    }

    pub fn key(&mut self, event: &KeyEvent, ctx: &mut ToolContext) -> CallbackStatus {
        self.with_active_tool(|tool| tool.on_key(event, ctx))
    }

    /// Dispatch a registered command by name.
    pub fn dispatch_command(&mut self, name: &str, ctx: &mut ToolContext) -> bool {
        let Some(command) = self.commands.get(name) else {
            log::warn!("dispatch of unknown command {name}");
            return false;
        };
        match command {
            Command::CancelTool(tool) => {
                let tool = tool.clone();
                self.with_tool(&tool, |tool| {
                    tool.cancel(ctx);
                    CallbackStatus::Stop
                });
            }
        }
        true
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::{ActionManager, ActionManagerConfig};
    use crate::renderer::BoundingBoxRenderer;
    use crate::serializer::BoundingBoxSerializer;
    use crate::store::MemoryStore;
    use crate::tool::{BoundingBoxTool, EditTool};
    use crate::view::View;

    fn bounding_box_plugin() -> AnnotationPlugin {
        AnnotationPlugin {
            name: "bounding_box",
            renderer: Some(Box::new(BoundingBoxRenderer)),
            serializer: Some(Box::new(BoundingBoxSerializer)),
            tool: Some(Box::new(BoundingBoxTool::new())),
        }
    }

    fn edit_plugin() -> AnnotationPlugin {
        AnnotationPlugin {
            name: "edit",
            renderer: None,
            serializer: None,
            tool: Some(Box::new(EditTool::new())),
        }
    }

    #[test]
    fn test_deactivate_releases_every_registration() {
        let mut registry = PluginRegistry::new();
        registry.activate(bounding_box_plugin());
        assert!(registry.renderer(AnnotationKind::BoundingBox).is_some());
        assert!(registry.serializer(AnnotationKind::BoundingBox).is_some());
        assert!(registry.tools.contains_key("bounding_box_tool"));
        assert!(registry.commands.contains_key("bounding_box_tool.cancel"));

        registry.deactivate("bounding_box");
        assert!(registry.renderer(AnnotationKind::BoundingBox).is_none());
        assert!(registry.serializer(AnnotationKind::BoundingBox).is_none());
        assert!(registry.tools.is_empty());
        assert!(registry.commands.is_empty());
    }

    #[test]
    fn test_single_active_tool() {
        let mut registry = PluginRegistry::new();
        registry.activate(bounding_box_plugin());
        registry.activate(edit_plugin());

        let mut view = View::new(1, 100, 100, 1);
        let mut store = MemoryStore::new();
        let mut actions = ActionManager::new(ActionManagerConfig::default());
        let renderers = HashMap::new();
        let mut ctx = ToolContext {
            view: &mut view,
            store: &mut store,
            actions: &mut actions,
            renderers: &renderers,
            class_id: 0,
        };

        assert!(registry.activate_tool("bounding_box_tool", &mut ctx));
        assert_eq!(registry.active_tool(), Some("bounding_box_tool"));

        assert!(registry.activate_tool("edit_tool", &mut ctx));
        assert_eq!(registry.active_tool(), Some("edit_tool"));

        assert!(!registry.activate_tool("nope", &mut ctx));
        assert_eq!(registry.active_tool(), Some("edit_tool"));
    }

    #[test]
    fn test_cancel_command_aborts_gesture() {
        let mut registry = PluginRegistry::new();
        registry.activate(bounding_box_plugin());

        let mut view = View::new(1, 100, 100, 1);
        let mut store = MemoryStore::new();
        let mut actions = ActionManager::new(ActionManagerConfig::default());
        let renderers = HashMap::new();
        let mut ctx = ToolContext {
            view: &mut view,
            store: &mut store,
            actions: &mut actions,
            renderers: &renderers,
            class_id: 0,
        };

        registry.activate_tool("bounding_box_tool", &mut ctx);
        let event = PointerEvent::left(crate::geometry::CanvasPoint::new(0.0, 0.0));
        registry.pointer_start(ImagePoint::new(0.0, 0.0), &event, &mut ctx);
        registry.pointer_move(ImagePoint::new(50.0, 50.0), &event, &mut ctx);

        assert!(registry.dispatch_command("bounding_box_tool.cancel", &mut ctx));
        registry.pointer_end(ImagePoint::new(50.0, 50.0), &event, &mut ctx);
        assert!(ctx.view.annotations.is_empty());
    }
}
