//! The editor: one view, one plugin registry, one undo history and one
//! injected store, wired together behind a host-facing event surface.

use crate::action::{ActionContext, ActionManager, ActionManagerConfig};
use crate::error::ActionError;
use crate::hotkeys::{HotkeyManager, HotkeyRequest};
use crate::input::{CallbackStatus, CanvasEvent, KeyEvent, PointerEvent, resolve_event_point};
use crate::model::ClassId;
use crate::registry::{AnnotationPlugin, PluginRegistry};
use crate::renderer::{
    BoundingBoxRenderer, CommentRenderer, CuboidRenderer, MaskRenderer, PolygonRenderer,
    PolylineRenderer, SkeletonRenderer,
};
use crate::serializer::{
    BoundingBoxSerializer, CommentSerializer, CuboidSerializer, MaskSerializer, PolygonSerializer,
    PolylineSerializer, SkeletonSerializer, TagSerializer,
};
use crate::store::Store;
use crate::tool::{
    BoundingBoxTool, BrushTool, CommentTool, CuboidTool, EditTool, PolygonTool, PolylineTool,
    SkeletonTemplate, SkeletonTool, Tool, ToolContext,
};
use crate::view::View;

/// Phase of a pointer gesture as reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerPhase {
    Start,
    Move,
    End,
}

pub struct Editor {
    pub registry: PluginRegistry,
    pub view: View,
    pub actions: ActionManager,
    pub hotkeys: HotkeyManager,
    store: Box<dyn Store>,
    class_id: ClassId,
}

impl Editor {
    pub fn new(view: View, store: Box<dyn Store>) -> Self {
        Self {
            registry: PluginRegistry::new(),
            view,
            actions: ActionManager::new(ActionManagerConfig::default()),
            hotkeys: HotkeyManager::new(),
            store,
            class_id: 0,
        }
    }

    /// Register the built-in plugin set: every shape kind plus the edit
    /// and brush tools.
    pub fn install_default_plugins(&mut self) {
        self.registry.activate(AnnotationPlugin {
            name: "bounding_box",
            renderer: Some(Box::new(BoundingBoxRenderer)),
            serializer: Some(Box::new(BoundingBoxSerializer)),
            tool: Some(Box::new(BoundingBoxTool::new())),
        });
        self.registry.activate(AnnotationPlugin {
            name: "polygon",
            renderer: Some(Box::new(PolygonRenderer)),
            serializer: Some(Box::new(PolygonSerializer)),
            tool: Some(Box::new(PolygonTool::new())),
        });
        self.registry.activate(AnnotationPlugin {
            name: "polyline",
            renderer: Some(Box::new(PolylineRenderer)),
            serializer: Some(Box::new(PolylineSerializer)),
            tool: Some(Box::new(PolylineTool::new())),
        });
        self.registry.activate(AnnotationPlugin {
            name: "skeleton",
            renderer: Some(Box::new(SkeletonRenderer)),
            serializer: Some(Box::new(SkeletonSerializer)),
            tool: Some(Box::new(SkeletonTool::new(SkeletonTemplate {
                nodes: Vec::new(),
            }))),
        });
        self.registry.activate(AnnotationPlugin {
            name: "cuboid",
            renderer: Some(Box::new(CuboidRenderer)),
            serializer: Some(Box::new(CuboidSerializer)),
            tool: Some(Box::new(CuboidTool::new())),
        });
        self.registry.activate(AnnotationPlugin {
            name: "commentator",
            renderer: Some(Box::new(CommentRenderer)),
            serializer: Some(Box::new(CommentSerializer)),
            tool: Some(Box::new(CommentTool::new())),
        });
        self.registry.activate(AnnotationPlugin {
            name: "mask",
            renderer: Some(Box::new(MaskRenderer)),
            serializer: Some(Box::new(MaskSerializer)),
            tool: Some(Box::new(BrushTool::new())),
        });
        self.registry.activate(AnnotationPlugin {
            name: "tag",
            renderer: None,
            serializer: Some(Box::new(TagSerializer)),
            tool: None,
        });
        self.registry.activate(AnnotationPlugin {
            name: "edit",
            renderer: None,
            serializer: None,
            tool: Some(Box::new(EditTool::new())),
        });
    }

    pub fn active_class(&self) -> ClassId {
        self.class_id
    }

    pub fn set_active_class(&mut self, class_id: ClassId) {
        self.class_id = class_id;
    }

    pub fn activate_tool(&mut self, name: &str) -> bool {
        // activate/deactivate receive a context without the registry's
        // renderer map; the map cannot alias the registry borrow held by
        // `activate_tool`.
        let renderers = std::collections::HashMap::new();
        let mut ctx = ToolContext {
            view: &mut self.view,
            store: self.store.as_mut(),
            actions: &mut self.actions,
            renderers: &renderers,
            class_id: self.class_id,
        };
        self.registry.activate_tool(name, &mut ctx)
    }

    // ========================================================================
    // Event Dispatch
    // ========================================================================

    /// Route a canvas event to the active tool. Positional events are
    /// translated to image space through the camera first.
    pub fn handle_event(&mut self, event: &CanvasEvent, phase: PointerPhase) -> CallbackStatus {
        match event {
            CanvasEvent::Key(key) => self.handle_key(key),
            _ => match resolve_event_point(event) {
                Some(canvas_point) => {
                    let pointer = match event {
                        CanvasEvent::Pointer(pointer) => *pointer,
                        _ => PointerEvent::left(canvas_point),
                    };
                    self.handle_pointer(phase, &pointer)
                }
                None => CallbackStatus::Continue,
            },
        }
    }

    pub fn handle_pointer(&mut self, phase: PointerPhase, event: &PointerEvent) -> CallbackStatus {
        let point = self.view.camera.canvas_to_image(event.position);
        self.with_active_tool(|tool, ctx| match phase {
            PointerPhase::Start => tool.on_start(point, event, ctx),
            PointerPhase::Move => tool.on_move(point, event, ctx),
            PointerPhase::End => tool.on_end(point, event, ctx),
        })
    }

    /// Keys go to the active tool first; unconsumed keys fall through to
    /// the dataset hotkey map.
    pub fn handle_key(&mut self, event: &KeyEvent) -> CallbackStatus {
        let status = self.with_active_tool(|tool, ctx| tool.on_key(event, ctx));
        if status == CallbackStatus::Stop {
            return status;
        }
        match self.hotkeys.resolve(&event.key) {
            Some(HotkeyRequest::SelectClass(class_id)) => {
                self.set_active_class(class_id);
                CallbackStatus::Stop
            }
            Some(HotkeyRequest::ActivateTool(name)) => {
                self.activate_tool(&name);
                CallbackStatus::Stop
            }
            None => CallbackStatus::Continue,
        }
    }

    /// The take/put dance keeps the active tool out of the registry while
    /// it runs, so its context can borrow the registry's renderer map.
    fn with_active_tool(
        &mut self,
        f: impl FnOnce(&mut dyn Tool, &mut ToolContext) -> CallbackStatus,
    ) -> CallbackStatus {
        let Some(name) = self.registry.active_tool().map(str::to_string) else {
            return CallbackStatus::Continue;
        };
        let Some(mut tool) = self.registry.take_tool(&name) else {
            return CallbackStatus::Continue;
        };
        let mut ctx = ToolContext {
            view: &mut self.view,
            store: self.store.as_mut(),
            actions: &mut self.actions,
            renderers: self.registry.renderers(),
            class_id: self.class_id,
        };
        let status = f(tool.as_mut(), &mut ctx);
        self.registry.put_tool(tool);
        status
    }

    // ========================================================================
    // History
    // ========================================================================

    pub fn undo(&mut self) -> Result<bool, ActionError> {
        let mut ctx = ActionContext {
            view: &mut self.view,
            store: self.store.as_mut(),
        };
        self.actions.undo(&mut ctx)
    }

    pub fn redo(&mut self) -> Result<bool, ActionError> {
        let mut ctx = ActionContext {
            view: &mut self.view,
            store: self.store.as_mut(),
        };
        self.actions.redo(&mut ctx)
    }

    // ========================================================================
    // Render Pass
    // ========================================================================

    /// Refresh every annotation's render-path cache and clear the dirty
    /// layer flags. Hosts call this once per frame when any layer is
    /// dirty; actual drawing happens outside the engine.
    pub fn render(&mut self) {
        let view_ctx = self.view.context();
        for annotation in self.view.annotations.iter_mut() {
            let Some(renderer) = self.registry.renderers().get(&annotation.kind) else {
                continue;
            };
            let inferred = !annotation.infer_video_data(view_ctx.frame_index, None).keyframe;
            renderer.render(&view_ctx, annotation, inferred, None);
        }
        self.view.annotations.clear_dirty();
        self.view.rasters.clear_dirty();
        self.view.clear_overlay_dirty();
    }
}

// ============================================================================
// Tests
// ============================================================================
