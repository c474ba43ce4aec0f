//! Polygon drawing tool: one vertex per click, closed by clicking near
//! the first vertex or pressing enter.

use crate::action::AddAnnotation;
use crate::geometry::ImagePoint;
use crate::input::{CallbackStatus, KeyEvent, PointerEvent};
use crate::model::{Annotation, AnnotationData, AnnotationKind, PolygonData};
use crate::store::Ability;
use crate::tool::{payload_for_view, Tool, ToolContext, POLYGON_CLOSE_THRESHOLD};

#[derive(Debug, Default, Clone)]
struct Draft {
    vertices: Vec<ImagePoint>,
    /// Live cursor position for the rubber-band edge preview.
    cursor: Option<ImagePoint>,
}

#[derive(Default)]
pub struct PolygonTool {
    draft: Draft,
}

impl PolygonTool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current draft outline, primary path plus the cursor preview.
    pub fn preview(&self) -> Vec<ImagePoint> {
        let mut path = self.draft.vertices.clone();
        if let Some(cursor) = self.draft.cursor {
            path.push(cursor);
        }
        path
    }

    fn commit(&mut self, ctx: &mut ToolContext) -> CallbackStatus {
        let draft = std::mem::take(&mut self.draft);
        if draft.vertices.len() < 3 {
            return CallbackStatus::Continue;
        }
        if !ctx.check_ability(Ability::CreateAnnotation) {
            return CallbackStatus::Stop;
        }

        let interpolated = ctx
            .renderer(AnnotationKind::Polygon)
            .is_some_and(|r| r.interpolate_by_default());
        let data = AnnotationData::Polygon(PolygonData {
            path: draft.vertices,
            additional_paths: Vec::new(),
        });
        let payload = payload_for_view(ctx.view, data, interpolated);
        let annotation =
            Annotation::from_instance_params(ctx.view.annotations.next_id(), ctx.class_id, payload);

        match ctx.run_action(Box::new(AddAnnotation::new(annotation))) {
            Ok(_) => {}
            Err(error) => ctx.toast_error(&error),
        }
        CallbackStatus::Stop
    }
}

impl Tool for PolygonTool {
    fn name(&self) -> &'static str {
        "polygon_tool"
    }

    fn on_start(
        &mut self,
        point: ImagePoint,
        _event: &PointerEvent,
        ctx: &mut ToolContext,
    ) -> CallbackStatus {
        if let Some(first) = self.draft.vertices.first() {
            if self.draft.vertices.len() >= 3 && first.distance_to(&point) < POLYGON_CLOSE_THRESHOLD
            {
                return self.commit(ctx);
            }
        }
        self.draft.vertices.push(point);
        CallbackStatus::Stop
    }

    fn on_move(
        &mut self,
        point: ImagePoint,
        _event: &PointerEvent,
        _ctx: &mut ToolContext,
    ) -> CallbackStatus {
        if self.draft.vertices.is_empty() {
            return CallbackStatus::Continue;
        }
        self.draft.cursor = Some(point);
        CallbackStatus::Stop
    }

    fn on_end(
        &mut self,
        _point: ImagePoint,
        _event: &PointerEvent,
        _ctx: &mut ToolContext,
    ) -> CallbackStatus {
        // Vertices are placed on press; release is a no-op.
        CallbackStatus::Continue
    }

    fn on_key(&mut self, event: &KeyEvent, ctx: &mut ToolContext) -> CallbackStatus {
        match event.key.as_str() {
            "enter" if !self.draft.vertices.is_empty() => self.commit(ctx),
            "escape" if !self.draft.vertices.is_empty() => {
                self.cancel(ctx);
                CallbackStatus::Stop
            }
            _ => CallbackStatus::Continue,
        }
    }

    fn cancel(&mut self, _ctx: &mut ToolContext) {
        self.draft = Draft::default();
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::action::{ActionManager, ActionManagerConfig};
    use crate::geometry::CanvasPoint;
    use crate::model::AnnotationPayload;
    use crate::renderer::{PolygonRenderer, Renderer};
    use crate::store::MemoryStore;
    use crate::view::View;

    fn renderers() -> HashMap<AnnotationKind, Box<dyn Renderer>> {
        let mut map: HashMap<AnnotationKind, Box<dyn Renderer>> = HashMap::new();
        map.insert(AnnotationKind::Polygon, Box::new(PolygonRenderer));
        map
    }

    #[test]
    fn test_click_near_first_vertex_closes_polygon() {
        let mut view = View::new(1, 200, 200, 1);
        let mut store = MemoryStore::new();
        let mut actions = ActionManager::new(ActionManagerConfig::default());
        let renderers = renderers();
        let mut ctx = ToolContext {
            view: &mut view,
            store: &mut store,
            actions: &mut actions,
            renderers: &renderers,
            class_id: 0,
        };

        let event = PointerEvent::left(CanvasPoint::new(0.0, 0.0));
        let mut tool = PolygonTool::new();
        for p in [
            ImagePoint::new(0.0, 0.0),
            ImagePoint::new(40.0, 0.0),
            ImagePoint::new(40.0, 40.0),
        ] {
            tool.on_start(p, &event, &mut ctx);
        }
        // Close by clicking near the first vertex.
        tool.on_start(ImagePoint::new(2.0, 1.0), &event, &mut ctx);

        assert_eq!(ctx.view.annotations.len(), 1);
        let annotation = ctx.view.annotations.iter().next().unwrap();
        match &annotation.payload {
            AnnotationPayload::Image(AnnotationData::Polygon(data)) => {
                assert_eq!(data.path.len(), 3);
            }
            other => panic!("unexpected payload: {other:?}"),
        }
        assert!(tool.preview().is_empty());
    }

    #[test]
    fn test_escape_discards_draft() {
        let mut view = View::new(1, 200, 200, 1);
        let mut store = MemoryStore::new();
        let mut actions = ActionManager::new(ActionManagerConfig::default());
        let renderers = renderers();
        let mut ctx = ToolContext {
            view: &mut view,
            store: &mut store,
            actions: &mut actions,
            renderers: &renderers,
            class_id: 0,
        };

        let event = PointerEvent::left(CanvasPoint::new(0.0, 0.0));
        let mut tool = PolygonTool::new();
        tool.on_start(ImagePoint::new(0.0, 0.0), &event, &mut ctx);
        tool.on_start(ImagePoint::new(10.0, 0.0), &event, &mut ctx);

        let escape = KeyEvent {
            key: "escape".into(),
            shift: false,
            ctrl: false,
        };
        assert_eq!(tool.on_key(&escape, &mut ctx), CallbackStatus::Stop);
        assert!(tool.preview().is_empty());
        assert!(ctx.view.annotations.is_empty());
    }

    #[test]
    fn test_enter_with_too_few_vertices_creates_nothing() {
        let mut view = View::new(1, 200, 200, 1);
        let mut store = MemoryStore::new();
        let mut actions = ActionManager::new(ActionManagerConfig::default());
        let renderers = renderers();
        let mut ctx = ToolContext {
            view: &mut view,
            store: &mut store,
            actions: &mut actions,
            renderers: &renderers,
            class_id: 0,
        };

        let event = PointerEvent::left(CanvasPoint::new(0.0, 0.0));
        let mut tool = PolygonTool::new();
        tool.on_start(ImagePoint::new(0.0, 0.0), &event, &mut ctx);
        tool.on_start(ImagePoint::new(10.0, 0.0), &event, &mut ctx);

        let enter = KeyEvent {
            key: "enter".into(),
            shift: false,
            ctrl: false,
        };
        tool.on_key(&enter, &mut ctx);
        assert!(ctx.view.annotations.is_empty());
        // Draft is gone either way.
        assert!(tool.preview().is_empty());
    }
}
