//! Comment tool: drag a quad to anchor a new comment thread.

use crate::action::AddAnnotation;
use crate::geometry::{ImagePoint, Rect};
use crate::input::{CallbackStatus, KeyEvent, PointerEvent};
use crate::model::{Annotation, AnnotationData};
use crate::store::Ability;
use crate::tool::{payload_for_view, Tool, ToolContext, CLICK_THRESHOLD};

#[derive(Debug, Clone, Copy)]
struct Draft {
    anchor: ImagePoint,
    generation: u64,
}

#[derive(Default)]
pub struct CommentTool {
    draft: Option<Draft>,
    generation: u64,
}

impl CommentTool {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Tool for CommentTool {
    fn name(&self) -> &'static str {
        "commentator_tool"
    }

    fn on_start(
        &mut self,
        point: ImagePoint,
        _event: &PointerEvent,
        _ctx: &mut ToolContext,
    ) -> CallbackStatus {
        self.draft = Some(Draft {
            anchor: point,
            generation: self.generation,
        });
        CallbackStatus::Stop
    }

    fn on_move(
        &mut self,
        _point: ImagePoint,
        _event: &PointerEvent,
        _ctx: &mut ToolContext,
    ) -> CallbackStatus {
        if self.draft.is_some() {
            CallbackStatus::Stop
        } else {
            CallbackStatus::Continue
        }
    }

    fn on_end(
        &mut self,
        point: ImagePoint,
        _event: &PointerEvent,
        ctx: &mut ToolContext,
    ) -> CallbackStatus {
        let Some(draft) = self.draft.take() else {
            return CallbackStatus::Continue;
        };
        if draft.generation != self.generation {
            return CallbackStatus::Continue;
        }

        let rect = Rect::from_corners(draft.anchor, point);
        // A click or a straight-line quad anchors nothing.
        if draft.anchor.distance_to(&point) < CLICK_THRESHOLD || !rect.is_valid() {
            return CallbackStatus::Continue;
        }
        if !ctx.check_ability(Ability::CreateAnnotation) {
            return CallbackStatus::Stop;
        }

        let data = AnnotationData::Comment([
            rect.top_left(),
            rect.top_right(),
            rect.bottom_right(),
            rect.bottom_left(),
        ]);
        let payload = payload_for_view(ctx.view, data, false);
        let annotation =
            Annotation::from_instance_params(ctx.view.annotations.next_id(), ctx.class_id, payload);

        match ctx.run_action(Box::new(AddAnnotation::new(annotation))) {
            Ok(_) => {}
            Err(error) => ctx.toast_error(&error),
        }
        CallbackStatus::Stop
    }

    fn on_key(&mut self, event: &KeyEvent, ctx: &mut ToolContext) -> CallbackStatus {
        if event.key == "escape" && self.draft.is_some() {
            self.cancel(ctx);
            return CallbackStatus::Stop;
        }
        CallbackStatus::Continue
    }

    fn cancel(&mut self, _ctx: &mut ToolContext) {
        self.generation += 1;
        self.draft = None;
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
    use crate::model::{AnnotationKind, AnnotationPayload};
    use crate::renderer::Renderer;
    use crate::store::MemoryStore;
    use crate::view::View;

    fn drag(tool: &mut CommentTool, ctx: &mut ToolContext, from: ImagePoint, to: ImagePoint) {
        let event = PointerEvent::left(CanvasPoint::new(0.0, 0.0));
        tool.on_start(from, &event, ctx);
        tool.on_move(to, &event, ctx);
        tool.on_end(to, &event, ctx);
    }

    #[test]
    fn test_drag_creates_comment_quad() {
        let mut view = View::new(1, 200, 200, 1);
        let mut store = MemoryStore::new();
        let mut actions = ActionManager::new(ActionManagerConfig::default());
        let renderers: HashMap<AnnotationKind, Box<dyn Renderer>> = HashMap::new();
        let mut ctx = ToolContext {
            view: &mut view,
            store: &mut store,
            actions: &mut actions,
            renderers: &renderers,
            class_id: 0,
        };

        let mut tool = CommentTool::new();
        drag(
            &mut tool,
            &mut ctx,
            ImagePoint::new(10.0, 10.0),
            ImagePoint::new(40.0, 30.0),
        );

        assert_eq!(ctx.view.annotations.len(), 1);
        let annotation = ctx.view.annotations.iter().next().unwrap();
        match &annotation.payload {
            AnnotationPayload::Image(AnnotationData::Comment(corners)) => {
                assert_eq!(corners[0], ImagePoint::new(10.0, 10.0));
                assert_eq!(corners[2], ImagePoint::new(40.0, 30.0));
            }
            other => panic!("unexpected payload: {other:?}"),
        }
        assert_eq!(store.created.len(), 1);
    }

    #[test]
    fn test_straight_line_quad_is_rejected() {
        let mut view = View::new(1, 200, 200, 1);
        let mut store = MemoryStore::new();
        let mut actions = ActionManager::new(ActionManagerConfig::default());
        let renderers: HashMap<AnnotationKind, Box<dyn Renderer>> = HashMap::new();
        let mut ctx = ToolContext {
            view: &mut view,
            store: &mut store,
            actions: &mut actions,
            renderers: &renderers,
            class_id: 0,
        };

        let mut tool = CommentTool::new();
        // Long enough to pass the click threshold, but zero height.
        drag(
            &mut tool,
            &mut ctx,
            ImagePoint::new(10.0, 10.0),
            ImagePoint::new(60.0, 10.0),
        );
        assert!(ctx.view.annotations.is_empty());

        // Zero width fails the same way.
        drag(
            &mut tool,
            &mut ctx,
            ImagePoint::new(10.0, 10.0),
            ImagePoint::new(10.0, 60.0),
        );
        assert!(ctx.view.annotations.is_empty());
        assert!(store.created.is_empty());
    }

    #[test]
    fn test_cancelled_comment_gesture_creates_nothing() {
        let mut view = View::new(1, 200, 200, 1);
        let mut store = MemoryStore::new();
        let mut actions = ActionManager::new(ActionManagerConfig::default());
        let renderers: HashMap<AnnotationKind, Box<dyn Renderer>> = HashMap::new();
        let mut ctx = ToolContext {
            view: &mut view,
            store: &mut store,
            actions: &mut actions,
            renderers: &renderers,
            class_id: 0,
        };

        let event = PointerEvent::left(CanvasPoint::new(0.0, 0.0));
        let mut tool = CommentTool::new();
        tool.on_start(ImagePoint::new(10.0, 10.0), &event, &mut ctx);
        tool.cancel(&mut ctx);
        tool.on_end(ImagePoint::new(60.0, 60.0), &event, &mut ctx);

        assert!(ctx.view.annotations.is_empty());
    }
}
