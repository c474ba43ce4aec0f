//! Bounding box drawing tool: anchor on press, size while dragging,
//! commit on release.

use crate::action::AddAnnotation;
use crate::geometry::{ImagePoint, Rect};
use crate::input::{CallbackStatus, KeyEvent, PointerEvent};
use crate::model::{Annotation, AnnotationData, AnnotationKind, BoxData};
use crate::store::Ability;
use crate::tool::{
    measure_label, payload_for_view, Tool, ToolContext, CLICK_THRESHOLD, MIN_BOX_SIZE,
};

#[derive(Debug, Clone, Copy)]
struct Draft {
    anchor: ImagePoint,
    cursor: ImagePoint,
    /// Generation at gesture start; a cancel bumps the tool's counter so
    /// a release arriving after the cancel cannot commit this draft.
    generation: u64,
}

#[derive(Default)]
pub struct BoundingBoxTool {
    draft: Option<Draft>,
    generation: u64,
}

impl BoundingBoxTool {
    pub fn new() -> Self {
        Self::default()
    }

    fn reset(&mut self, ctx: &mut ToolContext) {
        self.draft = None;
        ctx.view.remove_measures_overlay();
    }
}

impl Tool for BoundingBoxTool {
    fn name(&self) -> &'static str {
        "bounding_box_tool"
    }

    fn on_start(
        &mut self,
        point: ImagePoint,
        _event: &PointerEvent,
        _ctx: &mut ToolContext,
    ) -> CallbackStatus {
        self.draft = Some(Draft {
            anchor: point,
            cursor: point,
            generation: self.generation,
        });
        CallbackStatus::Stop
    }

    fn on_move(
        &mut self,
        point: ImagePoint,
        _event: &PointerEvent,
        ctx: &mut ToolContext,
    ) -> CallbackStatus {
        let Some(draft) = &mut self.draft else {
            return CallbackStatus::Continue;
        };
        draft.cursor = point;
        let rect = Rect::from_corners(draft.anchor, draft.cursor);
        if ctx.view.show_measures() {
            ctx.view
                .update_measures_overlay(rect, measure_label(rect.w, rect.h));
        }
        CallbackStatus::Stop
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
        ctx.view.remove_measures_overlay();
        if draft.generation != self.generation {
            // Gesture was cancelled while the pointer was still down.
            return CallbackStatus::Continue;
        }

        let rect = Rect::from_corners(draft.anchor, point);
        if draft.anchor.distance_to(&point) < CLICK_THRESHOLD
            || rect.w < MIN_BOX_SIZE
            || rect.h < MIN_BOX_SIZE
        {
            // A click or a degenerate box; silently abort the gesture.
            return CallbackStatus::Continue;
        }
        if !ctx.check_ability(Ability::CreateAnnotation) {
            return CallbackStatus::Stop;
        }

        let interpolated = ctx
            .renderer(AnnotationKind::BoundingBox)
            .is_some_and(|r| r.interpolate_by_default());
        let data = AnnotationData::BoundingBox(BoxData::from_rect(rect));
        let payload = payload_for_view(ctx.view, data, interpolated);
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

    fn cancel(&mut self, ctx: &mut ToolContext) {
        self.generation += 1;
        self.reset(ctx);
    }
}

// ============================================================================
// Tests
// ============================================================================
