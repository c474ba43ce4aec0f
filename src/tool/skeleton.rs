//! Skeleton drawing tool: drag a rectangle and the class's node template
//! is scaled into it.

use crate::action::AddAnnotation;
use crate::geometry::{ImagePoint, Rect};
use crate::input::{CallbackStatus, KeyEvent, PointerEvent};
use crate::model::{
    Annotation, AnnotationData, AnnotationKind, SkeletonData, SkeletonNode,
};
use crate::store::Ability;
use crate::tool::{payload_for_view, Tool, ToolContext, CLICK_THRESHOLD, MIN_BOX_SIZE};

/// Node layout in normalized `[0, 1] x [0, 1]` coordinates, scaled into
/// the dragged rectangle on commit.
#[derive(Debug, Clone)]
pub struct SkeletonTemplate {
    pub nodes: Vec<(String, ImagePoint)>,
}

impl SkeletonTemplate {
    fn instantiate(&self, rect: Rect) -> SkeletonData {
        SkeletonData {
            nodes: self
                .nodes
                .iter()
                .map(|(name, normalized)| SkeletonNode {
                    point: ImagePoint::new(
                        rect.x + normalized.x * rect.w,
                        rect.y + normalized.y * rect.h,
                    ),
                    name: name.clone(),
                    occluded: false,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Draft {
    anchor: ImagePoint,
}

pub struct SkeletonTool {
    template: SkeletonTemplate,
    draft: Option<Draft>,
}

impl SkeletonTool {
    pub fn new(template: SkeletonTemplate) -> Self {
        Self {
            template,
            draft: None,
        }
    }
}

impl Tool for SkeletonTool {
    fn name(&self) -> &'static str {
        "skeleton_tool"
    }

    fn on_start(
        &mut self,
        point: ImagePoint,
        _event: &PointerEvent,
        _ctx: &mut ToolContext,
    ) -> CallbackStatus {
        self.draft = Some(Draft { anchor: point });
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

        let rect = Rect::from_corners(draft.anchor, point);
        if draft.anchor.distance_to(&point) < CLICK_THRESHOLD
            || rect.w < MIN_BOX_SIZE
            || rect.h < MIN_BOX_SIZE
            || self.template.nodes.is_empty()
        {
            return CallbackStatus::Continue;
        }
        if !ctx.check_ability(Ability::CreateAnnotation) {
            return CallbackStatus::Stop;
        }

        let interpolated = ctx
            .renderer(AnnotationKind::Skeleton)
            .is_some_and(|r| r.interpolate_by_default());
        let data = AnnotationData::Skeleton(self.template.instantiate(rect));
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

    fn cancel(&mut self, _ctx: &mut ToolContext) {
        self.draft = None;
    }
}

// ============================================================================
// Tests
// ============================================================================
