//! Cuboid drawing tool: two drags, front face first, then back face.

use crate::action::AddAnnotation;
use crate::geometry::{ImagePoint, Rect};
use crate::input::{CallbackStatus, KeyEvent, PointerEvent};
use crate::model::{Annotation, AnnotationData, AnnotationKind, BoxData, CuboidData};
use crate::store::Ability;
use crate::tool::{payload_for_view, Tool, ToolContext, CLICK_THRESHOLD, MIN_BOX_SIZE};

#[derive(Debug, Default)]
enum Phase {
    #[default]
    Idle,
    DraggingFront {
        anchor: ImagePoint,
    },
    FrontDone {
        front: Rect,
    },
    DraggingBack {
        front: Rect,
        anchor: ImagePoint,
    },
}

#[derive(Default)]
pub struct CuboidTool {
    phase: Phase,
}

impl CuboidTool {
    pub fn new() -> Self {
        Self::default()
    }

    fn valid_rect(anchor: ImagePoint, point: ImagePoint) -> Option<Rect> {
        let rect = Rect::from_corners(anchor, point);
        let big_enough = anchor.distance_to(&point) >= CLICK_THRESHOLD
            && rect.w >= MIN_BOX_SIZE
            && rect.h >= MIN_BOX_SIZE;
        big_enough.then_some(rect)
    }
}

impl Tool for CuboidTool {
    fn name(&self) -> &'static str {
        "cuboid_tool"
    }

    fn on_start(
        &mut self,
        point: ImagePoint,
        _event: &PointerEvent,
        _ctx: &mut ToolContext,
    ) -> CallbackStatus {
        self.phase = match std::mem::take(&mut self.phase) {
            Phase::Idle => Phase::DraggingFront { anchor: point },
            Phase::FrontDone { front } => Phase::DraggingBack {
                front,
                anchor: point,
            },
            // A second press while a drag is in flight restarts it.
            Phase::DraggingFront { .. } => Phase::DraggingFront { anchor: point },
            Phase::DraggingBack { front, .. } => Phase::DraggingBack {
                front,
                anchor: point,
            },
        };
        CallbackStatus::Stop
    }

    fn on_move(
        &mut self,
        _point: ImagePoint,
        _event: &PointerEvent,
        _ctx: &mut ToolContext,
    ) -> CallbackStatus {
        match self.phase {
            Phase::DraggingFront { .. } | Phase::DraggingBack { .. } => CallbackStatus::Stop,
            _ => CallbackStatus::Continue,
        }
    }

    fn on_end(
        &mut self,
        point: ImagePoint,
        _event: &PointerEvent,
        ctx: &mut ToolContext,
    ) -> CallbackStatus {
        match std::mem::take(&mut self.phase) {
            Phase::Idle | Phase::FrontDone { .. } => CallbackStatus::Continue,
            Phase::DraggingFront { anchor } => {
                match Self::valid_rect(anchor, point) {
                    Some(front) => self.phase = Phase::FrontDone { front },
                    None => self.phase = Phase::Idle,
                }
                CallbackStatus::Stop
            }
            Phase::DraggingBack { front, anchor } => {
                let Some(back) = Self::valid_rect(anchor, point) else {
                    // Degenerate back face; keep the front and let the
                    // user try again.
                    self.phase = Phase::FrontDone { front };
                    return CallbackStatus::Continue;
                };

                if !ctx.check_ability(Ability::CreateAnnotation) {
                    self.phase = Phase::Idle;
                    return CallbackStatus::Stop;
                }

                let data = AnnotationData::Cuboid(CuboidData {
                    front: BoxData::from_rect(front),
                    back: BoxData::from_rect(back),
                });
                let payload = payload_for_view(ctx.view, data, false);
                let annotation = Annotation::from_instance_params(
                    ctx.view.annotations.next_id(),
                    ctx.class_id,
                    payload,
                );
                match ctx.run_action(Box::new(AddAnnotation::new(annotation))) {
                    Ok(_) => {}
                    Err(error) => ctx.toast_error(&error),
                }
                CallbackStatus::Stop
            }
        }
    }

    fn on_key(&mut self, event: &KeyEvent, ctx: &mut ToolContext) -> CallbackStatus {
        if event.key == "escape" && !matches!(self.phase, Phase::Idle) {
            self.cancel(ctx);
            return CallbackStatus::Stop;
        }
        CallbackStatus::Continue
    }

    fn cancel(&mut self, _ctx: &mut ToolContext) {
        self.phase = Phase::Idle;
    }
}

// ============================================================================
// Tests
// ============================================================================
