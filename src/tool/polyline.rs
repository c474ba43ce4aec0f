//! Polyline drawing tool: like the polygon tool but the path stays open
//! and commits on enter or double-press of the last vertex.

use crate::action::AddAnnotation;
use crate::geometry::ImagePoint;
use crate::input::{CallbackStatus, KeyEvent, PointerEvent};
use crate::model::{Annotation, AnnotationData, AnnotationKind, PolylineData};
use crate::store::Ability;
use crate::tool::{payload_for_view, Tool, ToolContext, CLICK_THRESHOLD};

#[derive(Default)]
pub struct PolylineTool {
    vertices: Vec<ImagePoint>,
    cursor: Option<ImagePoint>,
}

impl PolylineTool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn preview(&self) -> Vec<ImagePoint> {
        let mut path = self.vertices.clone();
        if let Some(cursor) = self.cursor {
            path.push(cursor);
        }
        path
    }

    fn commit(&mut self, ctx: &mut ToolContext) -> CallbackStatus {
        let vertices = std::mem::take(&mut self.vertices);
        self.cursor = None;
        if vertices.len() < 2 {
            return CallbackStatus::Continue;
        }
        if !ctx.check_ability(Ability::CreateAnnotation) {
            return CallbackStatus::Stop;
        }

        let interpolated = ctx
            .renderer(AnnotationKind::Polyline)
            .is_some_and(|r| r.interpolate_by_default());
        let data = AnnotationData::Polyline(PolylineData { path: vertices });
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

impl Tool for PolylineTool {
    fn name(&self) -> &'static str {
        "polyline_tool"
    }

    fn on_start(
        &mut self,
        point: ImagePoint,
        _event: &PointerEvent,
        ctx: &mut ToolContext,
    ) -> CallbackStatus {
        if let Some(last) = self.vertices.last() {
            // Pressing the last vertex again ends the line.
            if last.distance_to(&point) < CLICK_THRESHOLD {
                return self.commit(ctx);
            }
        }
        self.vertices.push(point);
        CallbackStatus::Stop
    }

    fn on_move(
        &mut self,
        point: ImagePoint,
        _event: &PointerEvent,
        _ctx: &mut ToolContext,
    ) -> CallbackStatus {
        if self.vertices.is_empty() {
            return CallbackStatus::Continue;
        }
        self.cursor = Some(point);
        CallbackStatus::Stop
    }

    fn on_end(
        &mut self,
        _point: ImagePoint,
        _event: &PointerEvent,
        _ctx: &mut ToolContext,
    ) -> CallbackStatus {
        CallbackStatus::Continue
    }

    fn on_key(&mut self, event: &KeyEvent, ctx: &mut ToolContext) -> CallbackStatus {
        match event.key.as_str() {
            "enter" if !self.vertices.is_empty() => self.commit(ctx),
            "escape" if !self.vertices.is_empty() => {
                self.cancel(ctx);
                CallbackStatus::Stop
            }
            _ => CallbackStatus::Continue,
        }
    }

    fn cancel(&mut self, _ctx: &mut ToolContext) {
        self.vertices.clear();
        self.cursor = None;
    }
}

// ============================================================================
// Tests
// ============================================================================
