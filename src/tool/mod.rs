//! Annotation tools.
//!
//! A tool is a pointer/keyboard state machine that turns gestures into
//! annotation mutations. Lifecycle is uniform across tools:
//! `activate → (on_start → on_move* → on_end)* → deactivate`, with
//! `cancel` able to abort a gesture at any point. Per-tool state lives in
//! an explicit struct reset by value on every exit path, so no field can
//! leak from an aborted gesture into the next one.

mod bounding_box;
mod brush;
mod comment;
mod cuboid;
mod edit;
mod polygon;
mod polyline;
mod skeleton;

pub use bounding_box::BoundingBoxTool;
pub use brush::BrushTool;
pub use comment::CommentTool;
pub use cuboid::CuboidTool;
pub use edit::{EditTool, EditToolOption};
pub use polygon::PolygonTool;
pub use polyline::PolylineTool;
pub use skeleton::{SkeletonTemplate, SkeletonTool};

use std::collections::BTreeMap;
use std::collections::HashMap;

use crate::action::{Action, ActionContext, ActionManager};
use crate::error::ActionError;
use crate::geometry::ImagePoint;
use crate::input::{CallbackStatus, KeyEvent, PointerEvent};
use crate::model::{AnnotationData, AnnotationKind, AnnotationPayload, ClassId, VideoAnnotationData};
use crate::renderer::Renderer;
use crate::store::{Ability, Store, ToastLevel};
use crate::view::View;

/// Drag shorter than this (image px) is treated as a click, not a draw.
pub const CLICK_THRESHOLD: f64 = 4.0;
/// Smallest box edge a drawing tool will commit.
pub const MIN_BOX_SIZE: f64 = 1.0;
/// Click distance to the first polygon vertex that closes the path.
pub const POLYGON_CLOSE_THRESHOLD: f64 = 8.0;
/// Hit radius for grabbing a single vertex with the edit tool.
pub const VERTEX_GRAB_THRESHOLD: f64 = 6.0;

/// Everything a tool may touch while handling an event.
pub struct ToolContext<'a> {
    pub view: &'a mut View,
    pub store: &'a mut dyn Store,
    pub actions: &'a mut ActionManager,
    pub renderers: &'a HashMap<AnnotationKind, Box<dyn Renderer>>,
    /// The class the next created annotation is tagged with.
    pub class_id: ClassId,
}

impl ToolContext<'_> {
    pub fn renderer(&self, kind: AnnotationKind) -> Option<&dyn Renderer> {
        self.renderers.get(&kind).map(|r| r.as_ref())
    }

    /// Execute an action and record it in history.
    pub fn run_action(&mut self, action: Box<dyn Action>) -> Result<bool, ActionError> {
        let mut ctx = ActionContext {
            view: &mut *self.view,
            store: &mut *self.store,
        };
        self.actions.do_action(action, &mut ctx)
    }

    /// Report a failed backend mutation to the user. Tools call this on
    /// every `Err` from `run_action`; errors never panic the engine.
    pub fn toast_error(&mut self, error: &ActionError) {
        self.store.toast(ToastLevel::Error, &error.to_string());
    }

    /// Whether the current user holds `ability`. Tools check this before
    /// committing a mutation; a refusal is surfaced as a warning toast.
    pub fn check_ability(&mut self, ability: Ability) -> bool {
        if self.store.can(ability) {
            return true;
        }
        let verb = match ability {
            Ability::CreateAnnotation => "create",
            Ability::UpdateAnnotation => "update",
            Ability::DeleteAnnotation => "delete",
        };
        self.store.toast(
            ToastLevel::Warning,
            &format!("you may not {verb} annotations on this dataset"),
        );
        false
    }
}

/// A pointer/keyboard state machine producing annotation mutations.
pub trait Tool {
    /// Registry name, also the prefix of the tool's commands
    /// (`<name>.cancel`).
    fn name(&self) -> &'static str;

    fn activate(&mut self, ctx: &mut ToolContext) {
        let _ = ctx;
    }

    /// Called when another tool takes over. Implementations abort any
    /// gesture in flight.
    fn deactivate(&mut self, ctx: &mut ToolContext) {
        self.cancel(ctx);
    }

    fn on_start(
        &mut self,
        point: ImagePoint,
        event: &PointerEvent,
        ctx: &mut ToolContext,
    ) -> CallbackStatus;

    fn on_move(
        &mut self,
        point: ImagePoint,
        event: &PointerEvent,
        ctx: &mut ToolContext,
    ) -> CallbackStatus;

    fn on_end(
        &mut self,
        point: ImagePoint,
        event: &PointerEvent,
        ctx: &mut ToolContext,
    ) -> CallbackStatus;

    fn on_key(&mut self, event: &KeyEvent, ctx: &mut ToolContext) -> CallbackStatus {
        let _ = (event, ctx);
        CallbackStatus::Continue
    }

    /// Abort the gesture in flight, discarding draft state.
    fn cancel(&mut self, ctx: &mut ToolContext) {
        let _ = ctx;
    }
}

/// Wrap freshly drawn data in the payload shape the view's file needs:
/// a single-keyframe video payload on video files, a plain image payload
/// otherwise.
pub(crate) fn payload_for_view(
    view: &View,
    data: AnnotationData,
    interpolated: bool,
) -> AnnotationPayload {
    if view.is_video() {
        let frame = view.current_frame_index();
        let mut frames = BTreeMap::new();
        frames.insert(frame, data);
        AnnotationPayload::Video(VideoAnnotationData {
            frames,
            segments: vec![[frame, view.frame_count]],
            interpolated,
            interpolate_algorithm: interpolated.then(|| "linear-1.1".to_string()),
        })
    } else {
        AnnotationPayload::Image(data)
    }
}

/// Measurement label for a region being sized, e.g. "37 x 12".
pub(crate) fn measure_label(width: f64, height: f64) -> String {
    format!("{:.0} x {:.0}", width, height)
}
