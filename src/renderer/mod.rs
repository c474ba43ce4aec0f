//! The per-kind renderer contract.
//!
//! A renderer owns every geometry operation for its annotation kind: path
//! extraction, vertex enumeration, translation, single-vertex moves and
//! (optionally) keyframe interpolation. Renderers are independent structs
//! behind one trait; optional behavior is advertised through capability
//! flags and feature-tested by callers, not expressed through inheritance.
//!
//! `render` produces no pixels here — concrete drawing is outside the
//! engine. Its observable effect is populating the annotation's
//! render-path cache used for fast hit-testing.

mod bounding_box;
mod comment;
mod cuboid;
mod mask;
mod polygon;
mod polyline;
mod skeleton;

pub use bounding_box::BoundingBoxRenderer;
pub use comment::CommentRenderer;
pub use cuboid::CuboidRenderer;
pub use mask::MaskRenderer;
pub use polygon::PolygonRenderer;
pub use polyline::PolylineRenderer;
pub use skeleton::SkeletonRenderer;

use crate::error::InterpolateError;
use crate::geometry::{CompoundPath, ImagePoint, Rect};
use crate::interpolate::InterpolationParams;
use crate::model::{Annotation, AnnotationData, AnnotationKind};
use crate::view::ViewContext;

/// Display filter applied while rendering (image manipulation state).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderFilter {
    /// Fill opacity in `[0, 100]`.
    pub opacity: u8,
}

impl Default for RenderFilter {
    fn default() -> Self {
        Self { opacity: 100 }
    }
}

/// Geometry operations for one annotation kind.
pub trait Renderer {
    /// The kind this renderer is registered for.
    fn kind(&self) -> AnnotationKind;

    /// Whether `interpolate` is implemented. Callers must feature-test
    /// this before invoking the optional method.
    fn supports_interpolate(&self) -> bool {
        false
    }

    /// Whether this kind is interpolated by default when keyframed.
    fn interpolate_by_default(&self) -> bool {
        false
    }

    /// Whether `centroid_rect_path` is implemented.
    fn supports_centroid_rect_path(&self) -> bool {
        false
    }

    /// Derive the current outline from the annotation's data, resolving
    /// the video/image representation for the context's frame.
    fn get_path(&self, annotation: &Annotation, ctx: &ViewContext) -> CompoundPath;

    /// Flattened list of editable vertices, used for hit-testing and
    /// vertex selection. Order matches `move_vertex` indices.
    fn get_all_vertices(&self, annotation: &Annotation, ctx: &ViewContext) -> Vec<ImagePoint> {
        self.get_path(annotation, ctx).all_vertices()
    }

    /// Move every vertex by `offset`, mutating in place.
    fn translate(&self, annotation: &mut Annotation, offset: ImagePoint, ctx: &ViewContext);

    /// Move the vertex at `vertex` (an index into `get_all_vertices`
    /// order) by `offset`. Box-like kinds constrain the move so the shape
    /// stays rectangular; free-form kinds move only the one vertex.
    fn move_vertex(
        &self,
        annotation: &mut Annotation,
        vertex: usize,
        offset: ImagePoint,
        ctx: &ViewContext,
    );

    /// Produce an intermediate shape between two keyframes. Only called
    /// when `supports_interpolate` is true; the default errors.
    fn interpolate(
        &self,
        prev: &AnnotationData,
        next: &AnnotationData,
        params: &InterpolationParams,
    ) -> Result<AnnotationData, InterpolateError> {
        let _ = (prev, next, params);
        Err(InterpolateError::NotCapable { kind: self.kind() })
    }

    /// Small rectangle path centered on the shape's centroid, used to
    /// anchor overlays. Only called when `supports_centroid_rect_path`.
    fn centroid_rect_path(&self, annotation: &Annotation, ctx: &ViewContext) -> Option<Rect> {
        let _ = (annotation, ctx);
        None
    }

    /// Render the annotation. The engine-observable side effect is the
    /// render-path cache; drawing itself happens outside this crate.
    fn render(
        &self,
        ctx: &ViewContext,
        annotation: &mut Annotation,
        inferred: bool,
        filter: Option<&RenderFilter>,
    ) {
        let _ = (inferred, filter);
        annotation.render_path = Some(self.get_path(annotation, ctx));
    }
}

/// Run `mutate` on the annotation's frame-effective data and invalidate
/// the render-path cache. Mutations on a missing frame are dropped.
pub(crate) fn mutate_data(
    annotation: &mut Annotation,
    ctx: &ViewContext,
    mutate: impl FnOnce(&mut AnnotationData),
) {
    if let Some(data) = annotation.data_at_mut(ctx.frame_index) {
        mutate(data);
    }
    annotation.invalidate_render_path();
}

/// Resolve the frame-effective data of an annotation for read access.
/// The renderer is passed through so video annotations between keyframes
/// resolve to interpolated data when the kind supports it.
pub(crate) fn resolve_data(
    annotation: &Annotation,
    ctx: &ViewContext,
    renderer: &dyn Renderer,
) -> Option<AnnotationData> {
    annotation
        .infer_video_data(ctx.frame_index, Some(renderer))
        .data
}

/// The documented constrained move for a 4-corner box path ordered
/// TL, TR, BR, BL: moving a corner slides the two adjacent corners along
/// their shared axes so the shape stays a rectangle.
pub(crate) fn move_box_corner(corners: [&mut ImagePoint; 4], index: usize, offset: ImagePoint) {
    let [c0, c1, c2, c3] = corners;
    match index {
        // Top left: top right's y and bottom left's x follow
        0 => {
            c0.add_assign(offset);
            c1.y += offset.y;
            c3.x += offset.x;
        }
        // Top right: top left's y and bottom right's x follow
        1 => {
            c1.add_assign(offset);
            c0.y += offset.y;
            c2.x += offset.x;
        }
        // Bottom right: top right's x and bottom left's y follow
        2 => {
            c2.add_assign(offset);
            c1.x += offset.x;
            c3.y += offset.y;
        }
        // Bottom left: top left's x and bottom right's y follow
        3 => {
            c3.add_assign(offset);
            c0.x += offset.x;
            c2.y += offset.y;
        }
        _ => {}
    }
}

// ============================================================================
// Tests
// ============================================================================
