//! Mask renderer. Mask geometry lives in the raster buffer, not in vertex
//! paths; the path exposed here is the mask's bounding box, used for
//! hit-testing and overlay anchoring only.

use crate::geometry::{CompoundPath, ImagePoint};
use crate::model::{Annotation, AnnotationData, AnnotationKind, BoxData};
use crate::renderer::{Renderer, resolve_data};
use crate::view::ViewContext;

pub struct MaskRenderer;

impl Renderer for MaskRenderer {
    fn kind(&self) -> AnnotationKind {
        AnnotationKind::Mask
    }

    fn get_path(&self, annotation: &Annotation, ctx: &ViewContext) -> CompoundPath {
        match resolve_data(annotation, ctx, self) {
            Some(AnnotationData::Mask(mask)) => match mask.bounding_box {
                Some(rect) => CompoundPath::new(BoxData::from_rect(rect).corners().to_vec()),
                None => CompoundPath::default(),
            },
            _ => CompoundPath::default(),
        }
    }

    fn get_all_vertices(&self, _annotation: &Annotation, _ctx: &ViewContext) -> Vec<ImagePoint> {
        // Masks have no editable vertices; pixels are edited by painting.
        Vec::new()
    }

    fn translate(&self, annotation: &mut Annotation, _offset: ImagePoint, _ctx: &ViewContext) {
        log::warn!(
            "translate is not applicable to mask annotation {}; mask pixels move by painting",
            annotation.id
        );
    }

    fn move_vertex(
        &self,
        annotation: &mut Annotation,
        _vertex: usize,
        _offset: ImagePoint,
        _ctx: &ViewContext,
    ) {
        log::warn!(
            "move_vertex is not applicable to mask annotation {}",
            annotation.id
        );
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Rect;
    use crate::model::{AnnotationPayload, MaskData};

    #[test]
    fn test_path_is_bounding_box_quad() {
        let ann = Annotation::from_instance_params(
            1,
            0,
            AnnotationPayload::Image(AnnotationData::Mask(MaskData {
                raster_id: 7,
                bounding_box: Some(Rect::new(1.0, 2.0, 3.0, 4.0)),
            })),
        );
        let renderer = MaskRenderer;
        let ctx = ViewContext {
            frame_index: 0,
            show_measures: false,
        };
        let path = renderer.get_path(&ann, &ctx);
        assert_eq!(path.path.len(), 4);
        assert!(renderer.get_all_vertices(&ann, &ctx).is_empty());
    }
}
