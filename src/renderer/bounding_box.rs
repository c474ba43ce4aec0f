//! Bounding box renderer.

use crate::error::InterpolateError;
use crate::geometry::{CompoundPath, ImagePoint, Rect};
use crate::interpolate::InterpolationParams;
use crate::model::{Annotation, AnnotationData, AnnotationKind, BoxData};
use crate::renderer::{Renderer, move_box_corner, mutate_data, resolve_data};
use crate::view::ViewContext;

pub struct BoundingBoxRenderer;

fn box_path(annotation: &Annotation, ctx: &ViewContext) -> Vec<ImagePoint> {
    match resolve_data(annotation, ctx, &BoundingBoxRenderer) {
        Some(AnnotationData::BoundingBox(data)) => data.corners().to_vec(),
        _ => Vec::new(),
    }
}

impl Renderer for BoundingBoxRenderer {
    fn kind(&self) -> AnnotationKind {
        AnnotationKind::BoundingBox
    }

    fn supports_interpolate(&self) -> bool {
        true
    }

    fn interpolate_by_default(&self) -> bool {
        true
    }

    fn supports_centroid_rect_path(&self) -> bool {
        true
    }

    fn get_path(&self, annotation: &Annotation, ctx: &ViewContext) -> CompoundPath {
        CompoundPath::new(box_path(annotation, ctx))
    }

    fn translate(&self, annotation: &mut Annotation, offset: ImagePoint, ctx: &ViewContext) {
        mutate_data(annotation, ctx, |data| {
            if let AnnotationData::BoundingBox(data) = data {
                data.top_left.add_assign(offset);
                data.top_right.add_assign(offset);
                data.bottom_right.add_assign(offset);
                data.bottom_left.add_assign(offset);
            }
        });
    }

    fn move_vertex(
        &self,
        annotation: &mut Annotation,
        vertex: usize,
        offset: ImagePoint,
        ctx: &ViewContext,
    ) {
        mutate_data(annotation, ctx, |data| {
            if let AnnotationData::BoundingBox(data) = data {
                move_box_corner(
                    [
                        &mut data.top_left,
                        &mut data.top_right,
                        &mut data.bottom_right,
                        &mut data.bottom_left,
                    ],
                    vertex,
                    offset,
                );
            }
        });
    }

    fn interpolate(
        &self,
        prev: &AnnotationData,
        next: &AnnotationData,
        params: &InterpolationParams,
    ) -> Result<AnnotationData, InterpolateError> {
        let (AnnotationData::BoundingBox(prev), AnnotationData::BoundingBox(next)) = (prev, next)
        else {
            return Err(InterpolateError::DataMismatch {
                message: "bounding box interpolation needs box keyframes".to_string(),
            });
        };

        if !params.is_linear() {
            return Err(InterpolateError::UnsupportedAlgorithm {
                kind: self.kind(),
                algorithm: params.algorithm_name().to_string(),
            });
        }

        let factor = params.factor;
        Ok(AnnotationData::BoundingBox(BoxData {
            top_left: prev.top_left.lerp(&next.top_left, factor),
            top_right: prev.top_right.lerp(&next.top_right, factor),
            bottom_right: prev.bottom_right.lerp(&next.bottom_right, factor),
            bottom_left: prev.bottom_left.lerp(&next.bottom_left, factor),
        }))
    }

    fn centroid_rect_path(&self, annotation: &Annotation, ctx: &ViewContext) -> Option<Rect> {
        let path = box_path(annotation, ctx);
        let bounds = Rect::bounding(&path)?;
        let center = ImagePoint::new(bounds.x + bounds.w / 2.0, bounds.y + bounds.h / 2.0);
        Some(Rect::new(center.x - 2.0, center.y - 2.0, 4.0, 4.0))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::AnnotationPayload;

    fn annotation(rect: Rect) -> Annotation {
        Annotation::from_instance_params(
            1,
            0,
            AnnotationPayload::Image(AnnotationData::BoundingBox(BoxData::from_rect(rect))),
        )
    }

    fn ctx() -> ViewContext {
        ViewContext {
            frame_index: 0,
            show_measures: false,
        }
    }

    #[test]
    fn test_get_path_returns_four_corners() {
        let ann = annotation(Rect::new(10.0, 20.0, 30.0, 40.0));
        let renderer = BoundingBoxRenderer;
        let path = renderer.get_path(&ann, &ctx());
        assert_eq!(
            path.path,
            vec![
                ImagePoint::new(10.0, 20.0),
                ImagePoint::new(40.0, 20.0),
                ImagePoint::new(40.0, 60.0),
                ImagePoint::new(10.0, 60.0),
            ]
        );
        assert!(path.additional_paths.is_empty());
    }

    #[test]
    fn test_translate_moves_every_corner() {
        let mut ann = annotation(Rect::new(0.0, 0.0, 10.0, 10.0));
        let renderer = BoundingBoxRenderer;
        renderer.translate(&mut ann, ImagePoint::new(5.0, -3.0), &ctx());
        let path = renderer.get_path(&ann, &ctx());
        assert_eq!(path.path[0], ImagePoint::new(5.0, -3.0));
        assert_eq!(path.path[2], ImagePoint::new(15.0, 7.0));
    }

    #[test]
    fn test_move_vertex_constrained() {
        let mut ann = annotation(Rect::new(0.0, 0.0, 10.0, 10.0));
        let renderer = BoundingBoxRenderer;
        // Drag top-left; top-right keeps x, bottom-left keeps y,
        // bottom-right untouched.
        renderer.move_vertex(&mut ann, 0, ImagePoint::new(2.0, 3.0), &ctx());
        let path = renderer.get_path(&ann, &ctx());
        assert_eq!(path.path[0], ImagePoint::new(2.0, 3.0));
        assert_eq!(path.path[1], ImagePoint::new(10.0, 3.0));
        assert_eq!(path.path[2], ImagePoint::new(10.0, 10.0));
        assert_eq!(path.path[3], ImagePoint::new(2.0, 10.0));
    }

    #[test]
    fn test_interpolate_boundaries_and_unknown_algorithm() {
        let renderer = BoundingBoxRenderer;
        let prev = AnnotationData::BoundingBox(BoxData::from_rect(Rect::new(0.0, 0.0, 10.0, 10.0)));
        let next =
            AnnotationData::BoundingBox(BoxData::from_rect(Rect::new(20.0, 20.0, 10.0, 10.0)));

        let at0 = renderer
            .interpolate(
                &prev,
                &next,
                &InterpolationParams {
                    algorithm: None,
                    factor: 0.0,
                },
            )
            .unwrap();
        assert_eq!(at0, prev);

        let at1 = renderer
            .interpolate(
                &prev,
                &next,
                &InterpolationParams {
                    algorithm: Some("linear-1.1".to_string()),
                    factor: 1.0,
                },
            )
            .unwrap();
        assert_eq!(at1, next);

        let err = renderer.interpolate(
            &prev,
            &next,
            &InterpolationParams {
                algorithm: Some("spline".to_string()),
                factor: 0.5,
            },
        );
        assert!(matches!(
            err,
            Err(InterpolateError::UnsupportedAlgorithm { .. })
        ));
    }

    #[test]
    fn test_render_populates_path_cache() {
        let mut ann = annotation(Rect::new(0.0, 0.0, 10.0, 10.0));
        let renderer = BoundingBoxRenderer;
        assert!(ann.render_path.is_none());
        renderer.render(&ctx(), &mut ann, false, None);
        assert!(ann.render_path.is_some());

        // Geometry mutation invalidates the cache.
        renderer.translate(&mut ann, ImagePoint::new(1.0, 1.0), &ctx());
        assert!(ann.render_path.is_none());
    }
}
