//! Polygon renderer.

use crate::error::InterpolateError;
use crate::geometry::{CompoundPath, ImagePoint, Rect};
use crate::interpolate::{InterpolationParams, interpolate_path_fixed_align};
use crate::model::{Annotation, AnnotationData, AnnotationKind, PolygonData};
use crate::renderer::{Renderer, mutate_data, resolve_data};
use crate::view::ViewContext;

pub struct PolygonRenderer;

impl Renderer for PolygonRenderer {
    fn kind(&self) -> AnnotationKind {
        AnnotationKind::Polygon
    }

    fn supports_interpolate(&self) -> bool {
        true
    }

    fn supports_centroid_rect_path(&self) -> bool {
        true
    }

    fn get_path(&self, annotation: &Annotation, ctx: &ViewContext) -> CompoundPath {
        match resolve_data(annotation, ctx, self) {
            Some(AnnotationData::Polygon(data)) => CompoundPath {
                path: data.path,
                additional_paths: data.additional_paths,
            },
            _ => CompoundPath::default(),
        }
    }

    fn translate(&self, annotation: &mut Annotation, offset: ImagePoint, ctx: &ViewContext) {
        mutate_data(annotation, ctx, |data| {
            if let AnnotationData::Polygon(data) = data {
                for point in &mut data.path {
                    point.add_assign(offset);
                }
                for path in &mut data.additional_paths {
                    for point in path {
                        point.add_assign(offset);
                    }
                }
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
            if let AnnotationData::Polygon(data) = data {
                // Index into the flattened vertex order: primary path
                // first, then each additional path.
                let mut index = vertex;
                if index < data.path.len() {
                    data.path[index].add_assign(offset);
                    return;
                }
                index -= data.path.len();
                for path in &mut data.additional_paths {
                    if index < path.len() {
                        path[index].add_assign(offset);
                        return;
                    }
                    index -= path.len();
                }
            }
        });
    }

    fn interpolate(
        &self,
        prev: &AnnotationData,
        next: &AnnotationData,
        params: &InterpolationParams,
    ) -> Result<AnnotationData, InterpolateError> {
        let (AnnotationData::Polygon(prev), AnnotationData::Polygon(next)) = (prev, next) else {
            return Err(InterpolateError::DataMismatch {
                message: "polygon interpolation needs polygon keyframes".to_string(),
            });
        };

        if !params.is_linear() {
            return Err(InterpolateError::UnsupportedAlgorithm {
                kind: self.kind(),
                algorithm: params.algorithm_name().to_string(),
            });
        }

        let path = interpolate_path_fixed_align(&prev.path, &next.path, params.factor, true);
        // Additional paths tween only where both keyframes carry the part;
        // otherwise the previous keyframe's part is kept as-is.
        let additional_paths = prev
            .additional_paths
            .iter()
            .enumerate()
            .map(|(i, prev_part)| match next.additional_paths.get(i) {
                Some(next_part) => {
                    interpolate_path_fixed_align(prev_part, next_part, params.factor, true)
                }
                None => prev_part.clone(),
            })
            .collect();

        Ok(AnnotationData::Polygon(PolygonData {
            path,
            additional_paths,
        }))
    }

    fn centroid_rect_path(&self, annotation: &Annotation, ctx: &ViewContext) -> Option<Rect> {
        let path = self.get_path(annotation, ctx).path;
        if path.is_empty() {
            return None;
        }
        let n = path.len() as f64;
        let cx = path.iter().map(|p| p.x).sum::<f64>() / n;
        let cy = path.iter().map(|p| p.y).sum::<f64>() / n;
        Some(Rect::new(cx - 2.0, cy - 2.0, 4.0, 4.0))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::AnnotationPayload;

    fn triangle() -> PolygonData {
        PolygonData {
            path: vec![
                ImagePoint::new(0.0, 0.0),
                ImagePoint::new(10.0, 0.0),
                ImagePoint::new(0.0, 10.0),
            ],
            additional_paths: vec![vec![
                ImagePoint::new(2.0, 2.0),
                ImagePoint::new(4.0, 2.0),
                ImagePoint::new(2.0, 4.0),
            ]],
        }
    }

    fn ctx() -> ViewContext {
        ViewContext {
            frame_index: 0,
            show_measures: false,
        }
    }

    #[test]
    fn test_vertices_flatten_holes() {
        let ann = Annotation::from_instance_params(
            1,
            0,
            AnnotationPayload::Image(AnnotationData::Polygon(triangle())),
        );
        let renderer = PolygonRenderer;
        assert_eq!(renderer.get_all_vertices(&ann, &ctx()).len(), 6);
    }

    #[test]
    fn test_move_vertex_only_moves_one() {
        let mut ann = Annotation::from_instance_params(
            1,
            0,
            AnnotationPayload::Image(AnnotationData::Polygon(triangle())),
        );
        let renderer = PolygonRenderer;
        // Vertex 4 is the second point of the hole.
        renderer.move_vertex(&mut ann, 4, ImagePoint::new(1.0, 1.0), &ctx());
        let vertices = renderer.get_all_vertices(&ann, &ctx());
        assert_eq!(vertices[4], ImagePoint::new(5.0, 3.0));
        assert_eq!(vertices[0], ImagePoint::new(0.0, 0.0));
        assert_eq!(vertices[3], ImagePoint::new(2.0, 2.0));
    }

    #[test]
    fn test_interpolate_boundary_law() {
        let renderer = PolygonRenderer;
        let prev = AnnotationData::Polygon(triangle());
        let mut shifted = triangle();
        for p in &mut shifted.path {
            p.add_assign(ImagePoint::new(5.0, 5.0));
        }
        let next = AnnotationData::Polygon(shifted);

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
                    algorithm: None,
                    factor: 1.0,
                },
            )
            .unwrap();
        assert_eq!(at1, next);
    }
}
