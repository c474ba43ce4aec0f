//! Polyline renderer.

use crate::error::InterpolateError;
use crate::geometry::{CompoundPath, ImagePoint};
use crate::interpolate::{InterpolationParams, interpolate_path_fixed_align};
use crate::model::{Annotation, AnnotationData, AnnotationKind, PolylineData};
use crate::renderer::{Renderer, mutate_data, resolve_data};
use crate::view::ViewContext;

pub struct PolylineRenderer;

impl Renderer for PolylineRenderer {
    fn kind(&self) -> AnnotationKind {
        AnnotationKind::Polyline
    }

    fn supports_interpolate(&self) -> bool {
        true
    }

    fn get_path(&self, annotation: &Annotation, ctx: &ViewContext) -> CompoundPath {
        match resolve_data(annotation, ctx, self) {
            Some(AnnotationData::Polyline(data)) => CompoundPath::new(data.path),
            _ => CompoundPath::default(),
        }
    }

    fn translate(&self, annotation: &mut Annotation, offset: ImagePoint, ctx: &ViewContext) {
        mutate_data(annotation, ctx, |data| {
            if let AnnotationData::Polyline(data) = data {
                for point in &mut data.path {
                    point.add_assign(offset);
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
            if let AnnotationData::Polyline(data) = data {
                if let Some(point) = data.path.get_mut(vertex) {
                    point.add_assign(offset);
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
        let (AnnotationData::Polyline(prev), AnnotationData::Polyline(next)) = (prev, next) else {
            return Err(InterpolateError::DataMismatch {
                message: "polyline interpolation needs polyline keyframes".to_string(),
            });
        };

        if !params.is_linear() {
            return Err(InterpolateError::UnsupportedAlgorithm {
                kind: self.kind(),
                algorithm: params.algorithm_name().to_string(),
            });
        }

        Ok(AnnotationData::Polyline(PolylineData {
            path: interpolate_path_fixed_align(&prev.path, &next.path, params.factor, false),
        }))
    }
}

// ============================================================================
// Tests
// ============================================================================
