//! Skeleton renderer.

use crate::error::InterpolateError;
use crate::geometry::{CompoundPath, ImagePoint};
use crate::interpolate::InterpolationParams;
use crate::model::{Annotation, AnnotationData, AnnotationKind, SkeletonData, SkeletonNode};
use crate::renderer::{Renderer, mutate_data, resolve_data};
use crate::view::ViewContext;

pub struct SkeletonRenderer;

impl Renderer for SkeletonRenderer {
    fn kind(&self) -> AnnotationKind {
        AnnotationKind::Skeleton
    }

    fn supports_interpolate(&self) -> bool {
        true
    }

    fn get_path(&self, annotation: &Annotation, ctx: &ViewContext) -> CompoundPath {
        match resolve_data(annotation, ctx, self) {
            Some(AnnotationData::Skeleton(data)) => {
                CompoundPath::new(data.nodes.iter().map(|node| node.point).collect())
            }
            _ => CompoundPath::default(),
        }
    }

    fn translate(&self, annotation: &mut Annotation, offset: ImagePoint, ctx: &ViewContext) {
        mutate_data(annotation, ctx, |data| {
            if let AnnotationData::Skeleton(data) = data {
                for node in &mut data.nodes {
                    node.point.add_assign(offset);
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
            if let AnnotationData::Skeleton(data) = data {
                if let Some(node) = data.nodes.get_mut(vertex) {
                    node.point.add_assign(offset);
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
        let (AnnotationData::Skeleton(prev), AnnotationData::Skeleton(next)) = (prev, next) else {
            return Err(InterpolateError::DataMismatch {
                message: "skeleton interpolation needs skeleton keyframes".to_string(),
            });
        };

        if !params.is_linear() {
            return Err(InterpolateError::UnsupportedAlgorithm {
                kind: self.kind(),
                algorithm: params.algorithm_name().to_string(),
            });
        }

        if prev.nodes.len() != next.nodes.len() {
            return Err(InterpolateError::DataMismatch {
                message: format!(
                    "skeleton keyframes have {} and {} nodes",
                    prev.nodes.len(),
                    next.nodes.len()
                ),
            });
        }

        // Nodes pair by name; the keyframes come from one class so both
        // carry the same node set, possibly in a different order.
        let nodes = prev
            .nodes
            .iter()
            .map(|prev_node| {
                let next_node = next
                    .nodes
                    .iter()
                    .find(|n| n.name == prev_node.name)
                    .ok_or_else(|| InterpolateError::DataMismatch {
                        message: format!("node '{}' missing from next keyframe", prev_node.name),
                    })?;
                Ok(SkeletonNode {
                    point: prev_node.point.lerp(&next_node.point, params.factor),
                    name: prev_node.name.clone(),
                    occluded: if params.factor < 1.0 {
                        prev_node.occluded
                    } else {
                        next_node.occluded
                    },
                })
            })
            .collect::<Result<Vec<_>, InterpolateError>>()?;

        Ok(AnnotationData::Skeleton(SkeletonData { nodes }))
    }
}

// ============================================================================
// Tests
// ============================================================================
