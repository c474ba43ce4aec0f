//! Comment thread renderer: a vertex quad anchoring a discussion to a
//! region of the image. Moves like a 4-corner box.

use crate::geometry::{CompoundPath, ImagePoint};
use crate::model::{Annotation, AnnotationData, AnnotationKind};
use crate::renderer::{Renderer, move_box_corner, mutate_data, resolve_data};
use crate::view::ViewContext;

pub struct CommentRenderer;

impl Renderer for CommentRenderer {
    fn kind(&self) -> AnnotationKind {
        AnnotationKind::Comment
    }

    fn get_path(&self, annotation: &Annotation, ctx: &ViewContext) -> CompoundPath {
        match resolve_data(annotation, ctx, self) {
            Some(AnnotationData::Comment(vertices)) => CompoundPath::new(vertices.to_vec()),
            _ => CompoundPath::default(),
        }
    }

    fn translate(&self, annotation: &mut Annotation, offset: ImagePoint, ctx: &ViewContext) {
        mutate_data(annotation, ctx, |data| {
            if let AnnotationData::Comment(vertices) = data {
                for vertex in vertices {
                    vertex.add_assign(offset);
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
            if let AnnotationData::Comment(vertices) = data {
                let [c0, c1, c2, c3] = vertices;
                move_box_corner([c0, c1, c2, c3], vertex, offset);
            }
        });
    }
}

// ============================================================================
// Tests
// ============================================================================
