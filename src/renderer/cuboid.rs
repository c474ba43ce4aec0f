//! Cuboid (3D bounding box) renderer: a front and a back face, each a
//! constrained 4-corner box.

use crate::geometry::{CompoundPath, ImagePoint};
use crate::model::{Annotation, AnnotationData, AnnotationKind, BoxData};
use crate::renderer::{Renderer, move_box_corner, mutate_data, resolve_data};
use crate::view::ViewContext;

pub struct CuboidRenderer;

fn translate_face(face: &mut BoxData, offset: ImagePoint) {
    face.top_left.add_assign(offset);
    face.top_right.add_assign(offset);
    face.bottom_right.add_assign(offset);
    face.bottom_left.add_assign(offset);
}

impl Renderer for CuboidRenderer {
    fn kind(&self) -> AnnotationKind {
        AnnotationKind::Cuboid
    }

    fn get_path(&self, annotation: &Annotation, ctx: &ViewContext) -> CompoundPath {
        match resolve_data(annotation, ctx, self) {
            Some(AnnotationData::Cuboid(data)) => CompoundPath {
                path: data.front.corners().to_vec(),
                additional_paths: vec![data.back.corners().to_vec()],
            },
            _ => CompoundPath::default(),
        }
    }

    fn translate(&self, annotation: &mut Annotation, offset: ImagePoint, ctx: &ViewContext) {
        mutate_data(annotation, ctx, |data| {
            if let AnnotationData::Cuboid(data) = data {
                translate_face(&mut data.front, offset);
                translate_face(&mut data.back, offset);
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
            if let AnnotationData::Cuboid(data) = data {
                // Vertices 0..4 are the front face, 4..8 the back face;
                // each face moves under the box corner constraint.
                let (face, index) = if vertex < 4 {
                    (&mut data.front, vertex)
                } else if vertex < 8 {
                    (&mut data.back, vertex - 4)
                } else {
                    return;
                };
                move_box_corner(
                    [
                        &mut face.top_left,
                        &mut face.top_right,
                        &mut face.bottom_right,
                        &mut face.bottom_left,
                    ],
                    index,
                    offset,
                );
            }
        });
    }
}

// ============================================================================
// Tests
// ============================================================================
