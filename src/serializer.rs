//! Per-kind wire codecs.
//!
//! Wire structs are separate from engine types and carry the exact field
//! names of the document format; codecs convert explicitly in both
//! directions. Bounding boxes are normalized on write so `w`/`h` are
//! never negative regardless of the drag direction that produced the
//! corners.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::SerializeError;
use crate::geometry::{ImagePoint, Rect};
use crate::model::{
    AnnotationData, AnnotationKind, BoxData, CuboidData, MaskData, PolygonData, PolylineData,
    SkeletonData, SkeletonNode,
};

/// Converts one annotation kind's data to and from its wire shape.
pub trait Serializer {
    fn kind(&self) -> AnnotationKind;

    fn serialize(&self, data: &AnnotationData) -> Result<Value, SerializeError>;

    fn deserialize(&self, raw: &Value) -> Result<AnnotationData, SerializeError>;
}

// ============================================================================
// Wire Structs
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
struct PointWire {
    x: f64,
    y: f64,
}

impl From<ImagePoint> for PointWire {
    fn from(point: ImagePoint) -> Self {
        Self {
            x: point.x,
            y: point.y,
        }
    }
}

impl From<PointWire> for ImagePoint {
    fn from(wire: PointWire) -> Self {
        ImagePoint::new(wire.x, wire.y)
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct BoxWire {
    x: f64,
    y: f64,
    w: f64,
    h: f64,
}

#[derive(Debug, Serialize, Deserialize)]
struct BoundingBoxWire {
    bounding_box: BoxWire,
}

#[derive(Debug, Serialize, Deserialize)]
struct PolygonWire {
    polygon: PolygonBody,
}

#[derive(Debug, Serialize, Deserialize)]
struct PolygonBody {
    path: Vec<PointWire>,
    #[serde(default)]
    additional_paths: Vec<Vec<PointWire>>,
}

#[derive(Debug, Serialize, Deserialize)]
struct PolylineWire {
    polyline: PolylineBody,
}

#[derive(Debug, Serialize, Deserialize)]
struct PolylineBody {
    path: Vec<PointWire>,
}

#[derive(Debug, Serialize, Deserialize)]
struct SkeletonWire {
    skeleton: SkeletonBody,
}

#[derive(Debug, Serialize, Deserialize)]
struct SkeletonBody {
    nodes: Vec<SkeletonNodeWire>,
}

#[derive(Debug, Serialize, Deserialize)]
struct SkeletonNodeWire {
    x: f64,
    y: f64,
    name: String,
    occluded: bool,
}

#[derive(Debug, Serialize, Deserialize)]
struct CuboidWire {
    cuboid: CuboidBody,
}

#[derive(Debug, Serialize, Deserialize)]
struct CuboidBody {
    front: BoxWire,
    back: BoxWire,
}

#[derive(Debug, Serialize, Deserialize)]
struct CommentWire {
    commentator: CommentBody,
}

#[derive(Debug, Serialize, Deserialize)]
struct CommentBody {
    bounding_box: BoxWire,
}

#[derive(Debug, Serialize, Deserialize)]
struct MaskWire {
    mask: MaskBody,
}

#[derive(Debug, Serialize, Deserialize)]
struct MaskBody {
    raster_id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    bounding_box: Option<BoxWire>,
}

#[derive(Debug, Serialize, Deserialize)]
struct TagWire {
    tag: serde_json::Map<String, Value>,
}

// ============================================================================
// Shared Codecs
// ============================================================================

/// Normalize a 4-corner quad to x/y/w/h. The corners may arrive in any
/// drag order, so min/abs is taken over all of them.
fn quad_to_box_wire(corners: &[ImagePoint; 4]) -> Result<BoxWire, SerializeError> {
    let rect = Rect::bounding(corners).ok_or_else(|| SerializeError::InvalidPayload {
        message: "empty corner set".to_string(),
    })?;
    Ok(BoxWire {
        x: rect.x,
        y: rect.y,
        w: rect.w,
        h: rect.h,
    })
}

fn box_wire_to_rect(wire: &BoxWire) -> Rect {
    // Defensive against hand-edited documents with negative extents.
    Rect::from_corners(
        ImagePoint::new(wire.x, wire.y),
        ImagePoint::new(wire.x + wire.w, wire.y + wire.h),
    )
}

fn wrong_shape(kind: AnnotationKind) -> SerializeError {
    SerializeError::WrongShape { kind }
}

// ============================================================================
// Per-Kind Serializers
// ============================================================================

pub struct BoundingBoxSerializer;

impl Serializer for BoundingBoxSerializer {
    fn kind(&self) -> AnnotationKind {
        AnnotationKind::BoundingBox
    }

    fn serialize(&self, data: &AnnotationData) -> Result<Value, SerializeError> {
        let AnnotationData::BoundingBox(data) = data else {
            return Err(wrong_shape(self.kind()));
        };
        let wire = BoundingBoxWire {
            bounding_box: quad_to_box_wire(&data.corners())?,
        };
        Ok(serde_json::to_value(wire)?)
    }

    fn deserialize(&self, raw: &Value) -> Result<AnnotationData, SerializeError> {
        let wire: BoundingBoxWire = serde_json::from_value(raw.clone())?;
        let rect = box_wire_to_rect(&wire.bounding_box);
        Ok(AnnotationData::BoundingBox(BoxData::from_rect(rect)))
    }
}

pub struct PolygonSerializer;

impl Serializer for PolygonSerializer {
    fn kind(&self) -> AnnotationKind {
        AnnotationKind::Polygon
    }

    fn serialize(&self, data: &AnnotationData) -> Result<Value, SerializeError> {
        let AnnotationData::Polygon(data) = data else {
            return Err(wrong_shape(self.kind()));
        };
        let wire = PolygonWire {
            polygon: PolygonBody {
                path: data.path.iter().copied().map(PointWire::from).collect(),
                additional_paths: data
                    .additional_paths
                    .iter()
                    .map(|path| path.iter().copied().map(PointWire::from).collect())
                    .collect(),
            },
        };
        Ok(serde_json::to_value(wire)?)
    }

    fn deserialize(&self, raw: &Value) -> Result<AnnotationData, SerializeError> {
        let wire: PolygonWire = serde_json::from_value(raw.clone())?;
        Ok(AnnotationData::Polygon(PolygonData {
            path: wire.polygon.path.into_iter().map(Into::into).collect(),
            additional_paths: wire
                .polygon
                .additional_paths
                .into_iter()
                .map(|path| path.into_iter().map(Into::into).collect())
                .collect(),
        }))
    }
}

pub struct PolylineSerializer;

impl Serializer for PolylineSerializer {
    fn kind(&self) -> AnnotationKind {
        AnnotationKind::Polyline
    }

    fn serialize(&self, data: &AnnotationData) -> Result<Value, SerializeError> {
        let AnnotationData::Polyline(data) = data else {
            return Err(wrong_shape(self.kind()));
        };
        let wire = PolylineWire {
            polyline: PolylineBody {
                path: data.path.iter().copied().map(PointWire::from).collect(),
            },
        };
        Ok(serde_json::to_value(wire)?)
    }

    fn deserialize(&self, raw: &Value) -> Result<AnnotationData, SerializeError> {
        let wire: PolylineWire = serde_json::from_value(raw.clone())?;
        Ok(AnnotationData::Polyline(PolylineData {
            path: wire.polyline.path.into_iter().map(Into::into).collect(),
        }))
    }
}

pub struct SkeletonSerializer;

impl Serializer for SkeletonSerializer {
    fn kind(&self) -> AnnotationKind {
        AnnotationKind::Skeleton
    }

    fn serialize(&self, data: &AnnotationData) -> Result<Value, SerializeError> {
        let AnnotationData::Skeleton(data) = data else {
            return Err(wrong_shape(self.kind()));
        };
        let wire = SkeletonWire {
            skeleton: SkeletonBody {
                nodes: data
                    .nodes
                    .iter()
                    .map(|node| SkeletonNodeWire {
                        x: node.point.x,
                        y: node.point.y,
                        name: node.name.clone(),
                        occluded: node.occluded,
                    })
                    .collect(),
            },
        };
        Ok(serde_json::to_value(wire)?)
    }

    fn deserialize(&self, raw: &Value) -> Result<AnnotationData, SerializeError> {
        let wire: SkeletonWire = serde_json::from_value(raw.clone())?;
        Ok(AnnotationData::Skeleton(SkeletonData {
            nodes: wire
                .skeleton
                .nodes
                .into_iter()
                .map(|node| SkeletonNode {
                    point: ImagePoint::new(node.x, node.y),
                    name: node.name,
                    occluded: node.occluded,
                })
                .collect(),
        }))
    }
}

pub struct CuboidSerializer;

impl Serializer for CuboidSerializer {
    fn kind(&self) -> AnnotationKind {
        AnnotationKind::Cuboid
    }

    fn serialize(&self, data: &AnnotationData) -> Result<Value, SerializeError> {
        let AnnotationData::Cuboid(data) = data else {
            return Err(wrong_shape(self.kind()));
        };
        let wire = CuboidWire {
            cuboid: CuboidBody {
                front: quad_to_box_wire(&data.front.corners())?,
                back: quad_to_box_wire(&data.back.corners())?,
            },
        };
        Ok(serde_json::to_value(wire)?)
    }

    fn deserialize(&self, raw: &Value) -> Result<AnnotationData, SerializeError> {
        let wire: CuboidWire = serde_json::from_value(raw.clone())?;
        Ok(AnnotationData::Cuboid(CuboidData {
            front: BoxData::from_rect(box_wire_to_rect(&wire.cuboid.front)),
            back: BoxData::from_rect(box_wire_to_rect(&wire.cuboid.back)),
        }))
    }
}

/// Comments travel as a box on the wire but are a vertex quad in the
/// engine; both directions share the quad⇄box codec above.
pub struct CommentSerializer;

impl Serializer for CommentSerializer {
    fn kind(&self) -> AnnotationKind {
        AnnotationKind::Comment
    }

    fn serialize(&self, data: &AnnotationData) -> Result<Value, SerializeError> {
        let AnnotationData::Comment(vertices) = data else {
            return Err(wrong_shape(self.kind()));
        };
        let wire = CommentWire {
            commentator: CommentBody {
                bounding_box: quad_to_box_wire(vertices)?,
            },
        };
        Ok(serde_json::to_value(wire)?)
    }

    fn deserialize(&self, raw: &Value) -> Result<AnnotationData, SerializeError> {
        let wire: CommentWire = serde_json::from_value(raw.clone())?;
        let rect = box_wire_to_rect(&wire.commentator.bounding_box);
        Ok(AnnotationData::Comment(BoxData::from_rect(rect).corners()))
    }
}

pub struct MaskSerializer;

impl Serializer for MaskSerializer {
    fn kind(&self) -> AnnotationKind {
        AnnotationKind::Mask
    }

    fn serialize(&self, data: &AnnotationData) -> Result<Value, SerializeError> {
        let AnnotationData::Mask(data) = data else {
            return Err(wrong_shape(self.kind()));
        };
        let wire = MaskWire {
            mask: MaskBody {
                raster_id: data.raster_id,
                bounding_box: data.bounding_box.map(|rect| BoxWire {
                    x: rect.x,
                    y: rect.y,
                    w: rect.w,
                    h: rect.h,
                }),
            },
        };
        Ok(serde_json::to_value(wire)?)
    }

    fn deserialize(&self, raw: &Value) -> Result<AnnotationData, SerializeError> {
        let wire: MaskWire = serde_json::from_value(raw.clone())?;
        Ok(AnnotationData::Mask(MaskData {
            raster_id: wire.mask.raster_id,
            bounding_box: wire.mask.bounding_box.as_ref().map(box_wire_to_rect),
        }))
    }
}

pub struct TagSerializer;

impl Serializer for TagSerializer {
    fn kind(&self) -> AnnotationKind {
        AnnotationKind::Tag
    }

    fn serialize(&self, data: &AnnotationData) -> Result<Value, SerializeError> {
        let AnnotationData::Tag = data else {
            return Err(wrong_shape(self.kind()));
        };
        let wire = TagWire {
            tag: serde_json::Map::new(),
        };
        Ok(serde_json::to_value(wire)?)
    }

    fn deserialize(&self, raw: &Value) -> Result<AnnotationData, SerializeError> {
        let _: TagWire = serde_json::from_value(raw.clone())?;
        Ok(AnnotationData::Tag)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_bounding_box_round_trip_normalizes_corner_order() {
        // Built from a bottom-right to top-left drag.
        let data = AnnotationData::BoundingBox(BoxData::from_rect(Rect::from_corners(
            ImagePoint::new(50.0, 40.0),
            ImagePoint::new(10.0, 20.0),
        )));

        let serializer = BoundingBoxSerializer;
        let wire = serializer.serialize(&data).unwrap();
        assert_eq!(
            wire,
            json!({"bounding_box": {"x": 10.0, "y": 20.0, "w": 40.0, "h": 20.0}})
        );

        let back = serializer.deserialize(&wire).unwrap();
        assert_eq!(back, data);
    }

    #[test]
    fn test_negative_extent_on_wire_is_normalized() {
        let serializer = BoundingBoxSerializer;
        let raw = json!({"bounding_box": {"x": 30.0, "y": 30.0, "w": -20.0, "h": -10.0}});
        let data = serializer.deserialize(&raw).unwrap();
        let AnnotationData::BoundingBox(data) = data else {
            panic!("wrong kind");
        };
        assert_eq!(data.rect(), Rect::new(10.0, 20.0, 20.0, 10.0));
    }

    #[test]
    fn test_skeleton_wire_shape() {
        let data = AnnotationData::Skeleton(SkeletonData {
            nodes: vec![SkeletonNode {
                point: ImagePoint::new(1.0, 2.0),
                name: "head".to_string(),
                occluded: true,
            }],
        });
        let serializer = SkeletonSerializer;
        let wire = serializer.serialize(&data).unwrap();
        assert_eq!(
            wire,
            json!({"skeleton": {"nodes": [{"x": 1.0, "y": 2.0, "name": "head", "occluded": true}]}})
        );
        assert_eq!(serializer.deserialize(&wire).unwrap(), data);
    }

    #[test]
    fn test_comment_quad_travels_as_box() {
        let quad = BoxData::from_rect(Rect::new(5.0, 6.0, 7.0, 8.0)).corners();
        let data = AnnotationData::Comment(quad);
        let serializer = CommentSerializer;
        let wire = serializer.serialize(&data).unwrap();
        assert_eq!(
            wire,
            json!({"commentator": {"bounding_box": {"x": 5.0, "y": 6.0, "w": 7.0, "h": 8.0}}})
        );
        assert_eq!(serializer.deserialize(&wire).unwrap(), data);
    }

    #[test]
    fn test_wrong_shape_is_a_typed_error() {
        let serializer = PolygonSerializer;
        let data = AnnotationData::Tag;
        assert!(matches!(
            serializer.serialize(&data),
            Err(SerializeError::WrongShape {
                kind: AnnotationKind::Polygon
            })
        ));
    }

    #[test]
    fn test_mask_wire_round_trip() {
        let data = AnnotationData::Mask(MaskData {
            raster_id: 9,
            bounding_box: Some(Rect::new(0.0, 0.0, 4.0, 4.0)),
        });
        let serializer = MaskSerializer;
        let wire = serializer.serialize(&data).unwrap();
        assert_eq!(serializer.deserialize(&wire).unwrap(), data);

        let bare = json!({"mask": {"raster_id": 9}});
        assert_eq!(
            serializer.deserialize(&bare).unwrap(),
            AnnotationData::Mask(MaskData {
                raster_id: 9,
                bounding_box: None
            })
        );
    }
}
