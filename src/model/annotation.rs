//! The annotation entity and its per-kind data shapes.
//!
//! An annotation is either image-shaped (one flat data payload) or
//! video-shaped (keyframed data over frame segments). The two
//! representations are a tagged union so image-shaped operations can never
//! be applied to video-shaped data or vice versa.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::geometry::{CompoundPath, ImagePoint, Rect};
use crate::interpolate::InterpolationParams;
use crate::model::raster::RasterId;
use crate::renderer::Renderer;

/// Unique identifier for an annotation.
pub type AnnotationId = u64;

/// Identifier of the annotation class (label) assigned to an annotation.
pub type ClassId = u32;

/// Identifier of the workflow stage an annotation was produced in.
pub type WorkflowStageId = u32;

// ============================================================================
// Annotation Kinds
// ============================================================================

/// The annotation kinds known to the engine.
///
/// Each kind is bound to exactly one {renderer, tool, serializer} triad by
/// the plugin registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AnnotationKind {
    BoundingBox,
    Polygon,
    Polyline,
    Skeleton,
    Cuboid,
    Comment,
    Mask,
    Tag,
}

impl AnnotationKind {
    /// Stable type name used by the registry and wire formats.
    pub fn name(&self) -> &'static str {
        match self {
            AnnotationKind::BoundingBox => "bounding_box",
            AnnotationKind::Polygon => "polygon",
            AnnotationKind::Polyline => "polyline",
            AnnotationKind::Skeleton => "skeleton",
            AnnotationKind::Cuboid => "cuboid",
            AnnotationKind::Comment => "commentator",
            AnnotationKind::Mask => "mask",
            AnnotationKind::Tag => "tag",
        }
    }
}

impl fmt::Display for AnnotationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// Per-Kind Data Shapes
// ============================================================================

/// Four-corner box stored as explicit corners.
///
/// Corners are stored (not derived from x/y/w/h) so a constrained vertex
/// drag can slide adjacent corners individually; the wire format
/// re-normalizes to top-left + size on serialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoxData {
    pub top_left: ImagePoint,
    pub top_right: ImagePoint,
    pub bottom_right: ImagePoint,
    pub bottom_left: ImagePoint,
}

impl BoxData {
    pub fn from_rect(rect: Rect) -> Self {
        Self {
            top_left: rect.top_left(),
            top_right: rect.top_right(),
            bottom_right: rect.bottom_right(),
            bottom_left: rect.bottom_left(),
        }
    }

    /// Normalized rectangle (min/abs over the stored corners).
    pub fn rect(&self) -> Rect {
        Rect::from_corners(self.top_left, self.bottom_right)
    }

    /// Corners in path order: TL, TR, BR, BL.
    pub fn corners(&self) -> [ImagePoint; 4] {
        [
            self.top_left,
            self.top_right,
            self.bottom_right,
            self.bottom_left,
        ]
    }
}

/// Closed outline with optional holes / extra parts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolygonData {
    pub path: Vec<ImagePoint>,
    #[serde(default)]
    pub additional_paths: Vec<Vec<ImagePoint>>,
}

/// Open vertex chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolylineData {
    pub path: Vec<ImagePoint>,
}

/// One named joint of a skeleton.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkeletonNode {
    pub point: ImagePoint,
    pub name: String,
    pub occluded: bool,
}

/// Posed skeleton instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkeletonData {
    pub nodes: Vec<SkeletonNode>,
}

/// 3D box projected as a front and a back face.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CuboidData {
    pub front: BoxData,
    pub back: BoxData,
}

/// Reference to the raster carrying this mask's pixels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaskData {
    pub raster_id: RasterId,
    /// Region of the raster this mask is known to occupy; deletion cleanup
    /// is scoped to it when present.
    pub bounding_box: Option<Rect>,
}

/// The per-kind data payload. Exactly one shape is legal per kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AnnotationData {
    BoundingBox(BoxData),
    Polygon(PolygonData),
    Polyline(PolylineData),
    Skeleton(SkeletonData),
    Cuboid(CuboidData),
    /// Comment thread anchored to a vertex quad: TL, TR, BR, BL.
    Comment([ImagePoint; 4]),
    Mask(MaskData),
    Tag,
}

impl AnnotationData {
    pub fn kind(&self) -> AnnotationKind {
        match self {
            AnnotationData::BoundingBox(_) => AnnotationKind::BoundingBox,
            AnnotationData::Polygon(_) => AnnotationKind::Polygon,
            AnnotationData::Polyline(_) => AnnotationKind::Polyline,
            AnnotationData::Skeleton(_) => AnnotationKind::Skeleton,
            AnnotationData::Cuboid(_) => AnnotationKind::Cuboid,
            AnnotationData::Comment(_) => AnnotationKind::Comment,
            AnnotationData::Mask(_) => AnnotationKind::Mask,
            AnnotationData::Tag => AnnotationKind::Tag,
        }
    }
}

// ============================================================================
// Image / Video Duality
// ============================================================================

/// Keyframed data of a video annotation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoAnnotationData {
    /// Explicit data at keyframes, keyed by frame index.
    pub frames: BTreeMap<u32, AnnotationData>,
    /// Frame ranges `[start, end)` over which the annotation exists.
    pub segments: Vec<[u32; 2]>,
    /// Whether gaps between keyframes are filled by interpolation.
    pub interpolated: bool,
    /// Named interpolation algorithm, e.g. `linear-1.1`.
    pub interpolate_algorithm: Option<String>,
}

impl VideoAnnotationData {
    /// Whether any segment covers `frame_index`.
    pub fn covers(&self, frame_index: u32) -> bool {
        self.segments
            .iter()
            .any(|range| frame_index >= range[0] && frame_index < range[1])
    }
}

/// An annotation's data is either flat (image) or keyframed (video).
/// The two are mutually exclusive by construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AnnotationPayload {
    Image(AnnotationData),
    Video(VideoAnnotationData),
}

// ============================================================================
// Annotation
// ============================================================================

/// A dependent annotation attached to a main one (text, attributes,
/// directional vector, ...). Carried opaquely by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubAnnotation {
    pub kind: String,
    pub data: serde_json::Value,
}

/// Video data resolved for one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct InferredVideoData {
    pub data: Option<AnnotationData>,
    /// True when the frame carries explicit keyframe data.
    pub keyframe: bool,
}

impl InferredVideoData {
    fn absent() -> Self {
        Self {
            data: None,
            keyframe: false,
        }
    }
}

/// One annotation instance on an image or video item.
#[derive(Debug, Clone)]
pub struct Annotation {
    pub id: AnnotationId,
    pub class_id: ClassId,
    pub kind: AnnotationKind,
    pub payload: AnnotationPayload,
    pub sub_annotations: Vec<SubAnnotation>,
    pub is_selected: bool,
    pub is_highlighted: bool,
    pub is_visible: bool,
    pub workflow_stage_id: Option<WorkflowStageId>,
    /// Render-path cache populated by `Renderer::render` for faster
    /// hit-testing. Invalidated whenever geometry changes.
    pub render_path: Option<CompoundPath>,
    /// Interpolated-frame cache, keyed by (prev, next, factor).
    interpolation_cache: RefCell<Option<InterpolationCache>>,
}

#[derive(Debug, Clone)]
struct InterpolationCache {
    prev_frame: u32,
    next_frame: u32,
    factor_bits: u64,
    data: AnnotationData,
}

impl Annotation {
    /// Create an annotation from tool-drawn instance parameters.
    pub fn from_instance_params(
        id: AnnotationId,
        class_id: ClassId,
        payload: AnnotationPayload,
    ) -> Self {
        let kind = payload_kind(&payload);
        Self {
            id,
            class_id,
            kind,
            payload,
            sub_annotations: Vec::new(),
            is_selected: false,
            is_highlighted: false,
            is_visible: true,
            workflow_stage_id: None,
            render_path: None,
            interpolation_cache: RefCell::new(None),
        }
    }

    /// Create an annotation from backend-deserialized fields.
    pub fn from_deserializable(
        id: AnnotationId,
        class_id: ClassId,
        payload: AnnotationPayload,
        sub_annotations: Vec<SubAnnotation>,
        workflow_stage_id: Option<WorkflowStageId>,
    ) -> Self {
        let mut annotation = Self::from_instance_params(id, class_id, payload);
        annotation.sub_annotations = sub_annotations;
        annotation.workflow_stage_id = workflow_stage_id;
        annotation
    }

    /// Create an annotation from model-inference output. Inference results
    /// arrive unselected and visible, with no workflow stage yet.
    pub fn from_inference_data(
        id: AnnotationId,
        class_id: ClassId,
        data: AnnotationData,
    ) -> Self {
        Self::from_instance_params(id, class_id, AnnotationPayload::Image(data))
    }

    pub fn is_video_annotation(&self) -> bool {
        matches!(self.payload, AnnotationPayload::Video(_))
    }

    pub fn is_image_annotation(&self) -> bool {
        matches!(self.payload, AnnotationPayload::Image(_))
    }

    pub fn is_raster_annotation(&self) -> bool {
        self.kind == AnnotationKind::Mask
    }

    /// The mask payload of a raster annotation, if this is one.
    ///
    /// Mask annotations are image-shaped; a video-shaped mask would be a
    /// construction bug and resolves to `None` here.
    pub fn mask_data(&self) -> Option<&MaskData> {
        match &self.payload {
            AnnotationPayload::Image(AnnotationData::Mask(mask)) => Some(mask),
            _ => None,
        }
    }

    /// Drop the cached render path. Must be called after any geometry
    /// mutation; the cache is an optimization only.
    pub fn invalidate_render_path(&mut self) {
        self.render_path = None;
    }

    /// Resolve the data payload effective at `frame_index`.
    ///
    /// Image annotations resolve to their flat data on any frame. Video
    /// annotations resolve per the keyframe rules: exact keyframe data when
    /// present; clamped to the nearest keyframe before the first / after
    /// the last; interpolated between bracketing keyframes when the
    /// annotation is flagged interpolated and the renderer is capable.
    pub fn infer_video_data(
        &self,
        frame_index: u32,
        renderer: Option<&dyn Renderer>,
    ) -> InferredVideoData {
        let video = match &self.payload {
            AnnotationPayload::Image(data) => {
                return InferredVideoData {
                    data: Some(data.clone()),
                    keyframe: true,
                };
            }
            AnnotationPayload::Video(video) => video,
        };

        if !video.covers(frame_index) {
            return InferredVideoData::absent();
        }

        if let Some(data) = video.frames.get(&frame_index) {
            return InferredVideoData {
                data: Some(data.clone()),
                keyframe: true,
            };
        }

        // Closest keyframes either side of the current frame.
        let prev = video.frames.range(..frame_index).next_back();
        let next = video.frames.range(frame_index + 1..).next();

        match (prev, next) {
            (None, None) => InferredVideoData::absent(),
            (None, Some((_, data))) | (Some((_, data)), None) => InferredVideoData {
                data: Some(data.clone()),
                keyframe: false,
            },
            (Some((&prev_idx, prev_data)), Some((&next_idx, next_data))) => {
                let renderer = match renderer {
                    Some(r) if video.interpolated && r.supports_interpolate() => r,
                    _ => {
                        return InferredVideoData {
                            data: Some(prev_data.clone()),
                            keyframe: false,
                        };
                    }
                };

                let factor =
                    f64::from(frame_index - prev_idx) / f64::from(next_idx - prev_idx);
                let params = InterpolationParams {
                    algorithm: video.interpolate_algorithm.clone(),
                    factor,
                };

                if let Some(cache) = self.interpolation_cache.borrow().as_ref() {
                    if cache.prev_frame == prev_idx
                        && cache.next_frame == next_idx
                        && cache.factor_bits == factor.to_bits()
                    {
                        return InferredVideoData {
                            data: Some(cache.data.clone()),
                            keyframe: false,
                        };
                    }
                }

                match renderer.interpolate(prev_data, next_data, &params) {
                    Ok(data) => {
                        *self.interpolation_cache.borrow_mut() = Some(InterpolationCache {
                            prev_frame: prev_idx,
                            next_frame: next_idx,
                            factor_bits: factor.to_bits(),
                            data: data.clone(),
                        });
                        InferredVideoData {
                            data: Some(data),
                            keyframe: false,
                        }
                    }
                    Err(err) => {
                        log::warn!("interpolation failed for annotation {}: {err}", self.id);
                        InferredVideoData {
                            data: Some(prev_data.clone()),
                            keyframe: false,
                        }
                    }
                }
            }
        }
    }

    /// Mutable access to the data effective at `frame_index`.
    ///
    /// On video annotations this is the keyframe at the frame if present,
    /// otherwise the closest keyframe before it (the one a live edit of a
    /// non-keyframe frame writes through to).
    pub fn data_at_mut(&mut self, frame_index: u32) -> Option<&mut AnnotationData> {
        self.interpolation_cache.borrow_mut().take();
        match &mut self.payload {
            AnnotationPayload::Image(data) => Some(data),
            AnnotationPayload::Video(video) => {
                let key = if video.frames.contains_key(&frame_index) {
                    frame_index
                } else {
                    *video.frames.range(..frame_index).next_back()?.0
                };
                video.frames.get_mut(&key)
            }
        }
    }
}

fn payload_kind(payload: &AnnotationPayload) -> AnnotationKind {
    match payload {
        AnnotationPayload::Image(data) => data.kind(),
        AnnotationPayload::Video(video) => video
            .frames
            .values()
            .next()
            .map(AnnotationData::kind)
            .unwrap_or(AnnotationKind::Tag),
    }
}

// ============================================================================
// Tests
// ============================================================================
