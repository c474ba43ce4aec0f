//! Core data model: annotations and rasters.

mod annotation;
mod raster;

pub use annotation::{
    Annotation, AnnotationData, AnnotationId, AnnotationKind, AnnotationPayload, BoxData, ClassId,
    CuboidData, InferredVideoData, MaskData, PolygonData, PolylineData, SkeletonData, SkeletonNode,
    SubAnnotation, VideoAnnotationData, WorkflowStageId,
};
pub use raster::{FileId, InvalidatedRegion, MAX_LABELS, Raster, RasterId};
