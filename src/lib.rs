//! vannot - canvas annotation engine
//!
//! The headless core of an interactive image/video annotation editor:
//! a polymorphic annotation model, per-kind renderer/tool/serializer
//! plugins, pointer-driven drawing and editing with undo, keyframe
//! interpolation for video files and an ndarray-backed raster subsystem
//! for pixel masks. Drawing to an actual canvas and persistence to a
//! backend are left to the host, which injects a [`store::Store`] and
//! consumes the dirty flags and render-path caches this crate maintains.

pub mod action;
pub mod editor;
pub mod error;
pub mod geometry;
pub mod hotkeys;
pub mod input;
pub mod interpolate;
pub mod manager;
pub mod model;
pub mod registry;
pub mod renderer;
pub mod serializer;
pub mod store;
pub mod tool;
pub mod view;

pub use editor::{Editor, PointerPhase};
pub use model::{Annotation, AnnotationData, AnnotationId, AnnotationKind, AnnotationPayload};
pub use registry::{AnnotationPlugin, PluginRegistry};
pub use view::View;
