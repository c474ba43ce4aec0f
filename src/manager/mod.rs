//! Per-view managers: the annotation index and the raster index.

mod annotation;
mod raster;

pub use annotation::AnnotationManager;
pub use raster::{RasterEvent, RasterManager, Subscription};
