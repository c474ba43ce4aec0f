//! One canvas surface.
//!
//! A view owns everything scoped to a single displayed file: the camera,
//! the annotation and raster managers, the current frame index, and the
//! measurement overlay. Tools and renderers receive a borrowed
//! `ViewContext` snapshot instead of the whole view so geometry calls can
//! run while the view itself is mutably borrowed elsewhere.

use crate::geometry::{CanvasPoint, ImagePoint, Rect};
use crate::manager::{AnnotationManager, RasterManager};
use crate::model::{Annotation, AnnotationId, FileId};

/// Immutable per-call snapshot of the view state renderers care about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewContext {
    pub frame_index: u32,
    pub show_measures: bool,
}

/// Canvas-to-image transform: uniform scale plus offset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub scale: f64,
    pub offset: CanvasPoint,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            scale: 1.0,
            offset: CanvasPoint::new(0.0, 0.0),
        }
    }
}

impl Camera {
    pub fn canvas_to_image(&self, point: CanvasPoint) -> ImagePoint {
        let local = point.sub(self.offset);
        ImagePoint::new(local.x / self.scale, local.y / self.scale)
    }

    pub fn image_to_canvas(&self, point: ImagePoint) -> CanvasPoint {
        CanvasPoint::new(
            point.x * self.scale + self.offset.x,
            point.y * self.scale + self.offset.y,
        )
    }
}

/// A measurement readout anchored to an image region, shown while a
/// drawing tool is sizing a shape.
#[derive(Debug, Clone, PartialEq)]
pub struct MeasureOverlay {
    pub region: Rect,
    pub label: String,
}

pub struct View {
    pub file_id: FileId,
    /// Image dimensions in image-space pixels.
    pub width: u32,
    pub height: u32,
    /// Total frames in the file; 1 for still images.
    pub frame_count: u32,
    pub camera: Camera,
    pub annotations: AnnotationManager,
    pub rasters: RasterManager,
    current_frame_index: u32,
    show_measures: bool,
    measure_overlay: Option<MeasureOverlay>,
    /// Set when the measurement or overlay layer needs a redraw; the
    /// annotation and raster layers carry their own flags.
    overlay_dirty: bool,
}

impl View {
    pub fn new(file_id: FileId, width: u32, height: u32, frame_count: u32) -> Self {
        Self {
            file_id,
            width,
            height,
            frame_count: frame_count.max(1),
            camera: Camera::default(),
            annotations: AnnotationManager::new(),
            rasters: RasterManager::new(),
            current_frame_index: 0,
            show_measures: false,
            measure_overlay: None,
            overlay_dirty: true,
        }
    }

    pub fn is_video(&self) -> bool {
        self.frame_count > 1
    }

    pub fn context(&self) -> ViewContext {
        ViewContext {
            frame_index: self.current_frame_index,
            show_measures: self.show_measures,
        }
    }

    // ========================================================================
    // Frame Navigation
    // ========================================================================

    pub fn current_frame_index(&self) -> u32 {
        self.current_frame_index
    }

    /// Jump to a frame, clamped to the file's range. Inferred video
    /// geometry changes with the frame, so cached render paths go stale.
    pub fn set_current_frame(&mut self, frame_index: u32) {
        let clamped = frame_index.min(self.frame_count - 1);
        if clamped == self.current_frame_index {
            return;
        }
        self.current_frame_index = clamped;
        for annotation in self.annotations.iter_mut() {
            annotation.invalidate_render_path();
        }
        self.annotations.mark_dirty();
        self.overlay_dirty = true;
    }

    // ========================================================================
    // Measurement Overlay
    // ========================================================================

    pub fn show_measures(&self) -> bool {
        self.show_measures
    }

    pub fn set_show_measures(&mut self, show: bool) {
        if self.show_measures != show {
            self.show_measures = show;
            if !show {
                self.measure_overlay = None;
            }
            self.overlay_dirty = true;
        }
    }

    pub fn measure_overlay(&self) -> Option<&MeasureOverlay> {
        self.measure_overlay.as_ref()
    }

    pub fn update_measures_overlay(&mut self, region: Rect, label: String) {
        self.measure_overlay = Some(MeasureOverlay { region, label });
        self.overlay_dirty = true;
    }

    pub fn remove_measures_overlay(&mut self) {
        if self.measure_overlay.take().is_some() {
            self.overlay_dirty = true;
        }
    }

    pub fn is_overlay_dirty(&self) -> bool {
        self.overlay_dirty
    }

    pub fn clear_overlay_dirty(&mut self) {
        self.overlay_dirty = false;
    }

    // ========================================================================
    // Annotation Lifecycle
    // ========================================================================

    /// Remove an annotation, cleaning its raster pixels first when it is
    /// a mask. The raster cleanup happens before the index removal so an
    /// invariant error leaves the annotation in place.
    pub fn delete_annotation(
        &mut self,
        id: AnnotationId,
    ) -> Result<Option<Annotation>, crate::error::RasterError> {
        let Some(annotation) = self.annotations.get(id) else {
            return Ok(None);
        };
        if annotation.is_raster_annotation() {
            let annotation = annotation.clone();
            self.rasters.remove_annotation_from_raster(&annotation)?;
        }
        Ok(self.annotations.remove(id))
    }
}

// ============================================================================
// Tests
// ============================================================================
