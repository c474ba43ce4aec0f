//! The raster value type: a shared per-file label buffer backing mask
//! annotations.
//!
//! Each buffer cell holds the label index owning that pixel; index `0` is
//! reserved for "unlabeled". Labels are one byte, so a raster carries at
//! most 255 mask annotations; going wider would double memory for every
//! raster, so the cap is accepted and surfaced as a typed error.

use std::collections::{BTreeSet, HashMap};

use ndarray::Array2;

use crate::error::RasterError;
use crate::model::annotation::{Annotation, AnnotationId};

/// Unique identifier for a raster.
pub type RasterId = u64;

/// Identifier of the file (image / video frame source) a raster belongs to.
pub type FileId = u64;

/// Usable label indices per raster (index 0 is reserved).
pub const MAX_LABELS: usize = 255;

/// The rectangle of buffer cells whose content changed since the last
/// render pass. Edges are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidatedRegion {
    pub x_min: usize,
    pub x_max: usize,
    pub y_min: usize,
    pub y_max: usize,
}

/// A per-file pixel label buffer.
///
/// One raster is associated with at most one `(view, file)` pair at a time;
/// every mask annotation on that file references it by id.
#[derive(Debug, Clone)]
pub struct Raster {
    pub id: RasterId,
    pub file_id: FileId,
    width: usize,
    height: usize,
    /// Label indices, row-major `(height, width)`.
    pub buffer: Array2<u8>,
    label_to_annotation: HashMap<u8, AnnotationId>,
    annotation_to_label: HashMap<AnnotationId, u8>,
    labels_in_use: BTreeSet<u8>,
    invalidated: bool,
    invalidated_region: InvalidatedRegion,
    /// Draft annotations parked here during a brush stroke so the render
    /// pass can show them before they are committed.
    in_progress: HashMap<AnnotationId, Annotation>,
}

impl Raster {
    pub fn new(id: RasterId, file_id: FileId, width: usize, height: usize) -> Self {
        Self {
            id,
            file_id,
            width,
            height,
            buffer: Array2::zeros((height, width)),
            label_to_annotation: HashMap::new(),
            annotation_to_label: HashMap::new(),
            labels_in_use: BTreeSet::new(),
            invalidated: true,
            invalidated_region: InvalidatedRegion {
                x_min: 0,
                x_max: width.saturating_sub(1),
                y_min: 0,
                y_max: height.saturating_sub(1),
            },
            in_progress: HashMap::new(),
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn size(&self) -> usize {
        self.width * self.height
    }

    // ========================================================================
    // Label Mapping
    // ========================================================================

    /// Lowest unused non-zero label index. Not simply `len + 1`: deletion
    /// opens up earlier slots, which are reused first.
    pub fn next_available_label_index(&self) -> Result<u8, RasterError> {
        for index in 1..=MAX_LABELS {
            let index = index as u8;
            if !self.labels_in_use.contains(&index) {
                return Ok(index);
            }
        }
        Err(RasterError::LabelsExhausted { max: MAX_LABELS })
    }

    pub fn label_index_for_annotation(&self, annotation_id: AnnotationId) -> Option<u8> {
        self.annotation_to_label.get(&annotation_id).copied()
    }

    pub fn annotation_for_label(&self, label_index: u8) -> Option<AnnotationId> {
        self.label_to_annotation.get(&label_index).copied()
    }

    pub fn set_annotation_mapping(&mut self, label_index: u8, annotation_id: AnnotationId) {
        self.label_to_annotation.insert(label_index, annotation_id);
        self.annotation_to_label.insert(annotation_id, label_index);
        self.labels_in_use.insert(label_index);
    }

    pub fn delete_annotation_mapping(&mut self, label_index: u8) {
        if let Some(annotation_id) = self.label_to_annotation.remove(&label_index) {
            self.annotation_to_label.remove(&annotation_id);
        }
        self.labels_in_use.remove(&label_index);
    }

    pub fn clear_annotation_mappings(&mut self) {
        self.label_to_annotation.clear();
        self.annotation_to_label.clear();
        self.labels_in_use.clear();
    }

    /// Labels currently mapped on this raster, ascending.
    pub fn labels_on_raster(&self) -> Vec<u8> {
        self.labels_in_use.iter().copied().collect()
    }

    /// Ids of every annotation with a label on this raster.
    pub fn annotation_ids_on_raster(&self) -> Vec<AnnotationId> {
        self.labels_on_raster()
            .into_iter()
            .filter_map(|label| self.annotation_for_label(label))
            .collect()
    }

    // ========================================================================
    // In-Progress Annotations
    // ========================================================================

    pub fn in_progress_annotation(&self, annotation_id: AnnotationId) -> Option<&Annotation> {
        self.in_progress.get(&annotation_id)
    }

    pub fn set_in_progress_annotation(&mut self, annotation: Annotation) {
        self.in_progress.insert(annotation.id, annotation);
    }

    pub fn clear_in_progress_annotations(&mut self) {
        self.in_progress.clear();
    }

    // ========================================================================
    // Invalidation
    // ========================================================================

    /// Mark a buffer region (inclusive edges) as needing redraw.
    pub fn invalidate(&mut self, x_min: usize, x_max: usize, y_min: usize, y_max: usize) {
        self.invalidated_region = InvalidatedRegion {
            x_min,
            x_max,
            y_min,
            y_max,
        };
        self.invalidated = true;
    }

    pub fn is_invalidated(&self) -> bool {
        self.invalidated
    }

    pub fn invalidated_region(&self) -> InvalidatedRegion {
        self.invalidated_region
    }

    /// Called once the renderer has consumed the invalidation.
    pub fn clear_invalidation(&mut self) {
        self.invalidated = false;
    }
}

// ============================================================================
// Tests
// ============================================================================
