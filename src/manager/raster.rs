//! The raster manager: owns the label buffers for a view and keeps them
//! consistent with annotation lifecycle.
//!
//! Consumers observe the manager through a typed, synchronous pub-sub:
//! every event is delivered on the calling thread, in subscription order,
//! before the mutating call returns.

use std::collections::HashMap;

use crate::error::RasterError;
use crate::model::{Annotation, FileId, Raster, RasterId};

/// Events published by the raster manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RasterEvent {
    Created(RasterId),
    Updated(RasterId),
    Deleted(RasterId),
    /// The set or content of rasters changed in some way.
    Changed,
    /// A structural error occurred (e.g. duplicate creation).
    Error,
}

/// Token returned by `subscribe`; pass back to `unsubscribe` to release
/// the listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Subscription(u64);

type Listener = Box<dyn FnMut(&RasterEvent)>;

#[derive(Default)]
pub struct RasterManager {
    rasters: HashMap<RasterId, Raster>,
    /// Insertion order, the order `rasters()` reports.
    order: Vec<RasterId>,
    /// Memoized snapshot of `order`; rebuilt lazily after structural
    /// changes. Purely a read-amortization, observably equivalent to
    /// recomputing from the index.
    memo_ids: Option<Vec<RasterId>>,
    listeners: Vec<(Subscription, Listener)>,
    next_subscription: u64,
    dirty: bool,
}

impl RasterManager {
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Pub-Sub
    // ========================================================================

    pub fn subscribe(&mut self, listener: Listener) -> Subscription {
        self.next_subscription += 1;
        let subscription = Subscription(self.next_subscription);
        self.listeners.push((subscription, listener));
        subscription
    }

    pub fn unsubscribe(&mut self, subscription: Subscription) {
        self.listeners.retain(|(token, _)| *token != subscription);
    }

    fn emit(&mut self, event: RasterEvent) {
        for (_, listener) in &mut self.listeners {
            listener(&event);
        }
    }

    // ========================================================================
    // Dirty Flag
    // ========================================================================

    /// Whether the raster layer needs a redraw.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn clear_dirty(&mut self) {
        self.dirty = false;
    }

    // ========================================================================
    // Create
    // ========================================================================

    /// Register a raster. Duplicate ids are a typed error, observed both
    /// by the caller and by event subscribers.
    pub fn create_raster(&mut self, raster: Raster) -> Result<RasterId, RasterError> {
        let id = raster.id;
        if self.rasters.contains_key(&id) {
            self.emit(RasterEvent::Error);
            return Err(RasterError::DuplicateRaster { id });
        }

        self.order.push(id);
        self.rasters.insert(id, raster);
        self.memo_ids = None;
        self.dirty = true;

        self.emit(RasterEvent::Created(id));
        self.emit(RasterEvent::Changed);
        Ok(id)
    }

    // ========================================================================
    // Read
    // ========================================================================

    pub fn has_raster(&self, id: RasterId) -> bool {
        self.rasters.contains_key(&id)
    }

    /// Non-throwing lookup: a missing raster is a normal race during
    /// async deletion and only warrants a warning.
    pub fn get_raster(&self, id: RasterId) -> Option<&Raster> {
        let raster = self.rasters.get(&id);
        if raster.is_none() {
            log::warn!("raster with id {id} not found");
        }
        raster
    }

    /// Mutable access for in-place buffer painting. Callers must follow
    /// up with `notify_raster_updated` so caches and subscribers see the
    /// change.
    pub fn get_raster_mut(&mut self, id: RasterId) -> Option<&mut Raster> {
        let raster = self.rasters.get_mut(&id);
        if raster.is_none() {
            log::warn!("raster with id {id} not found");
        }
        raster
    }

    /// The raster associated with `file_id`, if any.
    pub fn raster_for_file(&self, file_id: FileId) -> Option<&Raster> {
        self.order
            .iter()
            .filter_map(|id| self.rasters.get(id))
            .find(|raster| raster.file_id == file_id)
    }

    /// Ids of all rasters, in creation order. Served from the memo
    /// between structural changes.
    pub fn raster_ids(&mut self) -> Vec<RasterId> {
        if let Some(ids) = &self.memo_ids {
            return ids.clone();
        }
        let ids = self.order.clone();
        self.memo_ids = Some(ids.clone());
        ids
    }

    /// All rasters on the manager, in creation order.
    pub fn rasters(&mut self) -> Vec<&Raster> {
        let ids = self.raster_ids();
        ids.into_iter()
            .filter_map(|id| self.rasters.get(&id))
            .collect()
    }

    // ========================================================================
    // Update
    // ========================================================================

    /// Replace a raster's stored value and notify. An unknown raster is
    /// registered instead (self-healing register-on-first-use).
    pub fn update_raster(&mut self, raster: Raster) -> Result<RasterId, RasterError> {
        let id = raster.id;
        if self.rasters.contains_key(&id) {
            self.rasters.insert(id, raster);
            self.dirty = true;
            self.emit(RasterEvent::Updated(id));
            self.emit(RasterEvent::Changed);
            Ok(id)
        } else {
            self.create_raster(raster)
        }
    }

    /// Notify subscribers that a raster's buffer was painted in place.
    pub fn notify_raster_updated(&mut self, id: RasterId) {
        if !self.rasters.contains_key(&id) {
            log::warn!("raster with id {id} not found while notifying update");
            return;
        }
        self.dirty = true;
        self.emit(RasterEvent::Updated(id));
        self.emit(RasterEvent::Changed);
    }

    // ========================================================================
    // Delete
    // ========================================================================

    pub fn delete_raster(&mut self, id: RasterId) -> Option<Raster> {
        if !self.rasters.contains_key(&id) {
            return None;
        }
        let removed = self.delete_from_index(id);
        self.emit(RasterEvent::Deleted(id));
        self.emit(RasterEvent::Changed);
        removed
    }

    pub fn delete_rasters(&mut self) {
        for id in self.order.clone() {
            if self.delete_from_index(id).is_some() {
                self.emit(RasterEvent::Deleted(id));
            }
        }
        self.emit(RasterEvent::Changed);
    }

    fn delete_from_index(&mut self, id: RasterId) -> Option<Raster> {
        let removed = self.rasters.remove(&id)?;
        self.order.retain(|other| *other != id);
        self.memo_ids = None;
        self.dirty = true;
        Some(removed)
    }

    // ========================================================================
    // Deletion Cleanup
    // ========================================================================

    /// Cleanup of an annotation's pixels when a mask annotation is
    /// deleted: zero every buffer cell holding its label, scoped to its
    /// bounding box when present, then drop the label mapping and
    /// invalidate the affected rectangle.
    ///
    /// A missing raster or label mapping means the raster/annotation
    /// graph is inconsistent; both are invariant errors, never ignored.
    pub fn remove_annotation_from_raster(
        &mut self,
        annotation: &Annotation,
    ) -> Result<(), RasterError> {
        let Some(mask) = annotation.mask_data() else {
            // Not a raster annotation.
            return Ok(());
        };

        let raster_id = mask.raster_id;
        let bounding_box = mask.bounding_box;
        let raster = self
            .rasters
            .get_mut(&raster_id)
            .ok_or(RasterError::MissingRaster { id: raster_id })?;

        let label_index = raster.label_index_for_annotation(annotation.id).ok_or(
            RasterError::MissingLabelMapping {
                raster_id,
                annotation_id: annotation.id,
            },
        )?;

        let width = raster.width();
        let height = raster.height();

        let (x_min, x_max, y_min, y_max) = match bounding_box {
            Some(bb) => (
                (bb.x.max(0.0) as usize).min(width),
                ((bb.x + bb.w).max(0.0) as usize).min(width),
                (bb.y.max(0.0) as usize).min(height),
                ((bb.y + bb.h).max(0.0) as usize).min(height),
            ),
            None => (0, width, 0, height),
        };

        for y in y_min..y_max {
            for x in x_min..x_max {
                if raster.buffer[(y, x)] == label_index {
                    raster.buffer[(y, x)] = 0;
                }
            }
        }

        raster.delete_annotation_mapping(label_index);
        // -1 on edges to be inclusive of the edge pixels.
        raster.invalidate(
            x_min,
            x_max.saturating_sub(1),
            y_min,
            y_max.saturating_sub(1),
        );

        self.dirty = true;
        self.emit(RasterEvent::Updated(raster_id));
        self.emit(RasterEvent::Changed);
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::geometry::Rect;
    use crate::model::{AnnotationData, AnnotationPayload, MaskData};

    fn mask_annotation(id: u64, raster_id: RasterId, bb: Option<Rect>) -> Annotation {
        Annotation::from_instance_params(
            id,
            0,
            AnnotationPayload::Image(AnnotationData::Mask(MaskData {
                raster_id,
                bounding_box: bb,
            })),
        )
    }

    #[test]
    fn test_create_raster_duplicate_throws_and_keeps_first() {
        let mut manager = RasterManager::new();
        let mut first = Raster::new(1, 1, 4, 4);
        first.buffer[(0, 0)] = 9;
        manager.create_raster(first).unwrap();

        let result = manager.create_raster(Raster::new(1, 1, 4, 4));
        assert!(matches!(result, Err(RasterError::DuplicateRaster { id: 1 })));
        // First raster's buffer untouched.
        assert_eq!(manager.get_raster(1).unwrap().buffer[(0, 0)], 9);
    }

    #[test]
    fn test_duplicate_create_emits_error_event() {
        let mut manager = RasterManager::new();
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = events.clone();
        manager.subscribe(Box::new(move |event| sink.borrow_mut().push(event.clone())));

        manager.create_raster(Raster::new(1, 1, 4, 4)).unwrap();
        let _ = manager.create_raster(Raster::new(1, 1, 4, 4));

        let events = events.borrow();
        assert_eq!(
            *events,
            vec![
                RasterEvent::Created(1),
                RasterEvent::Changed,
                RasterEvent::Error
            ]
        );
    }

    #[test]
    fn test_update_unknown_raster_self_heals() {
        let mut manager = RasterManager::new();
        manager.update_raster(Raster::new(5, 1, 4, 4)).unwrap();
        assert!(manager.has_raster(5));
    }

    #[test]
    fn test_memoized_ids_track_structural_changes() {
        let mut manager = RasterManager::new();
        manager.create_raster(Raster::new(1, 1, 2, 2)).unwrap();
        assert_eq!(manager.raster_ids(), vec![1]);
        // Second read serves the memo.
        assert_eq!(manager.raster_ids(), vec![1]);

        manager.create_raster(Raster::new(2, 2, 2, 2)).unwrap();
        assert_eq!(manager.raster_ids(), vec![1, 2]);

        manager.delete_raster(1);
        assert_eq!(manager.raster_ids(), vec![2]);
    }

    #[test]
    fn test_deletion_cleanup_zeroes_only_own_label() {
        let mut manager = RasterManager::new();
        let mut raster = Raster::new(1, 1, 64, 64);
        // Annotation 100 owns label 1 across the whole buffer, annotation
        // 200 owns label 2 in a corner block.
        raster.buffer.fill(1);
        for y in 0..8 {
            for x in 0..8 {
                raster.buffer[(y, x)] = 2;
            }
        }
        raster.set_annotation_mapping(1, 100);
        raster.set_annotation_mapping(2, 200);
        manager.create_raster(raster).unwrap();

        let deleted = mask_annotation(100, 1, None);
        manager.remove_annotation_from_raster(&deleted).unwrap();

        let raster = manager.get_raster(1).unwrap();
        let label1 = raster.buffer.iter().filter(|&&v| v == 1).count();
        let label2 = raster.buffer.iter().filter(|&&v| v == 2).count();
        assert_eq!(label1, 0);
        assert_eq!(label2, 64);
        assert_eq!(raster.label_index_for_annotation(100), None);
        assert_eq!(raster.label_index_for_annotation(200), Some(2));
    }

    #[test]
    fn test_deletion_cleanup_scoped_to_bounding_box() {
        let mut manager = RasterManager::new();
        let mut raster = Raster::new(1, 1, 16, 16);
        raster.buffer.fill(1);
        raster.set_annotation_mapping(1, 100);
        manager.create_raster(raster).unwrap();

        // Bounding box covers only the top-left 4x4 block, so label-1
        // pixels outside it survive even though they are stale.
        let deleted = mask_annotation(100, 1, Some(Rect::new(0.0, 0.0, 4.0, 4.0)));
        manager.remove_annotation_from_raster(&deleted).unwrap();

        let raster = manager.get_raster(1).unwrap();
        assert_eq!(raster.buffer[(0, 0)], 0);
        assert_eq!(raster.buffer[(3, 3)], 0);
        assert_eq!(raster.buffer[(4, 4)], 1);
        assert_eq!(
            raster.invalidated_region(),
            crate::model::InvalidatedRegion {
                x_min: 0,
                x_max: 3,
                y_min: 0,
                y_max: 3
            }
        );
    }

    #[test]
    fn test_deletion_cleanup_invariant_violations() {
        let mut manager = RasterManager::new();
        // Unknown raster.
        let orphan = mask_annotation(100, 42, None);
        assert!(matches!(
            manager.remove_annotation_from_raster(&orphan),
            Err(RasterError::MissingRaster { id: 42 })
        ));

        // Known raster, unmapped annotation.
        manager.create_raster(Raster::new(1, 1, 4, 4)).unwrap();
        let unmapped = mask_annotation(100, 1, None);
        assert!(matches!(
            manager.remove_annotation_from_raster(&unmapped),
            Err(RasterError::MissingLabelMapping {
                raster_id: 1,
                annotation_id: 100
            })
        ));
    }

    #[test]
    fn test_non_mask_annotation_is_ignored() {
        use crate::model::BoxData;
        let mut manager = RasterManager::new();
        let plain = Annotation::from_instance_params(
            1,
            0,
            AnnotationPayload::Image(AnnotationData::BoundingBox(BoxData::from_rect(Rect::new(
                0.0, 0.0, 1.0, 1.0,
            )))),
        );
        assert!(manager.remove_annotation_from_raster(&plain).is_ok());
    }

    #[test]
    fn test_unsubscribe_stops_delivery() {
        let mut manager = RasterManager::new();
        let events = Rc::new(RefCell::new(0usize));
        let sink = events.clone();
        let token = manager.subscribe(Box::new(move |_| *sink.borrow_mut() += 1));

        manager.create_raster(Raster::new(1, 1, 2, 2)).unwrap();
        assert_eq!(*events.borrow(), 2);

        manager.unsubscribe(token);
        manager.delete_raster(1);
        assert_eq!(*events.borrow(), 2);
    }
}
