//! Per-view annotation index.
//!
//! Owns every annotation displayed on one view, in z-order (last is
//! topmost), with selection/highlight bookkeeping and a dirty flag the
//! render pass consumes.

use std::collections::HashMap;

use crate::geometry::{CompoundPath, ImagePoint};
use crate::model::{Annotation, AnnotationId, AnnotationPayload};

#[derive(Debug, Default)]
pub struct AnnotationManager {
    annotations: HashMap<AnnotationId, Annotation>,
    /// Z-order, bottom first.
    order: Vec<AnnotationId>,
    selected_id: Option<AnnotationId>,
    highlighted_id: Option<AnnotationId>,
    next_id: AnnotationId,
    dirty: bool,
}

impl AnnotationManager {
    pub fn new() -> Self {
        Self {
            next_id: 1,
            dirty: true,
            ..Default::default()
        }
    }

    // ========================================================================
    // Dirty Flag
    // ========================================================================

    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Clear after the render pass has rebuilt the annotation layer.
    #[inline]
    pub fn clear_dirty(&mut self) {
        self.dirty = false;
    }

    #[inline]
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    // ========================================================================
    // CRUD
    // ========================================================================

    /// Next locally unique annotation id for tool drafts.
    pub fn next_id(&mut self) -> AnnotationId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Insert an annotation on top of the z-order.
    pub fn add(&mut self, annotation: Annotation) -> AnnotationId {
        let id = annotation.id;
        self.next_id = self.next_id.max(id + 1);
        if self.annotations.insert(id, annotation).is_none() {
            self.order.push(id);
        }
        self.mark_dirty();
        id
    }

    /// Remove an annotation. The caller is responsible for raster cleanup
    /// when the removed annotation is a mask (see `View::delete_annotation`).
    pub fn remove(&mut self, id: AnnotationId) -> Option<Annotation> {
        let removed = self.annotations.remove(&id)?;
        self.order.retain(|other| *other != id);
        if self.selected_id == Some(id) {
            self.selected_id = None;
        }
        if self.highlighted_id == Some(id) {
            self.highlighted_id = None;
        }
        self.mark_dirty();
        Some(removed)
    }

    pub fn get(&self, id: AnnotationId) -> Option<&Annotation> {
        self.annotations.get(&id)
    }

    pub fn get_mut(&mut self, id: AnnotationId) -> Option<&mut Annotation> {
        // Any mutable access may change geometry.
        self.dirty = true;
        self.annotations.get_mut(&id)
    }

    /// Replace an annotation's payload, invalidating its render path.
    /// Returns false when the annotation is gone (async-delete race).
    pub fn set_payload(&mut self, id: AnnotationId, payload: AnnotationPayload) -> bool {
        match self.annotations.get_mut(&id) {
            Some(annotation) => {
                annotation.payload = payload;
                annotation.invalidate_render_path();
                self.mark_dirty();
                true
            }
            None => {
                log::warn!("annotation {id} not found while updating payload");
                false
            }
        }
    }

    /// Annotations in z-order, bottom first.
    pub fn iter(&self) -> impl Iterator<Item = &Annotation> {
        self.order.iter().filter_map(|id| self.annotations.get(id))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Annotation> {
        self.dirty = true;
        self.annotations.values_mut()
    }

    pub fn len(&self) -> usize {
        self.annotations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.annotations.is_empty()
    }

    pub fn clear(&mut self) {
        if !self.annotations.is_empty() {
            self.mark_dirty();
        }
        self.annotations.clear();
        self.order.clear();
        self.selected_id = None;
        self.highlighted_id = None;
    }

    // ========================================================================
    // Selection / Highlight
    // ========================================================================

    pub fn select(&mut self, id: Option<AnnotationId>) {
        if self.selected_id == id {
            return;
        }
        if let Some(previous) = self.selected_id.and_then(|id| self.annotations.get_mut(&id)) {
            previous.is_selected = false;
        }
        if let Some(current) = id.and_then(|id| self.annotations.get_mut(&id)) {
            current.is_selected = true;
            self.selected_id = id;
        } else {
            self.selected_id = None;
        }
        self.mark_dirty();
    }

    pub fn selected(&self) -> Option<AnnotationId> {
        self.selected_id
    }

    pub fn highlight(&mut self, id: Option<AnnotationId>) {
        if self.highlighted_id == id {
            return;
        }
        if let Some(previous) = self
            .highlighted_id
            .and_then(|id| self.annotations.get_mut(&id))
        {
            previous.is_highlighted = false;
        }
        if let Some(current) = id.and_then(|id| self.annotations.get_mut(&id)) {
            current.is_highlighted = true;
            self.highlighted_id = id;
        } else {
            self.highlighted_id = None;
        }
        self.mark_dirty();
    }

    pub fn highlighted(&self) -> Option<AnnotationId> {
        self.highlighted_id
    }

    // ========================================================================
    // Hit Testing
    // ========================================================================

    /// Topmost visible annotation containing `point`. Uses the cached
    /// render path when present, otherwise `path_for` derives one.
    pub fn topmost_at(
        &self,
        point: &ImagePoint,
        path_for: impl Fn(&Annotation) -> CompoundPath,
    ) -> Option<AnnotationId> {
        for id in self.order.iter().rev() {
            let Some(annotation) = self.annotations.get(id) else {
                continue;
            };
            if !annotation.is_visible {
                continue;
            }
            let contains = match &annotation.render_path {
                Some(path) => path.contains(point),
                None => path_for(annotation).contains(point),
            };
            if contains {
                return Some(*id);
            }
        }
        None
    }
}

// ============================================================================
// Tests
// ============================================================================
