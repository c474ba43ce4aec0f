//! The persistence capability boundary.
//!
//! The engine never talks to a backend directly. A `Store` is injected by
//! the host application and called at gesture end; everything before that
//! point is purely local state. Backend refusals come back as
//! `Err(StoreError)` and tools translate them into toasts.

use crate::error::StoreError;
use crate::model::{Annotation, AnnotationId};

/// Abilities the current user may or may not hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ability {
    CreateAnnotation,
    UpdateAnnotation,
    DeleteAnnotation,
}

/// Severity of a user-facing toast message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastLevel {
    Info,
    Warning,
    Error,
}

/// Injected persistence and reporting capabilities.
pub trait Store {
    /// Whether the current user holds `ability`.
    fn can(&self, ability: Ability) -> bool;

    fn create_annotation(&mut self, annotation: &Annotation) -> Result<(), StoreError>;

    fn update_annotation(&mut self, annotation: &Annotation) -> Result<(), StoreError>;

    fn delete_annotation(&mut self, id: AnnotationId) -> Result<(), StoreError>;

    /// Surface a message to the user. Default is a log line, for hosts
    /// without a notification surface.
    fn toast(&mut self, level: ToastLevel, message: &str) {
        match level {
            ToastLevel::Info => log::info!("{message}"),
            ToastLevel::Warning => log::warn!("{message}"),
            ToastLevel::Error => log::error!("{message}"),
        }
    }
}

/// In-memory store backend. Grants every ability unless listed in
/// `denied`, and records mutations; the default backend for tests and
/// offline use.
#[derive(Debug, Default)]
pub struct MemoryStore {
    pub created: Vec<AnnotationId>,
    pub updated: Vec<AnnotationId>,
    pub deleted: Vec<AnnotationId>,
    pub toasts: Vec<(ToastLevel, String)>,
    /// When set, every mutation is refused with this message.
    pub reject_with: Option<String>,
    /// Abilities the simulated user does not hold.
    pub denied: Vec<Ability>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn check(&self) -> Result<(), StoreError> {
        match &self.reject_with {
            Some(message) => Err(StoreError::rejected(message.clone())),
            None => Ok(()),
        }
    }
}

impl Store for MemoryStore {
    fn can(&self, ability: Ability) -> bool {
        !self.denied.contains(&ability)
    }

    fn create_annotation(&mut self, annotation: &Annotation) -> Result<(), StoreError> {
        self.check()?;
        self.created.push(annotation.id);
        Ok(())
    }

    fn update_annotation(&mut self, annotation: &Annotation) -> Result<(), StoreError> {
        self.check()?;
        self.updated.push(annotation.id);
        Ok(())
    }

    fn delete_annotation(&mut self, id: AnnotationId) -> Result<(), StoreError> {
        self.check()?;
        self.deleted.push(id);
        Ok(())
    }

    fn toast(&mut self, level: ToastLevel, message: &str) {
        self.toasts.push((level, message.to_string()));
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Rect;
    use crate::model::{AnnotationData, AnnotationPayload, BoxData};

    #[test]
    fn test_memory_store_records_and_rejects() {
        let annotation = Annotation::from_instance_params(
            1,
            0,
            AnnotationPayload::Image(AnnotationData::BoundingBox(BoxData::from_rect(Rect::new(
                0.0, 0.0, 1.0, 1.0,
            )))),
        );

        let mut store = MemoryStore::new();
        store.create_annotation(&annotation).unwrap();
        assert_eq!(store.created, vec![1]);

        store.reject_with = Some("read-only dataset".into());
        let err = store.update_annotation(&annotation).unwrap_err();
        assert_eq!(err.to_string(), "read-only dataset");
    }

    #[test]
    fn test_denied_abilities_are_reported() {
        let mut store = MemoryStore::new();
        assert!(store.can(Ability::CreateAnnotation));

        store.denied.push(Ability::CreateAnnotation);
        assert!(!store.can(Ability::CreateAnnotation));
        assert!(store.can(Ability::DeleteAnnotation));
    }
}
