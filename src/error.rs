//! Error types for the annotation engine.

use thiserror::Error;

use crate::model::{AnnotationId, AnnotationKind, RasterId};

/// Errors raised by the raster (pixel mask) subsystem.
#[derive(Error, Debug)]
pub enum RasterError {
    /// A raster with this id is already registered on the manager.
    #[error("raster with id {id} already exists")]
    DuplicateRaster {
        /// The id that was registered twice
        id: RasterId,
    },

    /// A mask annotation references a raster the manager does not know.
    /// This means the raster/annotation graph is inconsistent.
    #[error("raster with id {id} not defined for annotation being removed")]
    MissingRaster {
        /// The referenced raster id
        id: RasterId,
    },

    /// A mask annotation has no label mapping on its raster.
    /// This means the raster/annotation graph is inconsistent.
    #[error("no label associated with annotation {annotation_id} on raster {raster_id}")]
    MissingLabelMapping {
        /// The raster that was inspected
        raster_id: RasterId,
        /// The annotation with no label
        annotation_id: AnnotationId,
    },

    /// Every label slot on the raster is in use.
    #[error("reached max available segments, currently support {max} labels per raster")]
    LabelsExhausted {
        /// Number of usable labels (index 0 is reserved for unlabeled)
        max: usize,
    },
}

/// Errors raised by interpolation-capable renderers.
#[derive(Error, Debug)]
pub enum InterpolateError {
    /// The requested algorithm is not implemented for this annotation kind.
    #[error("{kind} does not support '{algorithm}' interpolation algorithm")]
    UnsupportedAlgorithm {
        /// The annotation kind asked to interpolate
        kind: AnnotationKind,
        /// The algorithm name from the annotation data
        algorithm: String,
    },

    /// The renderer for this kind advertises no interpolation capability.
    #[error("{kind} renderer does not support interpolation")]
    NotCapable {
        /// The annotation kind asked to interpolate
        kind: AnnotationKind,
    },

    /// Keyframe data shapes do not match the renderer's kind.
    #[error("interpolation data mismatch: {message}")]
    DataMismatch {
        /// Description of the mismatch
        message: String,
    },
}

/// Errors raised by annotation serializers.
#[derive(Error, Debug)]
pub enum SerializeError {
    /// JSON encoding or decoding failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The payload shape does not match the serializer's kind.
    #[error("wrong data shape for {kind} serializer")]
    WrongShape {
        /// The serializer's annotation kind
        kind: AnnotationKind,
    },

    /// The wire payload is structurally invalid.
    #[error("invalid payload: {message}")]
    InvalidPayload {
        /// Description of the problem
        message: String,
    },
}

/// Errors returned by the injected persistence store.
///
/// These bubble back to the tool that triggered the backend action, which
/// translates them into a toast. They are never converted into panics.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The backend rejected the mutation.
    #[error("{message}")]
    Rejected {
        /// Backend-provided message, shown to the user
        message: String,
    },

    /// The current user lacks the ability for this mutation.
    #[error("not authorized to {action}")]
    Unauthorized {
        /// The attempted action
        action: String,
    },
}

impl StoreError {
    /// Create a rejection with a user-facing message.
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected {
            message: message.into(),
        }
    }
}

/// Errors raised while executing or reverting actions.
#[derive(Error, Debug)]
pub enum ActionError {
    /// The store refused the mutation wrapped by the action.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The raster subsystem failed while applying the action.
    #[error(transparent)]
    Raster(#[from] RasterError),
}
