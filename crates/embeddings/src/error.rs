//! Error surface shared by the registry, the pooling step and every backend.
//!
//! Each variant belongs to exactly one [`ErrorKind`]. Callers that only care
//! about the category (for exit codes, HTTP mapping, or tests) should match on
//! [`EmbeddingError::kind`] instead of individual variants.
//!
//! | Kind | Variants |
//! |------|----------|
//! | Configuration | `InvalidUri`, `UnknownScheme`, `MissingParameter`, `InvalidParameter`, `DuplicateScheme` |
//! | Initialization | `Initialization` |
//! | Transport | `Transport` |
//! | Cancelled | `Cancelled` |
//! | BackendProtocol | `BackendProtocol` |
//! | DimensionMismatch | `DimensionMismatch` |
//! | EmptyEmbedding | `EmptyEmbedding` |
//! | NotImplemented | `NotImplemented` |
use std::fmt;
use thiserror::Error;

/// Input modality of an embedding call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Modality {
    Text,
    Image,
}

impl fmt::Display for Modality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Modality::Text => f.write_str("text"),
            Modality::Image => f.write_str("image"),
        }
    }
}

/// Coarse error categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Configuration,
    Initialization,
    Transport,
    Cancelled,
    BackendProtocol,
    DimensionMismatch,
    EmptyEmbedding,
    NotImplemented,
}

/// Errors produced while resolving backends or generating embeddings.
#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum EmbeddingError {
    /// The configuration URI could not be parsed.
    #[error("invalid configuration uri '{uri}': {reason}")]
    InvalidUri { uri: String, reason: String },
    /// No constructor is registered for the scheme.
    #[error("unknown embedder scheme '{0}'")]
    UnknownScheme(String),
    /// A backend requires a query parameter that the URI does not carry.
    #[error("{scheme}: missing required parameter '{param}'")]
    MissingParameter { scheme: String, param: String },
    /// A query parameter is present but unusable.
    #[error("invalid parameter '{param}': {reason}")]
    InvalidParameter { param: String, reason: String },
    /// The scheme already has a constructor.
    #[error("embedder scheme '{0}' is already registered")]
    DuplicateScheme(String),
    /// The constructor ran but could not produce a usable backend.
    #[error("failed to initialize '{scheme}' embedder: {reason}")]
    Initialization { scheme: String, reason: String },
    /// Network or subprocess failure, including non-success statuses.
    #[error("transport failure: {0}")]
    Transport(String),
    /// The call was abandoned because its deadline elapsed.
    #[error("embedding call cancelled: {0}")]
    Cancelled(String),
    /// The backend answered with a payload we could not decode.
    #[error("backend protocol error: {0}")]
    BackendProtocol(String),
    /// Token vectors handed to pooling disagree on dimension (or are missing).
    #[error("dimension mismatch: {0}")]
    DimensionMismatch(String),
    /// A non-null backend produced a zero-length vector.
    #[error("'{model}' produced an empty embedding")]
    EmptyEmbedding { model: String },
    /// The backend does not support the requested modality.
    #[error("{backend} does not implement {modality} embeddings")]
    NotImplemented { backend: String, modality: Modality },
}

impl EmbeddingError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EmbeddingError::InvalidUri { .. }
            | EmbeddingError::UnknownScheme(_)
            | EmbeddingError::MissingParameter { .. }
            | EmbeddingError::InvalidParameter { .. }
            | EmbeddingError::DuplicateScheme(_) => ErrorKind::Configuration,
            EmbeddingError::Initialization { .. } => ErrorKind::Initialization,
            EmbeddingError::Transport(_) => ErrorKind::Transport,
            EmbeddingError::Cancelled(_) => ErrorKind::Cancelled,
            EmbeddingError::BackendProtocol(_) => ErrorKind::BackendProtocol,
            EmbeddingError::DimensionMismatch(_) => ErrorKind::DimensionMismatch,
            EmbeddingError::EmptyEmbedding { .. } => ErrorKind::EmptyEmbedding,
            EmbeddingError::NotImplemented { .. } => ErrorKind::NotImplemented,
        }
    }

    pub fn is_configuration(&self) -> bool {
        self.kind() == ErrorKind::Configuration
    }

    pub fn not_implemented(backend: impl Into<String>, modality: Modality) -> Self {
        EmbeddingError::NotImplemented {
            backend: backend.into(),
            modality,
        }
    }
}
