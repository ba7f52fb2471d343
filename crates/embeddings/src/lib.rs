//! Embedding backends behind one interface.
//!
//! Backends turn bytes (text or an encoded image) into a single dense vector.
//! Which backend runs is chosen at runtime by a configuration URI such as
//! `ollama://localhost:11434?model=embeddinggemma` or `null://`; the scheme is
//! the lookup key in a [`Registry`], the rest of the URI belongs to the backend.
//!
//! Vectors are stored as `f32` or `f64`. Rather than keeping a copy of every
//! type per precision, [`EmbeddingResponse<T>`] is generic over the sealed
//! [`Float`] trait and carries a [`PrecisionTag`] saying what it holds and, if
//! different, what the model produced.
//!
//! Encoder-style backends that report one vector per token go through
//! [`mean_pool`] to get the sentence vector.
//!
//! ## Built-in backends
//!
//! - `null`, `null32`, `null64`: always succeed with an empty vector.
//! - `stub`, `stub32`, `stub64`: deterministic hash vectors,
//!   `?dimensions=` (default 384).
//!
//! The HTTP and subprocess backends live in the `backends` crate.

pub mod error;
pub mod precision;
pub mod pool;

mod embedder;
mod normalize;
mod null;
mod registry;
mod request;
mod response;
mod stub;

pub use embedder::{BackendContext, Embedder};
pub use error::{EmbeddingError, ErrorKind, Modality};
pub use normalize::{l2_norm, l2_normalize_in_place};
pub use null::NullEmbedder;
pub use pool::{mean_pool, mean_pool_rows, Pooled, TokenVector};
pub use precision::{as_float32, as_float64, convert_slice, Float, Precision, PrecisionTag};
pub use registry::{parse_param, query_param, Constructor, Registry};
pub use request::EmbeddingRequest;
pub use response::{EmbeddingRecord, EmbeddingResponse, NULL_MODEL};
pub use stub::{StubEmbedder, DEFAULT_STUB_DIMENSIONS};

/// Re-exported so backend crates implement [`Embedder`] with the same macro.
pub use async_trait::async_trait;
