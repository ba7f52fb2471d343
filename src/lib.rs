//! Umbrella crate for embedhub.
//!
//! This crate stitches the backend registry from `embeddings` together with
//! the concrete transports from `backends`, so callers can go from a
//! configuration URI to a vector with a single entry point:
//!
//! ```no_run
//! use embedhub::{EmbedHub, EmbedHubConfig, EmbeddingRequest, Modality};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = EmbedHubConfig::load(None)?;
//! let hub = EmbedHub::from_config(&config);
//! let embedding = hub
//!     .embed(
//!         config.storage_precision(),
//!         &config.client_uri,
//!         Modality::Text,
//!         &EmbeddingRequest::new("Hello world"),
//!     )
//!     .await?;
//! println!("{}", embedding.dimensions());
//! # Ok(())
//! # }
//! ```

pub mod config;
mod hub;

pub use config::{ConfigLoadError, EmbedHubConfig};
pub use hub::{EmbedHub, Embedding};

pub use backends::register_backends;
pub use embeddings::{
    BackendContext, Embedder, EmbeddingError, EmbeddingRecord, EmbeddingRequest,
    EmbeddingResponse, ErrorKind, Float, Modality, Precision, PrecisionTag, Registry, async_trait,
    mean_pool,
};
