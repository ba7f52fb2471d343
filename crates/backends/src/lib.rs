//! Concrete embedding backends.
//!
//! Each backend is behind a cargo feature of the same name (all on by
//! default) and registers a scheme family: the bare scheme plus a `32` or `64`
//! suffixed alias, matching the precision of the registry it is installed in.
//!
//! | scheme | transport | image |
//! |--------|-----------|-------|
//! | `ollama`, `ollamas` | HTTP `/api/embed` | no |
//! | `llamafile` | HTTP `/embedding` | yes |
//! | `openclip` | HTTP `/embeddings`, `/embeddings/image` | yes |
//! | `encoderfile` | HTTP `/predict`, mean-pooled | no |
//! | `mlxclip` | `python3 <script>` | yes |
//!
//! ```no_run
//! use embeddings::{BackendContext, EmbeddingRequest, Registry};
//!
//! # async fn run() -> Result<(), embeddings::EmbeddingError> {
//! let registry = Registry::<f32>::with_builtin(BackendContext::default());
//! backends::register_backends(&registry)?;
//!
//! let embedder = registry.resolve("ollama://localhost:11434?model=embeddinggemma")?;
//! let rsp = embedder
//!     .text_embeddings(&EmbeddingRequest::new("Hello world"))
//!     .await?;
//! println!("{} dimensions", rsp.dimensions());
//! # Ok(())
//! # }
//! ```
use embeddings::{EmbeddingError, Float, Registry};

#[cfg(feature = "http")]
mod http;

#[cfg(feature = "encoderfile")]
pub mod encoderfile;
#[cfg(feature = "llamafile")]
pub mod llamafile;
#[cfg(feature = "mlxclip")]
pub mod mlxclip;
#[cfg(feature = "ollama")]
pub mod ollama;
#[cfg(feature = "openclip")]
pub mod openclip;

/// Installs every compiled-in backend family into `registry`.
pub fn register_backends<T: Float>(registry: &Registry<T>) -> Result<(), EmbeddingError> {
    #[cfg(feature = "ollama")]
    ollama::register(registry)?;
    #[cfg(feature = "llamafile")]
    llamafile::register(registry)?;
    #[cfg(feature = "openclip")]
    openclip::register(registry)?;
    #[cfg(feature = "encoderfile")]
    encoderfile::register(registry)?;
    #[cfg(feature = "mlxclip")]
    mlxclip::register(registry)?;
    Ok(())
}
