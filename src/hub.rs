//! Composition root: one lazily-built registry per storage precision.

use std::sync::Arc;

use dashmap::DashMap;
use embeddings::{
    BackendContext, Embedder, EmbeddingError, EmbeddingRequest, EmbeddingResponse, Float,
    Modality, Precision, PrecisionTag, Registry,
};
use once_cell::sync::OnceCell;
use serde::{Serialize, Serializer};
use tracing::debug;

use crate::config::EmbedHubConfig;

type Resolved<T> = DashMap<String, Arc<dyn Embedder<T>>>;

/// Owns the f32 and f64 registries. Each is populated with the built-in and
/// every compiled-in backend family on first use, exactly once.
///
/// Embedders are resolved once per URI and reused by every later call for
/// the same URI. Failed resolutions are not remembered.
pub struct EmbedHub {
    context: BackendContext,
    float32: OnceCell<Registry<f32>>,
    float64: OnceCell<Registry<f64>>,
    resolved32: Resolved<f32>,
    resolved64: Resolved<f64>,
}

impl EmbedHub {
    pub fn new(context: BackendContext) -> Self {
        Self {
            context,
            float32: OnceCell::new(),
            float64: OnceCell::new(),
            resolved32: DashMap::new(),
            resolved64: DashMap::new(),
        }
    }

    pub fn from_config(config: &EmbedHubConfig) -> Self {
        Self::new(config.backend_context())
    }

    pub fn context(&self) -> &BackendContext {
        &self.context
    }

    pub fn registry32(&self) -> Result<&Registry<f32>, EmbeddingError> {
        self.float32.get_or_try_init(|| build(&self.context))
    }

    pub fn registry64(&self) -> Result<&Registry<f64>, EmbeddingError> {
        self.float64.get_or_try_init(|| build(&self.context))
    }

    pub fn resolve32(&self, uri: &str) -> Result<Arc<dyn Embedder<f32>>, EmbeddingError> {
        if let Some(hit) = self.resolved32.get(uri) {
            return Ok(hit.value().clone());
        }
        Ok(remember(&self.resolved32, uri, self.registry32()?.resolve(uri)?))
    }

    pub fn resolve64(&self, uri: &str) -> Result<Arc<dyn Embedder<f64>>, EmbeddingError> {
        if let Some(hit) = self.resolved64.get(uri) {
            return Ok(hit.value().clone());
        }
        Ok(remember(&self.resolved64, uri, self.registry64()?.resolve(uri)?))
    }

    /// Sorted schemes known at `precision`.
    pub fn schemes(&self, precision: Precision) -> Result<Vec<String>, EmbeddingError> {
        match precision {
            Precision::Float32 => Ok(self.registry32()?.list_schemes()),
            Precision::Float64 => Ok(self.registry64()?.list_schemes()),
            Precision::Null => Err(null_storage()),
        }
    }

    /// Runs one call against the embedder for `uri` in the registry for
    /// `precision`, resolving it on first use.
    pub async fn embed(
        &self,
        precision: Precision,
        uri: &str,
        modality: Modality,
        req: &EmbeddingRequest,
    ) -> Result<Embedding, EmbeddingError> {
        match precision {
            Precision::Float32 => {
                let embedder = self.resolve32(uri)?;
                call(embedder.as_ref(), modality, req).await.map(Embedding::Float32)
            }
            Precision::Float64 => {
                let embedder = self.resolve64(uri)?;
                call(embedder.as_ref(), modality, req).await.map(Embedding::Float64)
            }
            Precision::Null => Err(null_storage()),
        }
    }
}

/// Caches `embedder` under `uri`. A concurrent resolution that got there
/// first wins and is returned instead.
fn remember<T: Float>(
    cache: &Resolved<T>,
    uri: &str,
    embedder: Arc<dyn Embedder<T>>,
) -> Arc<dyn Embedder<T>> {
    cache.entry(uri.to_string()).or_insert(embedder).value().clone()
}

async fn call<T: Float>(
    embedder: &dyn Embedder<T>,
    modality: Modality,
    req: &EmbeddingRequest,
) -> Result<EmbeddingResponse<T>, EmbeddingError> {
    match modality {
        Modality::Text => embedder.text_embeddings(req).await,
        Modality::Image => embedder.image_embeddings(req).await,
    }
}

fn null_storage() -> EmbeddingError {
    EmbeddingError::InvalidParameter {
        param: "precision".into(),
        reason: "vectors are stored as float32 or float64".into(),
    }
}

/// A response whose storage precision was picked at runtime.
#[derive(Debug, Clone, PartialEq)]
pub enum Embedding {
    Float32(EmbeddingResponse<f32>),
    Float64(EmbeddingResponse<f64>),
}

impl Embedding {
    pub fn dimensions(&self) -> usize {
        match self {
            Embedding::Float32(rsp) => rsp.dimensions(),
            Embedding::Float64(rsp) => rsp.dimensions(),
        }
    }

    pub fn precision(&self) -> PrecisionTag {
        match self {
            Embedding::Float32(rsp) => rsp.precision(),
            Embedding::Float64(rsp) => rsp.precision(),
        }
    }

    pub fn model(&self) -> &str {
        match self {
            Embedding::Float32(rsp) => rsp.model(),
            Embedding::Float64(rsp) => rsp.model(),
        }
    }
}

impl Serialize for Embedding {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Embedding::Float32(rsp) => rsp.record().serialize(serializer),
            Embedding::Float64(rsp) => rsp.record().serialize(serializer),
        }
    }
}

impl Default for EmbedHub {
    fn default() -> Self {
        Self::new(BackendContext::default())
    }
}

impl std::fmt::Debug for EmbedHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbedHub")
            .field("context", &self.context)
            .field("float32_ready", &self.float32.get().is_some())
            .field("float64_ready", &self.float64.get().is_some())
            .field("resolved", &(self.resolved32.len() + self.resolved64.len()))
            .finish()
    }
}

fn build<T: Float>(context: &BackendContext) -> Result<Registry<T>, EmbeddingError> {
    let registry = Registry::with_builtin(context.clone());
    backends::register_backends(&registry)?;
    debug!(
        precision = %T::PRECISION,
        schemes = registry.len(),
        "embedder registry ready"
    );
    Ok(registry)
}
