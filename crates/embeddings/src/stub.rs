use async_trait::async_trait;
use fxhash::hash64;
use std::sync::Arc;
use url::Url;

use crate::embedder::{BackendContext, Embedder};
use crate::normalize::l2_normalize_in_place;
use crate::registry::{parse_param, query_param, Registry};
use crate::request::EmbeddingRequest;
use crate::response::EmbeddingResponse;
use crate::EmbeddingError;

pub const DEFAULT_STUB_DIMENSIONS: usize = 384;

/// Deterministic hash-derived backend for tests and offline pipelines.
///
/// `stub://?dimensions=384&model=stub`. Vectors are sinusoids of a 64-bit hash
/// of the request body, L2-normalized. Same bytes, same vector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StubEmbedder {
    dimensions: usize,
    model: String,
}

impl StubEmbedder {
    pub fn new(dimensions: usize, model: impl Into<String>) -> Result<Self, EmbeddingError> {
        if dimensions == 0 {
            return Err(EmbeddingError::InvalidParameter {
                param: "dimensions".into(),
                reason: "must be greater than zero".into(),
            });
        }
        Ok(Self {
            dimensions,
            model: model.into(),
        })
    }

    pub fn from_uri(_ctx: &BackendContext, uri: &Url) -> Result<Self, EmbeddingError> {
        let dimensions = parse_param(uri, "dimensions")?.unwrap_or(DEFAULT_STUB_DIMENSIONS);
        let model = query_param(uri, "model").unwrap_or_else(|| "stub".to_string());
        Self::new(dimensions, model)
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn vector(&self, bytes: &[u8]) -> Vec<f32> {
        let h = hash64(bytes);
        let mut v: Vec<f32> = (0..self.dimensions)
            .map(|idx| ((h >> (idx % 32)) as f32 * 0.0001).sin())
            .collect();
        l2_normalize_in_place(&mut v);
        v
    }

    fn respond(&self, req: &EmbeddingRequest) -> Result<EmbeddingResponse<f32>, EmbeddingError> {
        let model = req.model().unwrap_or(&self.model);
        EmbeddingResponse::new(
            req.id().map(str::to_string),
            model,
            self.vector(req.body()),
        )
    }
}

/// Installs `stub` plus `stub32` or `stub64`, depending on the registry.
pub fn register<T: crate::Float>(registry: &Registry<T>) -> Result<(), EmbeddingError> {
    registry.register_family::<f32, _>("stub", |ctx, uri| {
        Ok(Arc::new(StubEmbedder::from_uri(ctx, uri)?) as Arc<dyn Embedder<f32>>)
    })
}

#[async_trait]
impl Embedder<f32> for StubEmbedder {
    fn name(&self) -> &str {
        "stub"
    }

    async fn text_embeddings(
        &self,
        req: &EmbeddingRequest,
    ) -> Result<EmbeddingResponse<f32>, EmbeddingError> {
        self.respond(req)
    }

    async fn image_embeddings(
        &self,
        req: &EmbeddingRequest,
    ) -> Result<EmbeddingResponse<f32>, EmbeddingError> {
        self.respond(req)
    }
}
