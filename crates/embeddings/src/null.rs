use async_trait::async_trait;
use std::sync::Arc;

use crate::embedder::Embedder;
use crate::precision::Float;
use crate::registry::Registry;
use crate::request::EmbeddingRequest;
use crate::response::EmbeddingResponse;
use crate::EmbeddingError;

/// No-op backend: every call succeeds with a zero-length vector.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullEmbedder;

/// Installs `null` plus `null32` or `null64`, depending on the registry.
pub fn register<T: Float>(registry: &Registry<T>) -> Result<(), EmbeddingError> {
    registry.register_family::<f64, _>("null", |_, _| {
        Ok(Arc::new(NullEmbedder) as Arc<dyn Embedder<f64>>)
    })
}

#[async_trait]
impl<T: Float> Embedder<T> for NullEmbedder {
    fn name(&self) -> &str {
        "null"
    }

    async fn text_embeddings(
        &self,
        req: &EmbeddingRequest,
    ) -> Result<EmbeddingResponse<T>, EmbeddingError> {
        Ok(EmbeddingResponse::null(req.id().map(str::to_string)))
    }

    async fn image_embeddings(
        &self,
        req: &EmbeddingRequest,
    ) -> Result<EmbeddingResponse<T>, EmbeddingError> {
        Ok(EmbeddingResponse::null(req.id().map(str::to_string)))
    }
}
