use async_trait::async_trait;
use std::time::Duration;

use crate::precision::Float;
use crate::request::EmbeddingRequest;
use crate::response::EmbeddingResponse;
use crate::EmbeddingError;

/// A backend that turns request bytes into one vector stored at precision `T`.
///
/// Instances are created once by [`Registry::resolve`](crate::Registry::resolve)
/// and shared across callers, so implementations keep no per-call state on
/// `self`. Dropping the returned future abandons the call.
#[async_trait]
pub trait Embedder<T: Float>: Send + Sync {
    /// Short backend label used in logs and errors.
    fn name(&self) -> &str;

    async fn text_embeddings(
        &self,
        req: &EmbeddingRequest,
    ) -> Result<EmbeddingResponse<T>, EmbeddingError>;

    async fn image_embeddings(
        &self,
        req: &EmbeddingRequest,
    ) -> Result<EmbeddingResponse<T>, EmbeddingError>;
}

/// Process-level settings handed to every backend constructor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendContext {
    /// Upper bound for one embedding call, network or subprocess.
    pub timeout: Duration,
    pub connect_timeout: Duration,
    /// Interpreter used by script-driven backends.
    pub python: String,
}

impl Default for BackendContext {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            python: "python3".to_string(),
        }
    }
}

impl BackendContext {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}
