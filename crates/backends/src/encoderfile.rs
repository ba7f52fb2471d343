//! Encoderfile `/predict`: per-token vectors reduced with [`mean_pool`].
//!
//! `encoderfile://?client-uri=http://localhost:8080`. One input is sent per
//! call, so only the first result is pooled. Token labels are still collected
//! from every result.
use async_trait::async_trait;
use embeddings::{
    mean_pool, parse_param, query_param, BackendContext, Embedder, EmbeddingError,
    EmbeddingRequest, EmbeddingResponse, Float, Modality, Pooled, Registry, TokenVector,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;
use url::Url;

use crate::http::{client_base, endpoint, HttpClient};

pub const DEFAULT_ENCODERFILE_URI: &str = "http://localhost:8080";

pub fn register<T: Float>(registry: &Registry<T>) -> Result<(), EmbeddingError> {
    registry.register_family::<f32, _>("encoderfile", |ctx, uri| {
        Ok(Arc::new(EncoderfileEmbedder::from_uri(ctx, uri)?) as Arc<dyn Embedder<f32>>)
    })
}

#[derive(Debug, Clone)]
pub struct EncoderfileEmbedder {
    http: HttpClient,
    url: Url,
    model: Option<String>,
    normalize: bool,
}

#[derive(Debug, Serialize)]
struct PredictRequest<'a> {
    inputs: [&'a str; 1],
    normalize: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PredictResponse {
    #[serde(default)]
    results: Vec<PredictResult>,
    #[serde(default)]
    model_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PredictResult {
    #[serde(default)]
    embeddings: Vec<TokenEmbedding>,
}

#[derive(Debug, Deserialize)]
struct TokenEmbedding {
    embedding: Vec<f32>,
    #[serde(default)]
    token_info: Option<TokenInfo>,
}

#[derive(Debug, Deserialize)]
struct TokenInfo {
    token: String,
}

impl PredictResponse {
    /// Pools the first result; labels come from all of them.
    pub(crate) fn pool(self) -> Result<(Pooled<f32>, Option<String>), EmbeddingError> {
        let mut results = self.results.into_iter();
        let first = results.next().ok_or_else(|| {
            EmbeddingError::BackendProtocol("encoderfile response has no results".into())
        })?;
        if first.embeddings.is_empty() {
            return Err(EmbeddingError::BackendProtocol(
                "encoderfile result has no token embeddings".into(),
            ));
        }

        let rows: Vec<TokenVector<f32>> = first
            .embeddings
            .into_iter()
            .map(|t| TokenVector::new(t.token_info.map(|i| i.token), t.embedding))
            .collect();
        let mut pooled = mean_pool(&rows)?;

        for extra in results {
            pooled.tokens.extend(
                extra
                    .embeddings
                    .into_iter()
                    .filter_map(|t| t.token_info.map(|i| i.token)),
            );
        }
        Ok((pooled, self.model_id))
    }
}

impl EncoderfileEmbedder {
    pub fn from_uri(ctx: &BackendContext, uri: &Url) -> Result<Self, EmbeddingError> {
        let base = client_base(uri, DEFAULT_ENCODERFILE_URI)?;
        Ok(Self {
            http: HttpClient::new("encoderfile", ctx)?,
            url: endpoint(&base, "/predict"),
            model: query_param(uri, "model"),
            normalize: parse_param(uri, "normalize")?.unwrap_or(true),
        })
    }
}

#[async_trait]
impl Embedder<f32> for EncoderfileEmbedder {
    fn name(&self) -> &str {
        "encoderfile"
    }

    async fn text_embeddings(
        &self,
        req: &EmbeddingRequest,
    ) -> Result<EmbeddingResponse<f32>, EmbeddingError> {
        let text = req.text();
        let rsp: PredictResponse = self
            .http
            .post_json(
                &self.url,
                &PredictRequest {
                    inputs: [&*text],
                    normalize: self.normalize,
                },
            )
            .await?;

        let (pooled, model_id) = rsp.pool()?;
        debug!(tokens = pooled.tokens.len(), "pooled encoderfile output");

        let model = req
            .model()
            .map(str::to_string)
            .or_else(|| self.model.clone())
            .or(model_id)
            .unwrap_or_else(|| "encoderfile".to_string());
        EmbeddingResponse::new(req.id().map(str::to_string), model, pooled.vector)
    }

    async fn image_embeddings(
        &self,
        _req: &EmbeddingRequest,
    ) -> Result<EmbeddingResponse<f32>, EmbeddingError> {
        Err(EmbeddingError::not_implemented("encoderfile", Modality::Image))
    }
}
