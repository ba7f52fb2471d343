//! llamafile / llama.cpp server `/embedding`.
//!
//! `llamafile://?client-uri=http://localhost:8080&model=LABEL`. Images are sent
//! base64-encoded as `image_data`. Servers running without pooling answer
//! with one vector per token; those are mean-pooled here.
use async_trait::async_trait;
use embeddings::{
    mean_pool_rows, query_param, BackendContext, Embedder, EmbeddingError, EmbeddingRequest,
    EmbeddingResponse, Float, Registry,
};
use serde::Deserialize;
use std::sync::Arc;
use url::Url;

use crate::http::{client_base, endpoint, ContentRequest, HttpClient};

pub const DEFAULT_LLAMAFILE_URI: &str = "http://localhost:8080";

pub fn register<T: Float>(registry: &Registry<T>) -> Result<(), EmbeddingError> {
    registry.register_family::<f64, _>("llamafile", |ctx, uri| {
        Ok(Arc::new(LlamafileEmbedder::from_uri(ctx, uri)?) as Arc<dyn Embedder<f64>>)
    })
}

#[derive(Debug, Clone)]
pub struct LlamafileEmbedder {
    http: HttpClient,
    url: Url,
    model: String,
}

#[derive(Debug, Deserialize)]
struct EmbeddingAnswer {
    embedding: Vector,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Vector {
    Pooled(Vec<f64>),
    PerToken(Vec<Vec<f64>>),
}

impl Vector {
    fn into_pooled(self) -> Result<Vec<f64>, EmbeddingError> {
        match self {
            Vector::Pooled(v) => Ok(v),
            Vector::PerToken(rows) if rows.len() == 1 => {
                Ok(rows.into_iter().next().unwrap_or_default())
            }
            Vector::PerToken(rows) => mean_pool_rows(rows.iter().map(Vec::as_slice)),
        }
    }
}

impl LlamafileEmbedder {
    pub fn from_uri(ctx: &BackendContext, uri: &Url) -> Result<Self, EmbeddingError> {
        let base = client_base(uri, DEFAULT_LLAMAFILE_URI)?;
        Ok(Self {
            http: HttpClient::new("llamafile", ctx)?,
            url: endpoint(&base, "/embedding"),
            model: query_param(uri, "model").unwrap_or_else(|| "llamafile".to_string()),
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    async fn embed(
        &self,
        req: &EmbeddingRequest,
        body: &ContentRequest<'_>,
    ) -> Result<EmbeddingResponse<f64>, EmbeddingError> {
        let answer: EmbeddingAnswer = self.http.post_json(&self.url, body).await?;
        let vector = answer.embedding.into_pooled()?;
        let model = req.model().unwrap_or(&self.model);
        EmbeddingResponse::new(req.id().map(str::to_string), model, vector)
    }
}

#[async_trait]
impl Embedder<f64> for LlamafileEmbedder {
    fn name(&self) -> &str {
        "llamafile"
    }

    async fn text_embeddings(
        &self,
        req: &EmbeddingRequest,
    ) -> Result<EmbeddingResponse<f64>, EmbeddingError> {
        let text = req.text();
        self.embed(req, &ContentRequest::text(&text)).await
    }

    async fn image_embeddings(
        &self,
        req: &EmbeddingRequest,
    ) -> Result<EmbeddingResponse<f64>, EmbeddingError> {
        self.embed(req, &ContentRequest::image(req.body())).await
    }
}
