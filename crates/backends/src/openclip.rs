//! OpenCLIP behind a small Flask-style service.
//!
//! Text goes to `/embeddings` as `{content}`, images to `/embeddings/image` as
//! base64 `image_data`. Both answer `{"embedding": [...]}`.
use async_trait::async_trait;
use embeddings::{
    query_param, BackendContext, Embedder, EmbeddingError, EmbeddingRequest, EmbeddingResponse,
    Float, Registry,
};
use serde::Deserialize;
use std::sync::Arc;
use url::Url;

use crate::http::{client_base, endpoint, ContentRequest, HttpClient};

pub const DEFAULT_OPENCLIP_URI: &str = "http://127.0.0.1:5000";

pub fn register<T: Float>(registry: &Registry<T>) -> Result<(), EmbeddingError> {
    registry.register_family::<f64, _>("openclip", |ctx, uri| {
        Ok(Arc::new(OpenClipEmbedder::from_uri(ctx, uri)?) as Arc<dyn Embedder<f64>>)
    })
}

#[derive(Debug, Clone)]
pub struct OpenClipEmbedder {
    http: HttpClient,
    text_url: Url,
    image_url: Url,
    model: String,
}

#[derive(Debug, Deserialize)]
struct EmbeddingAnswer {
    #[serde(default)]
    embedding: Vec<f64>,
}

impl OpenClipEmbedder {
    pub fn from_uri(ctx: &BackendContext, uri: &Url) -> Result<Self, EmbeddingError> {
        let base = client_base(uri, DEFAULT_OPENCLIP_URI)?;
        Ok(Self {
            http: HttpClient::new("openclip", ctx)?,
            text_url: endpoint(&base, "/embeddings"),
            image_url: endpoint(&base, "/embeddings/image"),
            model: query_param(uri, "model").unwrap_or_else(|| "openclip".to_string()),
        })
    }

    async fn embed(
        &self,
        url: &Url,
        req: &EmbeddingRequest,
        body: &ContentRequest<'_>,
    ) -> Result<EmbeddingResponse<f64>, EmbeddingError> {
        let answer: EmbeddingAnswer = self.http.post_json(url, body).await?;
        let model = req.model().unwrap_or(&self.model);
        EmbeddingResponse::new(req.id().map(str::to_string), model, answer.embedding)
    }
}

#[async_trait]
impl Embedder<f64> for OpenClipEmbedder {
    fn name(&self) -> &str {
        "openclip"
    }

    async fn text_embeddings(
        &self,
        req: &EmbeddingRequest,
    ) -> Result<EmbeddingResponse<f64>, EmbeddingError> {
        let text = req.text();
        self.embed(&self.text_url, req, &ContentRequest::text(&text))
            .await
    }

    async fn image_embeddings(
        &self,
        req: &EmbeddingRequest,
    ) -> Result<EmbeddingResponse<f64>, EmbeddingError> {
        self.embed(&self.image_url, req, &ContentRequest::image(req.body()))
            .await
    }
}
