//! Ollama `/api/embed`.
//!
//! `ollama://host:port?model=NAME` talks plain HTTP, `ollamas://` HTTPS. With
//! no host the local daemon at `localhost:11434` is used. Only the first
//! vector of the answer is kept since one input is sent per call.
use async_trait::async_trait;
use embeddings::{
    query_param, BackendContext, Embedder, EmbeddingError, EmbeddingRequest, EmbeddingResponse,
    Float, Modality, Registry,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use url::Url;

use crate::http::{endpoint, HttpClient};

pub const DEFAULT_OLLAMA_HOST: &str = "localhost:11434";

pub fn register<T: Float>(registry: &Registry<T>) -> Result<(), EmbeddingError> {
    for base in ["ollama", "ollamas"] {
        registry.register_family::<f32, _>(base, |ctx, uri| {
            Ok(Arc::new(OllamaEmbedder::from_uri(ctx, uri)?) as Arc<dyn Embedder<f32>>)
        })?;
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct OllamaEmbedder {
    http: HttpClient,
    url: Url,
    model: String,
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    embeddings: Vec<Vec<f32>>,
}

impl OllamaEmbedder {
    pub fn from_uri(ctx: &BackendContext, uri: &Url) -> Result<Self, EmbeddingError> {
        let model = query_param(uri, "model").ok_or_else(|| EmbeddingError::MissingParameter {
            scheme: uri.scheme().to_string(),
            param: "model".into(),
        })?;

        let scheme = if uri.scheme().starts_with("ollamas") {
            "https"
        } else {
            "http"
        };
        let authority = match uri.host_str().filter(|h| !h.is_empty()) {
            Some(host) => match uri.port() {
                Some(port) => format!("{host}:{port}"),
                None => host.to_string(),
            },
            None => DEFAULT_OLLAMA_HOST.to_string(),
        };
        let base = Url::parse(&format!("{scheme}://{authority}")).map_err(|e| {
            EmbeddingError::InvalidUri {
                uri: uri.to_string(),
                reason: e.to_string(),
            }
        })?;

        Ok(Self {
            http: HttpClient::new("ollama", ctx)?,
            url: endpoint(&base, "/api/embed"),
            model,
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

#[async_trait]
impl Embedder<f32> for OllamaEmbedder {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn text_embeddings(
        &self,
        req: &EmbeddingRequest,
    ) -> Result<EmbeddingResponse<f32>, EmbeddingError> {
        let model = req.model().unwrap_or(&self.model);
        let text = req.text();
        let rsp: EmbedResponse = self
            .http
            .post_json(
                &self.url,
                &EmbedRequest {
                    model,
                    input: &text,
                },
            )
            .await?;

        let vector = rsp.embeddings.into_iter().next().ok_or_else(|| {
            EmbeddingError::BackendProtocol("ollama response carried no embeddings".into())
        })?;
        let label = rsp.model.unwrap_or_else(|| model.to_string());
        EmbeddingResponse::new(req.id().map(str::to_string), label, vector)
    }

    async fn image_embeddings(
        &self,
        _req: &EmbeddingRequest,
    ) -> Result<EmbeddingResponse<f32>, EmbeddingError> {
        Err(EmbeddingError::not_implemented("ollama", Modality::Image))
    }
}
