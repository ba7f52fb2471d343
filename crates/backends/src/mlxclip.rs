//! MLX CLIP through a local Python script.
//!
//! `mlxclip:///path/to/embeddings.py` runs
//! `python3 <script> text|image <input> <output.json>` once per call and reads
//! a JSON float array back. Image bodies and the output file are temp files
//! that are removed when the call ends, whatever the outcome. `?python=`
//! overrides the interpreter.
use async_trait::async_trait;
use embeddings::{
    query_param, BackendContext, Embedder, EmbeddingError, EmbeddingRequest, EmbeddingResponse,
    Float, Registry,
};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tempfile::NamedTempFile;
use tokio::process::Command;
use tracing::debug;
use url::Url;

pub fn register<T: Float>(registry: &Registry<T>) -> Result<(), EmbeddingError> {
    registry.register_family::<f32, _>("mlxclip", |ctx, uri| {
        Ok(Arc::new(MlxClipEmbedder::from_uri(ctx, uri)?) as Arc<dyn Embedder<f32>>)
    })
}

#[derive(Debug, Clone)]
pub struct MlxClipEmbedder {
    script: PathBuf,
    python: String,
    timeout: Duration,
    model: String,
}

impl MlxClipEmbedder {
    pub fn from_uri(ctx: &BackendContext, uri: &Url) -> Result<Self, EmbeddingError> {
        let path = uri.path();
        if path.is_empty() || path == "/" {
            return Err(EmbeddingError::MissingParameter {
                scheme: uri.scheme().to_string(),
                param: "script path".into(),
            });
        }
        let script = PathBuf::from(path);
        std::fs::metadata(&script).map_err(|e| EmbeddingError::Initialization {
            scheme: uri.scheme().to_string(),
            reason: format!("cannot read {}: {e}", script.display()),
        })?;

        Ok(Self {
            script,
            python: query_param(uri, "python").unwrap_or_else(|| ctx.python.clone()),
            timeout: ctx.timeout,
            model: query_param(uri, "model").unwrap_or_else(|| "mlxclip".to_string()),
        })
    }

    pub fn script(&self) -> &Path {
        &self.script
    }

    async fn run(
        &self,
        req: &EmbeddingRequest,
        target: &str,
        input: &OsStr,
    ) -> Result<EmbeddingResponse<f32>, EmbeddingError> {
        let output = scratch_file(".json")?;

        let mut cmd = Command::new(&self.python);
        cmd.arg(&self.script)
            .arg(target)
            .arg(input)
            .arg(output.path())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        debug!(script = %self.script.display(), mode = target, "running embeddings script");

        let finished = tokio::time::timeout(self.timeout, cmd.output())
            .await
            .map_err(|_| {
                EmbeddingError::Cancelled(format!(
                    "{} did not finish within {:?}",
                    self.script.display(),
                    self.timeout
                ))
            })?
            .map_err(|e| {
                EmbeddingError::Transport(format!("failed to start {}: {e}", self.python))
            })?;

        if !finished.status.success() {
            let stderr = String::from_utf8_lossy(&finished.stderr);
            return Err(EmbeddingError::Transport(format!(
                "{} exited with {}: {}",
                self.script.display(),
                finished.status,
                stderr.trim()
            )));
        }

        let raw = tokio::fs::read(output.path()).await.map_err(|e| {
            EmbeddingError::Transport(format!("cannot read script output: {e}"))
        })?;
        let vector: Vec<f32> = serde_json::from_slice(&raw).map_err(|e| {
            EmbeddingError::BackendProtocol(format!(
                "{} wrote undecodable output: {e}",
                self.script.display()
            ))
        })?;

        let model = req.model().unwrap_or(&self.model);
        EmbeddingResponse::new(req.id().map(str::to_string), model, vector)
    }
}

fn scratch_file(suffix: &str) -> Result<NamedTempFile, EmbeddingError> {
    tempfile::Builder::new()
        .prefix("mlxclip.")
        .suffix(suffix)
        .tempfile()
        .map_err(|e| EmbeddingError::Transport(format!("cannot create temp file: {e}")))
}

#[async_trait]
impl Embedder<f32> for MlxClipEmbedder {
    fn name(&self) -> &str {
        "mlxclip"
    }

    async fn text_embeddings(
        &self,
        req: &EmbeddingRequest,
    ) -> Result<EmbeddingResponse<f32>, EmbeddingError> {
        let text = req.text();
        self.run(req, "text", OsStr::new(&*text)).await
    }

    async fn image_embeddings(
        &self,
        req: &EmbeddingRequest,
    ) -> Result<EmbeddingResponse<f32>, EmbeddingError> {
        let image = scratch_file(".img")?;
        tokio::fs::write(image.path(), req.body())
            .await
            .map_err(|e| EmbeddingError::Transport(format!("cannot stage image: {e}")))?;
        self.run(req, "image", image.path().as_os_str()).await
    }
}
