use embeddings::{query_param, BackendContext, EmbeddingError};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Pooled JSON-over-HTTP client bounded by the context deadlines.
#[derive(Debug, Clone)]
pub(crate) struct HttpClient {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpClient {
    pub(crate) fn new(backend: &str, ctx: &BackendContext) -> Result<Self, EmbeddingError> {
        let client = reqwest::Client::builder()
            .timeout(ctx.timeout)
            .connect_timeout(ctx.connect_timeout)
            .pool_max_idle_per_host(32)
            .build()
            .map_err(|e| EmbeddingError::Initialization {
                scheme: backend.to_string(),
                reason: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self {
            client,
            timeout: ctx.timeout,
        })
    }

    /// POSTs `body` as JSON and decodes a JSON answer.
    ///
    /// A non-2xx status is a transport failure carrying the response body;
    /// a body that does not decode as `R` is a protocol failure.
    pub(crate) async fn post_json<B, R>(&self, url: &Url, body: &B) -> Result<R, EmbeddingError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        debug!(%url, "POST");
        let response = self
            .client
            .post(url.clone())
            .json(body)
            .send()
            .await
            .map_err(|e| self.request_error(url, e))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::Transport(format!(
                "HTTP {status} from {url}: {body}"
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| self.request_error(url, e))?;
        serde_json::from_slice(&bytes).map_err(|e| {
            EmbeddingError::BackendProtocol(format!("invalid JSON response from {url}: {e}"))
        })
    }

    fn request_error(&self, url: &Url, err: reqwest::Error) -> EmbeddingError {
        if err.is_timeout() {
            EmbeddingError::Cancelled(format!(
                "{url}: deadline of {:?} elapsed",
                self.timeout
            ))
        } else {
            EmbeddingError::Transport(format!("request to {url} failed: {err}"))
        }
    }
}

/// Base URL of the service behind a `?client-uri=` parameter.
///
/// Without the parameter `fallback` is used. A `tls=true` query parameter on
/// either the client URI or the configuration URI switches to https.
pub(crate) fn client_base(uri: &Url, fallback: &str) -> Result<Url, EmbeddingError> {
    let raw = query_param(uri, "client-uri").unwrap_or_else(|| fallback.to_string());
    let mut base = Url::parse(&raw).map_err(|e| EmbeddingError::InvalidParameter {
        param: "client-uri".into(),
        reason: format!("'{raw}': {e}"),
    })?;
    if !matches!(base.scheme(), "http" | "https") || base.host_str().is_none() {
        return Err(EmbeddingError::InvalidParameter {
            param: "client-uri".into(),
            reason: format!("'{raw}' is not an http(s) URL with a host"),
        });
    }

    let tls = match embeddings::parse_param::<bool>(&base, "tls")? {
        Some(tls) => Some(tls),
        None => embeddings::parse_param::<bool>(uri, "tls")?,
    };
    if tls == Some(true) && base.set_scheme("https").is_err() {
        return Err(EmbeddingError::InvalidParameter {
            param: "tls".into(),
            reason: format!("cannot switch '{raw}' to https"),
        });
    }

    base.set_query(None);
    base.set_fragment(None);
    Ok(base)
}

/// `base` with its path replaced.
pub(crate) fn endpoint(base: &Url, path: &str) -> Url {
    let mut url = base.clone();
    url.set_path(path);
    url
}

/// `{content}` or `{image_data: [{id, data}]}` as accepted by llama.cpp-style
/// servers.
#[cfg(any(feature = "llamafile", feature = "openclip"))]
#[derive(Debug, Serialize)]
pub(crate) struct ContentRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<&'a str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub image_data: Vec<ImageData>,
}

#[cfg(any(feature = "llamafile", feature = "openclip"))]
#[derive(Debug, Serialize)]
pub(crate) struct ImageData {
    pub id: i64,
    pub data: String,
}

#[cfg(any(feature = "llamafile", feature = "openclip"))]
impl<'a> ContentRequest<'a> {
    pub(crate) fn text(content: &'a str) -> Self {
        Self {
            content: Some(content),
            image_data: Vec::new(),
        }
    }

    pub(crate) fn image(body: &[u8]) -> Self {
        use base64::Engine as _;

        Self {
            content: None,
            image_data: vec![ImageData {
                id: 1,
                data: base64::engine::general_purpose::STANDARD.encode(body),
            }],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(uri: &str) -> Url {
        Url::parse(uri).unwrap()
    }

    #[test]
    fn client_base_defaults_and_overrides() {
        let base = client_base(&parse("llamafile://"), "http://localhost:8080").unwrap();
        assert_eq!(base.as_str(), "http://localhost:8080/");

        let base = client_base(
            &parse("llamafile://?client-uri=http://10.0.0.5:9000"),
            "http://localhost:8080",
        )
        .unwrap();
        assert_eq!(base.host_str(), Some("10.0.0.5"));
        assert_eq!(base.port(), Some(9000));
        assert_eq!(endpoint(&base, "/embedding").as_str(), "http://10.0.0.5:9000/embedding");
    }

    #[test]
    fn tls_switches_scheme() {
        let base = client_base(
            &parse("openclip://?client-uri=http%3A%2F%2Fclip.local%3A5000%3Ftls%3Dtrue"),
            "http://127.0.0.1:5000",
        )
        .unwrap();
        assert_eq!(base.scheme(), "https");
        assert_eq!(base.query(), None);

        let base = client_base(&parse("openclip://?tls=true"), "http://127.0.0.1:5000").unwrap();
        assert_eq!(base.scheme(), "https");
    }

    #[test]
    fn rejects_unusable_client_uri() {
        let err = client_base(&parse("llamafile://?client-uri=ftp://x"), "http://h").unwrap_err();
        assert!(err.is_configuration());

        let err = client_base(&parse("llamafile://?tls=maybe"), "http://h").unwrap_err();
        assert!(matches!(err, EmbeddingError::InvalidParameter { .. }));
    }
}
