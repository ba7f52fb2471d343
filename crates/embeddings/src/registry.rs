//! Scheme-keyed backend registry.
//!
//! A [`Registry<T>`] maps lower-cased URI schemes to constructors producing
//! `Embedder<T>` instances. The composition root owns one registry per storage
//! precision; nothing here is process-global.
//!
//! ```
//! use embeddings::{BackendContext, EmbeddingRequest, Registry};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let registry = Registry::<f32>::with_builtin(BackendContext::default());
//! let embedder = registry.resolve("stub32://?dimensions=8").unwrap();
//! let rsp = embedder
//!     .text_embeddings(&EmbeddingRequest::new("Hello world"))
//!     .await
//!     .unwrap();
//! assert_eq!(rsp.dimensions(), 8);
//! # }
//! ```
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::fmt;
use std::marker::PhantomData;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, warn};
use url::Url;

use crate::embedder::{BackendContext, Embedder};
use crate::precision::Float;
use crate::request::EmbeddingRequest;
use crate::response::EmbeddingResponse;
use crate::EmbeddingError;

/// Builds a backend from the shared context and the full configuration URI.
pub type Constructor<T> = dyn Fn(&BackendContext, &Url) -> Result<Arc<dyn Embedder<T>>, EmbeddingError>
    + Send
    + Sync;

pub struct Registry<T: Float> {
    context: BackendContext,
    constructors: DashMap<String, Arc<Constructor<T>>>,
}

impl<T: Float> Registry<T> {
    pub fn new(context: BackendContext) -> Self {
        Self {
            context,
            constructors: DashMap::new(),
        }
    }

    /// A registry with the deterministic `null` and `stub` families installed.
    pub fn with_builtin(context: BackendContext) -> Self {
        let registry = Self::new(context);
        // A fresh map cannot hold duplicates.
        let _ = crate::null::register(&registry);
        let _ = crate::stub::register(&registry);
        registry
    }

    pub fn context(&self) -> &BackendContext {
        &self.context
    }

    /// Installs `ctor` under `scheme` (case-insensitive). A second registration
    /// of the same scheme fails and leaves the first in place.
    pub fn register<F>(&self, scheme: &str, ctor: F) -> Result<(), EmbeddingError>
    where
        F: Fn(&BackendContext, &Url) -> Result<Arc<dyn Embedder<T>>, EmbeddingError>
            + Send
            + Sync
            + 'static,
    {
        self.insert(scheme, Arc::new(ctor))
    }

    /// Registers a backend whose native precision is `N` under two schemes:
    /// `base` and `base` suffixed with this registry's bit width (`null32`,
    /// `ollama64`, ...). Responses are converted from `N` to `T` with the
    /// native precision kept as presentation hint.
    ///
    /// All or nothing: if either scheme is taken, neither is registered.
    pub fn register_family<N, F>(&self, base: &str, ctor: F) -> Result<(), EmbeddingError>
    where
        N: Float,
        F: Fn(&BackendContext, &Url) -> Result<Arc<dyn Embedder<N>>, EmbeddingError>
            + Send
            + Sync
            + 'static,
    {
        let adapted: Arc<Constructor<T>> = Arc::new(move |ctx: &BackendContext, uri: &Url| {
            let inner = ctor(ctx, uri)?;
            Ok(Arc::new(Converting::<N, T>::new(inner)) as Arc<dyn Embedder<T>>)
        });

        let Some(bits) = T::PRECISION.bits() else {
            return self.insert(base, adapted);
        };
        let suffixed = format!("{base}{bits}").to_ascii_lowercase();
        if self.contains(&suffixed) {
            warn!(scheme = %suffixed, "rejected duplicate embedder registration");
            return Err(EmbeddingError::DuplicateScheme(suffixed));
        }

        self.insert(base, adapted.clone())?;
        if let Err(err) = self.insert(&suffixed, adapted.clone()) {
            // Lost a race for the suffixed scheme; take back our bare entry.
            self.constructors
                .remove_if(&base.to_ascii_lowercase(), |_, ctor| Arc::ptr_eq(ctor, &adapted));
            return Err(err);
        }
        Ok(())
    }

    fn insert(&self, scheme: &str, ctor: Arc<Constructor<T>>) -> Result<(), EmbeddingError> {
        let scheme = scheme.to_ascii_lowercase();
        match self.constructors.entry(scheme.clone()) {
            Entry::Occupied(_) => {
                warn!(scheme = %scheme, "rejected duplicate embedder registration");
                Err(EmbeddingError::DuplicateScheme(scheme))
            }
            Entry::Vacant(slot) => {
                slot.insert(ctor);
                debug!(scheme = %scheme, precision = %T::PRECISION, "registered embedder");
                Ok(())
            }
        }
    }

    pub fn contains(&self, scheme: &str) -> bool {
        self.constructors.contains_key(&scheme.to_ascii_lowercase())
    }

    /// Builds the backend selected by the scheme of `uri`.
    ///
    /// Configuration errors raised by the constructor are passed through;
    /// any other constructor failure becomes [`EmbeddingError::Initialization`].
    pub fn resolve(&self, uri: &str) -> Result<Arc<dyn Embedder<T>>, EmbeddingError> {
        let parsed = Url::parse(uri).map_err(|e| EmbeddingError::InvalidUri {
            uri: uri.to_string(),
            reason: e.to_string(),
        })?;
        let scheme = parsed.scheme().to_ascii_lowercase();

        // Clone out of the map so the shard lock is not held while constructing.
        let ctor = self
            .constructors
            .get(&scheme)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| EmbeddingError::UnknownScheme(scheme.clone()))?;

        match ctor(&self.context, &parsed) {
            Ok(embedder) => {
                debug!(scheme = %scheme, backend = embedder.name(), "resolved embedder");
                Ok(embedder)
            }
            Err(err) if err.is_configuration() => Err(err),
            Err(err @ EmbeddingError::Initialization { .. }) => Err(err),
            Err(err) => Err(EmbeddingError::Initialization {
                scheme,
                reason: err.to_string(),
            }),
        }
    }

    /// Registered schemes in ascending order.
    pub fn list_schemes(&self) -> Vec<String> {
        let mut schemes: Vec<String> = self
            .constructors
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        schemes.sort();
        schemes
    }

    pub fn len(&self) -> usize {
        self.constructors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constructors.is_empty()
    }
}

impl<T: Float> fmt::Debug for Registry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("precision", &T::PRECISION)
            .field("schemes", &self.list_schemes())
            .finish()
    }
}

/// Wraps a backend of native precision `N` so it serves `T` responses.
struct Converting<N: Float, T: Float> {
    inner: Arc<dyn Embedder<N>>,
    _target: PhantomData<fn() -> T>,
}

impl<N: Float, T: Float> Converting<N, T> {
    fn new(inner: Arc<dyn Embedder<N>>) -> Self {
        Self {
            inner,
            _target: PhantomData,
        }
    }
}

#[async_trait]
impl<N: Float, T: Float> Embedder<T> for Converting<N, T> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn text_embeddings(
        &self,
        req: &EmbeddingRequest,
    ) -> Result<EmbeddingResponse<T>, EmbeddingError> {
        let rsp = self.inner.text_embeddings(req).await.map_err(|err| {
            warn!(backend = self.inner.name(), error = %err, "text embedding failed");
            err
        })?;
        Ok(rsp.convert())
    }

    async fn image_embeddings(
        &self,
        req: &EmbeddingRequest,
    ) -> Result<EmbeddingResponse<T>, EmbeddingError> {
        let rsp = self.inner.image_embeddings(req).await.map_err(|err| {
            warn!(backend = self.inner.name(), error = %err, "image embedding failed");
            err
        })?;
        Ok(rsp.convert())
    }
}

/// First value of query parameter `key`, if present and non-empty.
pub fn query_param(uri: &Url, key: &str) -> Option<String> {
    uri.query_pairs()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
        .filter(|v| !v.is_empty())
}

/// Parses query parameter `key`, reporting a malformed value as
/// [`EmbeddingError::InvalidParameter`].
pub fn parse_param<V>(uri: &Url, key: &str) -> Result<Option<V>, EmbeddingError>
where
    V: FromStr,
    V::Err: fmt::Display,
{
    query_param(uri, key)
        .map(|raw| {
            raw.parse::<V>().map_err(|e| EmbeddingError::InvalidParameter {
                param: key.to_string(),
                reason: format!("'{raw}': {e}"),
            })
        })
        .transpose()
}
