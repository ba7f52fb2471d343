use serde::Serialize;

use crate::precision::{convert_slice, Float, PrecisionTag};
use crate::EmbeddingError;

/// Model label reported by the no-op backend.
pub const NULL_MODEL: &str = "null";

/// One embedding vector stored at precision `T`, plus provenance.
///
/// The dimension is never stored; [`dimensions`](Self::dimensions) is always the
/// length of the held vector. Fields are private so the vector and its tag
/// cannot drift apart after construction.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingResponse<T: Float> {
    id: Option<String>,
    model: String,
    created: i64,
    precision: PrecisionTag,
    embeddings: Vec<T>,
}

impl<T: Float> EmbeddingResponse<T> {
    /// Wraps a vector produced natively at `T`.
    ///
    /// Fails with [`EmbeddingError::EmptyEmbedding`] for a zero-length vector;
    /// only [`EmbeddingResponse::null`] may be empty.
    pub fn new(
        id: Option<String>,
        model: impl Into<String>,
        embeddings: Vec<T>,
    ) -> Result<Self, EmbeddingError> {
        let model = model.into();
        if embeddings.is_empty() {
            return Err(EmbeddingError::EmptyEmbedding { model });
        }
        Ok(Self {
            id,
            model,
            created: now_unix(),
            precision: PrecisionTag::native(T::PRECISION),
            embeddings,
        })
    }

    /// Wraps a vector produced at precision `N`, converting it to `T`.
    /// The tag keeps `N` as the presentation hint when the two differ.
    pub fn from_native<N: Float>(
        id: Option<String>,
        model: impl Into<String>,
        values: &[N],
    ) -> Result<Self, EmbeddingError> {
        let mut rsp = Self::new(id, model, convert_slice::<N, T>(values))?;
        rsp.precision = PrecisionTag::new(T::PRECISION, Some(N::PRECISION));
        Ok(rsp)
    }

    /// The zero-length response of the no-op backend.
    pub fn null(id: Option<String>) -> Self {
        Self {
            id,
            model: NULL_MODEL.to_string(),
            created: now_unix(),
            precision: PrecisionTag::null(),
            embeddings: Vec::new(),
        }
    }

    /// Overrides the generation timestamp (Unix seconds).
    pub fn with_created(mut self, created: i64) -> Self {
        self.created = created;
        self
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn created(&self) -> i64 {
        self.created
    }

    pub fn precision(&self) -> PrecisionTag {
        self.precision
    }

    pub fn embeddings(&self) -> &[T] {
        &self.embeddings
    }

    pub fn dimensions(&self) -> usize {
        self.embeddings.len()
    }

    pub fn into_embeddings(self) -> Vec<T> {
        self.embeddings
    }

    /// Re-stores the vector at precision `U`. The precision the values were
    /// originally produced at survives as the presentation hint.
    pub fn convert<U: Float>(&self) -> EmbeddingResponse<U> {
        let precision = if self.precision.is_null() {
            self.precision
        } else {
            let origin = self
                .precision
                .presentation()
                .unwrap_or(self.precision.storage());
            PrecisionTag::new(U::PRECISION, Some(origin))
        };
        EmbeddingResponse {
            id: self.id.clone(),
            model: self.model.clone(),
            created: self.created,
            precision,
            embeddings: convert_slice::<T, U>(&self.embeddings),
        }
    }

    /// Serializable output record.
    pub fn record(&self) -> EmbeddingRecord<'_, T> {
        EmbeddingRecord {
            id: self.id.as_deref(),
            embeddings: &self.embeddings,
            dimensions: self.dimensions(),
            model: &self.model,
            created: self.created,
            precision: self.precision,
        }
    }
}

/// `{id, embeddings, dimensions, model, created, precision}` as handed to
/// external consumers.
#[derive(Debug, Serialize)]
pub struct EmbeddingRecord<'a, T: Float> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<&'a str>,
    pub embeddings: &'a [T],
    pub dimensions: usize,
    pub model: &'a str,
    pub created: i64,
    pub precision: PrecisionTag,
}

fn now_unix() -> i64 {
    chrono::Utc::now().timestamp()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::precision::Precision;

    #[test]
    fn dimensions_follow_vector_length() {
        let rsp = EmbeddingResponse::new(Some("a".into()), "m", vec![0.5f32, 0.25, 0.125])
            .unwrap();
        assert_eq!(rsp.dimensions(), 3);
        assert_eq!(rsp.precision(), PrecisionTag::native(Precision::Float32));
        assert_eq!(rsp.id(), Some("a"));
        assert_eq!(rsp.model(), "m");
        assert!(rsp.created() > 0);
    }

    #[test]
    fn empty_vector_is_rejected() {
        let err = EmbeddingResponse::<f64>::new(None, "ollama", Vec::new()).unwrap_err();
        assert_eq!(
            err,
            EmbeddingError::EmptyEmbedding {
                model: "ollama".into()
            }
        );
        let err = EmbeddingResponse::<f64>::from_native::<f32>(None, "x", &[]).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::EmptyEmbedding);
    }

    #[test]
    fn null_response_is_empty_and_tagged() {
        let rsp = EmbeddingResponse::<f32>::null(Some("n".into()));
        assert_eq!(rsp.dimensions(), 0);
        assert_eq!(rsp.model(), NULL_MODEL);
        assert!(rsp.precision().is_null());

        let wide = rsp.convert::<f64>();
        assert_eq!(wide.dimensions(), 0);
        assert!(wide.precision().is_null());
    }

    #[test]
    fn from_native_records_presentation_hint() {
        let rsp = EmbeddingResponse::<f64>::from_native(None, "m", &[1.0f32, 0.5]).unwrap();
        assert_eq!(rsp.embeddings(), &[1.0f64, 0.5]);
        assert_eq!(rsp.precision().storage(), Precision::Float64);
        assert_eq!(rsp.precision().presentation(), Some(Precision::Float32));
        assert_eq!(rsp.precision().to_string(), "float64#as-float32");

        let same = EmbeddingResponse::<f32>::from_native(None, "m", &[1.0f32]).unwrap();
        assert_eq!(same.precision(), PrecisionTag::native(Precision::Float32));
    }

    #[test]
    fn convert_preserves_dimensions_and_origin() {
        let rsp = EmbeddingResponse::new(None, "m", vec![0.1f32, 0.2, 0.3, 0.4]).unwrap();
        let wide = rsp.convert::<f64>();
        assert_eq!(wide.dimensions(), rsp.dimensions());
        assert_eq!(wide.precision().to_string(), "float64#as-float32");

        let back = wide.convert::<f32>();
        assert_eq!(back.dimensions(), 4);
        assert_eq!(back.embeddings(), rsp.embeddings());
        assert_eq!(back.precision(), PrecisionTag::native(Precision::Float32));
        assert_eq!(back.created(), rsp.created());
    }

    #[test]
    fn record_serializes_expected_fields() {
        let rsp = EmbeddingResponse::new(Some("doc".into()), "stub", vec![1.0f64, 0.0])
            .unwrap()
            .with_created(1_700_000_000);
        let value = serde_json::to_value(rsp.record()).unwrap();
        assert_eq!(value["id"], "doc");
        assert_eq!(value["embeddings"], serde_json::json!([1.0, 0.0]));
        assert_eq!(value["dimensions"], 2);
        assert_eq!(value["model"], "stub");
        assert_eq!(value["created"], 1_700_000_000i64);
        assert_eq!(value["precision"], "float64");
    }

    #[test]
    fn record_omits_missing_id() {
        let rsp = EmbeddingResponse::<f32>::null(None);
        let value = serde_json::to_value(rsp.record()).unwrap();
        assert!(value.get("id").is_none());
        assert_eq!(value["precision"], "null");
        assert_eq!(value["dimensions"], 0);
    }
}
