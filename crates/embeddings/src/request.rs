use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// Input to a single embedding call: raw bytes plus optional id and model hint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbeddingRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    model: Option<String>,
    body: Bytes,
}

impl EmbeddingRequest {
    pub fn new(body: impl Into<Bytes>) -> Self {
        Self {
            id: None,
            model: None,
            body: body.into(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Overrides the model configured on the backend for this call.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn model(&self) -> Option<&str> {
        self.model.as_deref()
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Body decoded as UTF-8, replacing invalid sequences.
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_sets_fields() {
        let req = EmbeddingRequest::new("Hello world")
            .with_id("doc-1")
            .with_model("embeddinggemma");
        assert_eq!(req.id(), Some("doc-1"));
        assert_eq!(req.model(), Some("embeddinggemma"));
        assert_eq!(req.text(), "Hello world");
        assert_eq!(req.body().len(), 11);
    }

    #[test]
    fn text_is_lossy_for_binary_bodies() {
        let req = EmbeddingRequest::new(vec![0x66, 0x6f, 0xff, 0x6f]);
        assert_eq!(req.text(), "fo\u{fffd}o");
        assert!(req.id().is_none());
        assert!(req.model().is_none());
    }
}
