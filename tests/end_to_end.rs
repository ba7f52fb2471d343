use embedhub::{
    EmbedHub, EmbedHubConfig, Embedding, EmbeddingRequest, ErrorKind, Modality, Precision,
};
use serde_json::Value;
use std::io::Write;
use tempfile::NamedTempFile;

#[tokio::test]
async fn hello_world_at_both_precisions() {
    let hub = EmbedHub::default();
    let req = EmbeddingRequest::new("Hello world").with_id("hello");

    let narrow = hub
        .resolve32("stub32://")
        .unwrap()
        .text_embeddings(&req)
        .await
        .unwrap();
    assert!(narrow.dimensions() > 0);
    assert_eq!(narrow.precision().to_string(), "float32");
    assert_eq!(narrow.id(), Some("hello"));

    let wide = hub
        .resolve64("stub64://")
        .unwrap()
        .text_embeddings(&req)
        .await
        .unwrap();
    assert_eq!(wide.dimensions(), narrow.dimensions());
    assert_eq!(wide.precision().storage(), Precision::Float64);
    for (a, b) in narrow.embeddings().iter().zip(wide.embeddings()) {
        assert_eq!(*a as f64, *b);
    }
}

#[tokio::test]
async fn record_json_shape() {
    let hub = EmbedHub::default();
    let embedding = hub
        .embed(
            Precision::Float64,
            "stub://?dimensions=8&model=tiny",
            Modality::Text,
            &EmbeddingRequest::new("Hello world").with_id("r-1"),
        )
        .await
        .unwrap();

    let json: Value = serde_json::to_value(&embedding).unwrap();
    assert_eq!(json["id"], "r-1");
    assert_eq!(json["dimensions"], 8);
    assert_eq!(json["embeddings"].as_array().unwrap().len(), 8);
    assert_eq!(json["model"], "tiny");
    assert_eq!(json["precision"], "float64#as-float32");
    assert!(json["created"].as_i64().unwrap() > 0);
}

#[tokio::test]
async fn null_record_has_no_vector() {
    let hub = EmbedHub::default();
    let embedding = hub
        .embed(
            Precision::Float32,
            "null32://",
            Modality::Image,
            &EmbeddingRequest::new(vec![1u8, 2, 3]),
        )
        .await
        .unwrap();
    assert!(matches!(embedding, Embedding::Float32(_)));

    let json: Value = serde_json::to_value(&embedding).unwrap();
    assert_eq!(json["dimensions"], 0);
    assert_eq!(json["precision"], "null");
    assert_eq!(json["model"], "null");
    assert!(json.get("id").is_none());
}

#[tokio::test]
async fn config_file_drives_the_hub() {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(
        b"version: \"1.0\"\nclient_uri: \"stub://?dimensions=32\"\nprecision: 64\ntimeout_secs: 3\n",
    )
    .unwrap();

    let config = EmbedHubConfig::from_file(file.path()).unwrap();
    let hub = EmbedHub::from_config(&config);
    assert_eq!(hub.context().timeout.as_secs(), 3);

    let embedding = hub
        .embed(
            config.storage_precision(),
            &config.client_uri,
            Modality::Text,
            &EmbeddingRequest::new("Hello world"),
        )
        .await
        .unwrap();
    assert!(matches!(embedding, Embedding::Float64(_)));
    assert_eq!(embedding.dimensions(), 32);
}

#[tokio::test]
async fn unknown_scheme_is_configuration_error() {
    let hub = EmbedHub::default();
    let err = hub
        .embed(
            Precision::Float32,
            "word2vec://localhost",
            Modality::Text,
            &EmbeddingRequest::new("x"),
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Configuration);
}

#[test]
fn scheme_listing_is_sorted_and_precision_specific() {
    let hub = EmbedHub::default();
    let schemes = hub.schemes(Precision::Float64).unwrap();
    let mut sorted = schemes.clone();
    sorted.sort();
    assert_eq!(schemes, sorted);
    assert!(schemes.iter().any(|s| s == "stub64"));
    assert!(!schemes.iter().any(|s| s == "stub32"));
}
