#![cfg(all(unix, feature = "mlxclip"))]

use embeddings::{BackendContext, EmbeddingRequest, ErrorKind, Registry};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;

/// Stands in for the Python script: `sh script.sh <mode> <input> <out.json>`.
/// The input and output arguments of the latest call are written to
/// `last-input` and `last-output`. Image calls branch on the file contents.
fn fake_script(dir: &Path) -> PathBuf {
    let script = dir.join("embeddings.sh");
    let body = format!(
        r#"mode="$1"
input="$2"
out="$3"
printf '%s' "$input" > "{input_record}"
printf '%s' "$out" > "{output_record}"
if [ "$mode" = image ]; then key=$(cat "$input"); else key="$input"; fi
case "$key" in
  fail) echo boom >&2; exit 3 ;;
  garbage) echo 'not json' > "$out" ;;
  slow) sleep 5 ;;
  *)
    if [ "$mode" = image ]; then
      n=$(wc -c < "$input"); printf '[%s, 1.0]' $n > "$out"
    else
      printf '[0.5, 0.5, 0.5, 0.5]' > "$out"
    fi
    ;;
esac
"#,
        input_record = dir.join("last-input").display(),
        output_record = dir.join("last-output").display(),
    );
    std::fs::write(&script, body).unwrap();
    script
}

/// Paths the script was handed on its latest run: (input, output).
fn last_call(dir: &Path) -> (PathBuf, PathBuf) {
    let read = |name: &str| PathBuf::from(std::fs::read_to_string(dir.join(name)).unwrap());
    (read("last-input"), read("last-output"))
}

fn setup(timeout: Duration) -> (TempDir, Registry<f64>, String) {
    let dir = tempfile::tempdir().unwrap();
    let script = fake_script(dir.path());
    let registry = Registry::with_builtin(BackendContext::default().with_timeout(timeout));
    backends::register_backends(&registry).unwrap();
    let uri = format!("mlxclip64://{}?python=/bin/sh", script.display());
    (dir, registry, uri)
}

#[tokio::test]
async fn text_runs_script_and_reads_vector() {
    let (_dir, registry, uri) = setup(Duration::from_secs(10));
    let embedder = registry.resolve(&uri).unwrap();
    let rsp = embedder
        .text_embeddings(&EmbeddingRequest::new("Hello world").with_id("t"))
        .await
        .unwrap();

    assert_eq!(rsp.embeddings(), &[0.5f64, 0.5, 0.5, 0.5]);
    assert_eq!(rsp.model(), "mlxclip");
    assert_eq!(rsp.id(), Some("t"));
    assert_eq!(rsp.precision().to_string(), "float64#as-float32");
}

#[tokio::test]
async fn image_goes_through_temp_file_that_is_removed() {
    let (dir, registry, uri) = setup(Duration::from_secs(10));
    let embedder = registry.resolve(&uri).unwrap();
    let rsp = embedder
        .image_embeddings(&EmbeddingRequest::new(vec![7u8; 12]))
        .await
        .unwrap();
    assert_eq!(rsp.embeddings(), &[12.0f64, 1.0]);

    let (staged, output) = last_call(dir.path());
    assert_eq!(staged.extension().unwrap(), "img");
    assert_eq!(output.extension().unwrap(), "json");
    assert!(!staged.exists());
    assert!(!output.exists());
}

#[tokio::test]
async fn image_temp_files_are_removed_on_failure() {
    for (body, kind) in [
        ("fail", ErrorKind::Transport),
        ("garbage", ErrorKind::BackendProtocol),
        ("slow", ErrorKind::Cancelled),
    ] {
        let (dir, registry, uri) = setup(Duration::from_secs(1));
        let err = registry
            .resolve(&uri)
            .unwrap()
            .image_embeddings(&EmbeddingRequest::new(body))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), kind, "{body}: {err}");

        let (staged, output) = last_call(dir.path());
        assert_eq!(staged.extension().unwrap(), "img", "{body}");
        assert!(!staged.exists(), "{body}: {} left behind", staged.display());
        assert!(!output.exists(), "{body}: {} left behind", output.display());
    }
}

#[tokio::test]
async fn text_output_file_is_removed_on_failure() {
    for (body, kind) in [
        ("fail", ErrorKind::Transport),
        ("garbage", ErrorKind::BackendProtocol),
    ] {
        let (dir, registry, uri) = setup(Duration::from_secs(10));
        let err = registry
            .resolve(&uri)
            .unwrap()
            .text_embeddings(&EmbeddingRequest::new(body))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), kind, "{body}: {err}");

        let (_, output) = last_call(dir.path());
        assert!(!output.exists(), "{body}: {} left behind", output.display());
    }
}

#[tokio::test]
async fn failing_script_reports_stderr() {
    let (dir, registry, uri) = setup(Duration::from_secs(10));
    let err = registry
        .resolve(&uri)
        .unwrap()
        .text_embeddings(&EmbeddingRequest::new("fail"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Transport);
    assert!(err.to_string().contains("boom"), "{err}");
    drop(dir);
}

#[tokio::test]
async fn garbage_output_is_protocol_error() {
    let (_dir, registry, uri) = setup(Duration::from_secs(10));
    let err = registry
        .resolve(&uri)
        .unwrap()
        .text_embeddings(&EmbeddingRequest::new("garbage"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BackendProtocol);
}

#[tokio::test]
async fn slow_script_is_cancelled() {
    let (_dir, registry, uri) = setup(Duration::from_millis(200));
    let err = registry
        .resolve(&uri)
        .unwrap()
        .text_embeddings(&EmbeddingRequest::new("slow"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Cancelled);
}

#[test]
fn missing_script_fails_resolve() {
    let registry = Registry::<f32>::with_builtin(BackendContext::default());
    backends::register_backends(&registry).unwrap();
    let err = registry.resolve("mlxclip:///no/such/script.py").err().unwrap();
    assert_eq!(err.kind(), ErrorKind::Initialization);
}
