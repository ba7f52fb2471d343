//! embedhub command-line tool.
//!
//! Prints one JSON record per invocation on stdout; logs go to stderr.
//!
//! ```text
//! embedhub --client-uri "ollama://?model=embeddinggemma" text Hello world
//! embedhub --precision 64 --client-uri "llamafile://" image cat.jpg
//! echo "Hello world" | embedhub text -
//! embedhub schemes
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use embedhub::{EmbedHub, EmbedHubConfig, EmbeddingRequest, Modality};
use tokio::io::AsyncReadExt;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

/// Text and image embeddings from a URI-selected backend
#[derive(Parser)]
#[command(name = "embedhub")]
#[command(version)]
#[command(about = "Generate text and image embeddings with a URI-selected backend")]
struct Cli {
    /// YAML configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Backend URI, e.g. `null://` or `ollama://localhost:11434?model=embeddinggemma`
    #[arg(short = 'u', long, value_name = "URI")]
    client_uri: Option<String>,

    /// Storage precision of the returned vector (32 or 64)
    #[arg(short, long, value_name = "BITS")]
    precision: Option<u32>,

    /// Identifier echoed back in the record
    #[arg(long)]
    id: Option<String>,

    /// Model override for this call
    #[arg(short, long)]
    model: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Embed text given as words, a single file path, or `-` for stdin
    Text {
        #[arg(required = true, num_args = 1..)]
        input: Vec<String>,
    },
    /// Embed an image file (`-` for stdin)
    Image { path: String },
    /// List the backend schemes available at the chosen precision
    Schemes,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = EmbedHubConfig::load(cli.config.as_deref())
        .with_context(|| match &cli.config {
            Some(path) => format!("loading {}", path.display()),
            None => "loading configuration".to_string(),
        })?;
    if let Some(uri) = &cli.client_uri {
        config.client_uri = uri.clone();
    }
    if let Some(bits) = cli.precision {
        config.precision = bits;
    }
    config.validate().context("invalid command-line options")?;

    init_tracing(&config);

    let hub = EmbedHub::from_config(&config);
    let precision = config.storage_precision();

    let (modality, body) = match &cli.command {
        Command::Schemes => {
            for scheme in hub.schemes(precision)? {
                println!("{scheme}://");
            }
            return Ok(());
        }
        Command::Text { input } => (Modality::Text, read_text(input).await?),
        Command::Image { path } => (Modality::Image, read_source(path).await?),
    };

    let mut req = EmbeddingRequest::new(body);
    if let Some(id) = cli.id {
        req = req.with_id(id);
    }
    if let Some(model) = cli.model {
        req = req.with_model(model);
    }

    info!(uri = %config.client_uri, %precision, %modality, "embedding");
    let embedding = hub
        .embed(precision, &config.client_uri, modality, &req)
        .await
        .with_context(|| format!("{modality} embedding via {}", config.client_uri))?;
    debug!(dimensions = embedding.dimensions(), "embedding done");

    println!("{}", serde_json::to_string(&embedding)?);
    Ok(())
}

fn init_tracing(config: &EmbedHubConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if config.json_logs {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn read_text(input: &[String]) -> Result<Vec<u8>> {
    if let [single] = input {
        if single == "-" || Path::new(single).is_file() {
            return read_source(single).await;
        }
    }
    Ok(input.join(" ").into_bytes())
}

async fn read_source(source: &str) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    if source == "-" {
        tokio::io::stdin()
            .read_to_end(&mut buf)
            .await
            .context("reading stdin")?;
    } else {
        buf = tokio::fs::read(source)
            .await
            .with_context(|| format!("reading {source}"))?;
    }
    if buf.is_empty() {
        bail!("{source}: empty input");
    }
    Ok(buf)
}
