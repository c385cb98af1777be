//! seqtag-server binary: parse flags, pick the accelerator once, load the
//! model, serve.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use candle_core::Device;
use clap::Parser;
use tokio::sync::Mutex;
use tracing::info;

use seqtag_server::{PredictionHandler, router};

#[derive(Debug, Parser)]
#[command(name = "seqtag-server", about = "Serve a sequence-tagging model over HTTP")]
struct Args {
    /// Directory holding meta.json, model.json and model.safetensors.
    #[arg(long)]
    model_dir: PathBuf,

    /// Sentence-length cutoff for the request dataset.
    #[arg(long, default_value_t = 80)]
    padding: usize,

    /// Comma-separated token field names.
    #[arg(long, default_value = "value")]
    fieldnames: String,

    /// Address to bind.
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Port to bind.
    #[arg(long, default_value_t = 5000)]
    port: u16,

    /// Accelerator ordinal; falls back to CPU when unavailable.
    #[arg(long, default_value_t = 0)]
    device: usize,

    /// Language code for the blank tokenizer.
    #[arg(long, default_value = "pl")]
    language: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    // Device selection is process-wide and happens exactly once, before any
    // model graph is constructed.
    let device = Device::cuda_if_available(args.device)?;

    let fieldnames: Vec<String> = args
        .fieldnames
        .split(',')
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .collect();

    let handler = PredictionHandler::from_model_dir(
        &args.model_dir,
        fieldnames,
        args.padding,
        &args.language,
        device,
    )
    .with_context(|| format!("loading model from {}", args.model_dir.display()))?;

    let app = router(Arc::new(Mutex::new(handler)));
    let addr = format!("{}:{}", args.host, args.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!("listening on {addr}");

    axum::serve(listener, app).await?;
    Ok(())
}
