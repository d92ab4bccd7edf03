//! onload host entry point.
//!
//! Stand-in for an embedding host: reads load requests as JSON lines on stdin
//! and writes one JSON response line per request to stdout as each completes.
//! Logging goes to stderr to keep stdout to the response stream.

use anyhow::Result;
use onload_core::AppConfig;
use tokio::io::BufReader;
use tracing_subscriber::EnvFilter;

mod error;
mod handler;
mod serve;
mod wire;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    let runtime = onload_loader::init(&config)?;

    tracing::info!("Starting onload host on stdio");

    serve::serve(runtime.interceptor(), BufReader::new(tokio::io::stdin()), tokio::io::stdout()).await?;

    tracing::info!("stdin closed; shutting down");

    Ok(())
}
