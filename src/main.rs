// osintgate - Authenticated HTTP gateway for OSINT command-line tools
// Main entry point

use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};

use osintgate::config::load_config;
use osintgate::server::GatewayServer;
use osintgate::tools::ToolKind;
use tracing_subscriber::prelude::*;

#[derive(Parser, Debug)]
#[command(name = "osintgate")]
#[command(about = "HTTP gateway for OSINT reconnaissance tools", version)]
struct Args {
    /// TOML config file (environment variables still override it)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the listening port
    #[arg(long)]
    port: Option<u16>,

    /// Append logs to this file instead of stderr
    #[arg(long = "log-file")]
    log_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_tracing(args.log_file.as_deref())?;

    let mut config = load_config(args.config.as_deref())?;
    if let Some(port) = args.port {
        config.port = port;
    }

    if config.uses_default_api_key() {
        tracing::warn!("API_KEY is not set, using the built-in default key");
    }
    for kind in ToolKind::ALL {
        let path = config.tool_path(kind);
        tracing::info!(
            tool = %kind,
            path = %path.display(),
            present = path.exists(),
            "Tool installation"
        );
    }

    GatewayServer::from_config(config).await?.serve().await
}

fn init_tracing(log_file: Option<&Path>) -> Result<()> {
    // Default: INFO level, overridable with RUST_LOG
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    match log_file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file: {}", path.display()))?;

            let file_layer = tracing_subscriber::fmt::layer()
                .with_writer(std::sync::Mutex::new(file))
                .with_ansi(false); // No ANSI colors in log file

            tracing_subscriber::registry()
                .with(env_filter)
                .with(file_layer)
                .init();
        }
        None => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }

    // Bridge log crate → tracing (for dependencies using log crate)
    tracing_log::LogTracer::init().ok();
    Ok(())
}
