use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use ferrule_server::{build_app, config::load_config, observability};

#[derive(Debug, Parser)]
#[command(name = "ferrule-server", version, about = "OAuth 2.0 authorization server")]
struct Cli {
    /// Configuration file
    #[arg(short, long, env = "FERRULE_CONFIG", default_value = "ferrule.toml")]
    config: PathBuf,

    /// Override the configured listen host
    #[arg(long, env = "FERRULE_HOST")]
    host: Option<String>,

    /// Override the configured listen port
    #[arg(short, long, env = "FERRULE_PORT")]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = dotenvy::dotenv()
        && !e.not_found()
    {
        eprintln!("Warning: Failed to load .env file: {e}");
    }

    observability::init_tracing();

    // Parsed after .env so its values feed the env fallbacks.
    let cli = Cli::parse();

    let mut cfg = load_config(&cli.config)
        .with_context(|| format!("configuration error in {}", cli.config.display()))?;
    if let Some(host) = cli.host {
        cfg.server.host = host;
    }
    if let Some(port) = cli.port {
        cfg.server.port = port;
    }

    observability::apply_logging_level(&cfg.logging.level);
    tracing::info!(path = %cli.config.display(), "Configuration loaded");

    let app = build_app(&cfg)?;
    let addr: SocketAddr = cfg.addr()?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    tracing::info!(%addr, "Listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("Shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
}
