//! The gateway's CLI entry point: loads a config snapshot, builds the
//! bridge state, and serves the HTTP ingress.

use anyhow::{Context, Result};
use clap::Parser;
use merco_gateway::config::{ConfigSource, FileConfigSource, Settings, StaticConfigSource};
use merco_gateway::metrics::TracingSink;
use merco_gateway::server::build_router;
use merco_gateway::BridgeState;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "merco-gatewayd", about = "Local LLM API gateway")]
struct Cli {
    /// Path to a TOML route/settings snapshot. Without it the gateway starts
    /// with an empty route table (every request 404s until configured).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Overrides the configured bind address, e.g. `0.0.0.0:9527`.
    #[arg(long)]
    bind: Option<String>,

    /// Overrides the configured log level (`trace`, `debug`, `info`, `warn`, `error`).
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let snapshot = match &cli.config {
        Some(path) => FileConfigSource { path: path.clone() }.load().with_context(|| format!("loading config from {path:?}"))?,
        None => StaticConfigSource(Default::default()).load().expect("static default source never fails"),
    };

    let mut settings = snapshot.settings;
    if let Some(level) = &cli.log_level {
        settings.log_level = level.clone();
    }
    merco_gateway::logging::init(&settings.log_level);

    if let Some(bind) = &cli.bind {
        let (host, port) = bind.rsplit_once(':').context("--bind must be host:port")?;
        settings.bind_host = host.to_string();
        settings.bind_port = port.parse().context("--bind port must be a number")?;
    }

    let bind_addr = settings.bind_addr();
    let state = Arc::new(BridgeState::new(snapshot.routes, settings, Arc::new(TracingSink)));

    tracing::info!(%bind_addr, "starting merco-gatewayd");
    let listener = tokio::net::TcpListener::bind(&bind_addr).await.with_context(|| format!("binding {bind_addr}"))?;
    axum::serve(listener, build_router(state)).await.context("server loop exited")?;
    Ok(())
}
