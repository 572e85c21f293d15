use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use ssecast_core::config::{ListenConfig, RelayConfig};
use tracing::{error, info, warn};

/// SSE publish/broadcast relay.
#[derive(Debug, Parser)]
#[command(name = "ssecast-gateway", version)]
struct Cli {
    /// Listen address as host:port (either half may be omitted).
    listen: Option<String>,

    /// Config file. Defaults to $SSECAST_CONFIG, then ./ssecast.toml.
    #[arg(long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ssecast_gateway=info,tower_http=info".into()),
        )
        .init();

    match run(Cli::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("startup failed: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config =
        RelayConfig::load(cli.config.as_deref()).context("failed to load configuration")?;
    if let Some(arg) = cli.listen.as_deref() {
        config.listen = ListenConfig::from_arg(arg).context("invalid listen address")?;
    }

    info!(
        version = env!("CARGO_PKG_VERSION"),
        listen = %config.listen.addr(),
        tls = config.tls.enabled,
        "ssecast gateway starting"
    );

    let handle = ssecast_gateway::server::start(config)
        .await
        .context("failed to start relay")?;

    tokio::select! {
        _ = handle.terminated() => info!("shutdown requested via /exit"),
        res = tokio::signal::ctrl_c() => {
            if let Err(e) = res {
                warn!(error = %e, "signal handler failed, stopping");
            } else {
                info!("interrupt received, stopping");
            }
        }
    }

    handle.stop().await;
    Ok(())
}
