//! bsync-server - Main entry point
//!
//! Hosts shared rooms: participants join over SSE, submit queue requests over
//! HTTP and receive every accepted change as a full queue snapshot.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use bsync_common::config::{CliOverrides, ConfigResolver, ControlPolicy, TomlConfig, ENV_CONFIG};
use bsync_server::api::{self, AppContext};
use bsync_server::RoomRegistry;
use clap::Parser;
use tokio::signal;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Command-line arguments for bsync-server
#[derive(Parser, Debug)]
#[command(name = "bsync-server")]
#[command(about = "Shared room queue server")]
#[command(version)]
struct Args {
    /// Path to a TOML config file
    #[arg(short, long, env = ENV_CONFIG)]
    config: Option<PathBuf>,

    /// Address to bind
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on
    #[arg(short, long)]
    port: Option<u16>,

    /// Who may reorder, add and delete: everyone | admin_only
    #[arg(long)]
    control_policy: Option<ControlPolicy>,
}

impl Args {
    fn overrides(&self) -> CliOverrides {
        CliOverrides {
            config_path: self.config.clone(),
            host: self.host.clone(),
            port: self.port,
            control_policy: self.control_policy,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = ConfigResolver::new("bsync-server")
        .resolve(&args.overrides())
        .context("Failed to resolve configuration")?;

    init_tracing(&config);

    info!(
        "Starting bsync-server v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    info!(
        "Control policy: {:?}, idle timeout: {}s",
        config.rooms.control_policy, config.rooms.idle_timeout_secs
    );

    let registry = Arc::new(RoomRegistry::from_config(&config.rooms));
    spawn_pruner(Arc::clone(&registry), config.rooms.idle_timeout());

    api::run(&config.server, AppContext::new(registry), shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// `RUST_LOG` wins; otherwise `[logging] level` applies to this workspace and the HTTP stack
fn init_tracing(config: &TomlConfig) {
    let level = &config.logging.level;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("bsync_server={level},bsync_common={level},tower_http={level}").into()
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Periodically forget rooms that closed on idle
fn spawn_pruner(registry: Arc<RoomRegistry>, every: Duration) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every.max(Duration::from_secs(1)));
        interval.tick().await;
        loop {
            interval.tick().await;
            let removed = registry.prune();
            if removed > 0 {
                debug!(removed, remaining = registry.len(), "Pruned closed rooms");
            }
        }
    });
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
