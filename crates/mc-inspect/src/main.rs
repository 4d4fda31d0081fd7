//! mc-inspect entry point.
//!
//! Listens for game clients, decodes what they send during the handshake,
//! status, and login phases, and logs one line per decoded packet.  Nothing is
//! ever sent back, so clients eventually time out on their own.
//!
//! # Usage
//!
//! ```text
//! mc-inspect [OPTIONS] [CONFIG]
//!
//! Arguments:
//!   [CONFIG]  TOML config file [default: mc-inspect.toml]
//!
//! Options:
//!   --bind <ADDR>  Override `network.bind_address`
//!   --port <PORT>  Override `network.port`
//! ```
//!
//! A missing config file is not an error; built-in defaults are used.  The
//! log level comes from `RUST_LOG` when set, otherwise from
//! `inspector.log_level`.

use std::path::PathBuf;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use mc_inspect::config::{load_config, InspectConfig, DEFAULT_CONFIG_FILE};
use mc_inspect::connection::serve;

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Serverbound packet inspector.
#[derive(Debug, Parser)]
#[command(
    name = "mc-inspect",
    about = "Decodes and logs serverbound handshake, status, and login packets",
    version
)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(default_value = DEFAULT_CONFIG_FILE, env = "MC_INSPECT_CONFIG")]
    config: PathBuf,

    /// IP address to listen on, overriding the config file.
    #[arg(long)]
    bind: Option<String>,

    /// TCP port to listen on, overriding the config file.
    #[arg(long)]
    port: Option<u16>,
}

impl Cli {
    /// Loads the config file and applies the command-line overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be read or
    /// parsed.
    fn into_config(self) -> anyhow::Result<InspectConfig> {
        let mut config = load_config(&self.config)
            .with_context(|| format!("failed to load {}", self.config.display()))?;

        if let Some(bind) = self.bind {
            config.network.bind_address = bind;
        }
        if let Some(port) = self.port {
            config.network.port = port;
        }
        Ok(config)
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config_path = cli.config.clone();
    let config = cli.into_config()?;

    // Logging starts after the config is loaded, since the config names the
    // fallback level.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.inspector.log_level)),
        )
        .init();

    info!("mc-inspect starting with config {}", config_path.display());

    let running = Arc::new(AtomicBool::new(true));
    let running_clone = Arc::clone(&running);

    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("received Ctrl+C, shutting down");
                running_clone.store(false, Ordering::Relaxed);
            }
            Err(e) => tracing::error!("failed to listen for Ctrl+C signal: {e}"),
        }
    });

    serve(config, running).await?;

    info!("mc-inspect stopped");
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
