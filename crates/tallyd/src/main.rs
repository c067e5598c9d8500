//! tallyd: the tally daemon.
//!
//! Loads a `tally.toml`, registers the daemon's own process metrics, and
//! exports them to the configured sink on every reporting interval until
//! interrupted.
//!
//! # Usage
//!
//! ```text
//! tallyd run --config /etc/tally/tally.toml
//! tallyd check --config /etc/tally/tally.toml
//! ```

mod self_metrics;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::sync::watch;
use tracing::info;

use tally_core::{SinkConfig, TallyConfig};
use tally_registry::Registry;
use tally_reporter::{HttpSink, LogSink, MetricSink, Reporter};

#[derive(Parser)]
#[command(name = "tallyd", about = "tally metrics exporter daemon")]
struct Cli {
    /// Emit logs as JSON.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Export metrics until interrupted.
    Run {
        /// Path to tally.toml.
        #[arg(long, short, default_value = "tally.toml")]
        config: PathBuf,
    },
    /// Validate a config file and print the effective settings.
    Check {
        /// Path to tally.toml.
        #[arg(long, short, default_value = "tally.toml")]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.json);

    match cli.command {
        Command::Run { config } => run(load_config(&config)?).await,
        Command::Check { config } => {
            let config = load_config(&config)?;
            print!("{}", config.to_toml_string()?);
            Ok(())
        }
    }
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,tallyd=debug,tally=debug"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn load_config(path: &Path) -> anyhow::Result<TallyConfig> {
    let config = TallyConfig::from_file(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    config
        .validate()
        .with_context(|| format!("invalid config {}", path.display()))?;
    Ok(config)
}

fn build_sink(config: &TallyConfig) -> anyhow::Result<Arc<dyn MetricSink>> {
    let sink: Arc<dyn MetricSink> = match &config.sink {
        SinkConfig::Log => Arc::new(LogSink),
        SinkConfig::Http { endpoint, path, .. } => {
            let timeout = config
                .sink
                .timeout()?
                .context("http sink has no timeout")?;
            Arc::new(HttpSink::new(endpoint.as_str(), path.as_str(), timeout))
        }
    };
    Ok(sink)
}

async fn run(config: TallyConfig) -> anyhow::Result<()> {
    info!(namespace = %config.namespace, "tallyd starting");

    let registry = Arc::new(Registry::new());
    let sink = build_sink(&config)?;
    let reporter = Reporter::new(registry.clone(), &config, sink)?;
    info!(interval_ms = reporter.interval().as_millis() as u64, "reporter initialized");

    // ── Shutdown signal ────────────────────────────────────────

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // ── Start background tasks ─────────────────────────────────

    let probe = self_metrics::SelfMetrics::register(&registry)?;
    let probe_shutdown = shutdown_rx.clone();
    let probe_handle = tokio::spawn(async move {
        probe.run(probe_shutdown).await;
    });

    let reporter_handle = tokio::spawn(async move {
        reporter.run(shutdown_rx).await;
    });

    tokio::signal::ctrl_c()
        .await
        .context("failed to install CTRL+C handler")?;
    info!("shutdown signal received");
    let _ = shutdown_tx.send(true);

    // Wait for background tasks.
    let _ = probe_handle.await;
    let _ = reporter_handle.await;

    info!("tallyd stopped");
    Ok(())
}
