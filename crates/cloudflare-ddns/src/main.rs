// # cloudflare-ddns - Dynamic DNS Daemon
//
// Keeps Cloudflare A records pointed at the host's current public IPv4
// address.
//
// This binary is a THIN integration layer. Reconciliation logic lives in
// `cfddns-core`; this file only:
// 1. Parses the command line and initializes logging
// 2. Loads and validates the YAML configuration
// 3. Builds the Cloudflare gateway and checks the token can list zones
// 4. Starts the readiness probe
// 5. Runs the engine until SIGTERM/SIGINT
//
// ## Configuration
//
// Without `--config`, the first `config.yaml` or `config.yml` found in
// `/etc/cloudflare-ddns/`, `$HOME/.cloudflare-ddns/` or the working
// directory is used. `CLOUDFLARE_DDNS_API_TOKEN` overrides `api_token`.
//
// ## Example
//
// ```bash
// export CLOUDFLARE_DDNS_API_TOKEN=your_token
// cloudflare-ddns --config /etc/cloudflare-ddns/config.yaml --log-level debug
// ```

mod health;

use anyhow::{Context, Result};
use cfddns_core::{DdnsConfig, DdnsEngine, DnsGateway, EngineEvent};
use cfddns_ip_trace::{PUBLIC_IP_PAGE, TraceIpSource};
use cfddns_provider_cloudflare::{CLOUDFLARE_API_BASE, CloudflareGateway};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy)]
enum DdnsExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
}

impl From<DdnsExitCode> for ExitCode {
    fn from(code: DdnsExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Keep Cloudflare DNS A records in sync with this host's public IP
#[derive(Debug, Parser)]
#[command(name = "cloudflare-ddns", version, about)]
struct Args {
    /// Path to the configuration file (skips the search path)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level used when RUST_LOG is not set
    #[arg(long, default_value = "info", value_name = "LEVEL")]
    log_level: String,

    /// Read from Cloudflare but never modify records
    #[arg(long)]
    dry_run: bool,

    /// Run a single reconciliation cycle and exit
    #[arg(long)]
    once: bool,
}

/// Everything built during startup, ready to run
struct Daemon {
    engine: DdnsEngine,
    events: mpsc::Receiver<EngineEvent>,
}

fn main() -> ExitCode {
    let args = Args::parse();

    if let Err(e) = init_tracing(&args.log_level) {
        eprintln!("Failed to initialize logging: {e:#}");
        return DdnsExitCode::ConfigError.into();
    }

    info!("Starting cloudflare-ddns {}", env!("CARGO_PKG_VERSION"));

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return DdnsExitCode::RuntimeError.into();
        }
    };

    let result = rt.block_on(async {
        let daemon = match start(&args, CLOUDFLARE_API_BASE).await {
            Ok(daemon) => daemon,
            Err(e) => {
                error!("Startup failed: {:#}", e);
                return DdnsExitCode::ConfigError;
            }
        };

        match run(daemon, args.once).await {
            Ok(()) => DdnsExitCode::CleanShutdown,
            Err(e) => {
                error!("Daemon error: {:#}", e);
                DdnsExitCode::RuntimeError
            }
        }
    });

    result.into()
}

/// Initialize the global subscriber
///
/// `RUST_LOG` wins over `--log-level` when it is set.
fn init_tracing(log_level: &str) -> Result<()> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(log_level)
            .with_context(|| format!("Invalid log level '{log_level}'"))?,
    };

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to set tracing subscriber: {e}"))
}

/// Load configuration, build components and run the startup checks
///
/// `api_base` is the Cloudflare API root the gateway talks to. Every error
/// returned here is a startup failure.
async fn start(args: &Args, api_base: &str) -> Result<Daemon> {
    let (mut config, path) = match &args.config {
        Some(path) => (DdnsConfig::load(path)?, path.clone()),
        None => DdnsConfig::discover()?,
    };
    info!("Using configuration file {}", path.display());

    config.apply_env_overrides();
    config.validate()?;
    debug!(?config, "Configuration loaded");

    let request_timeout = config.request_timeout()?;

    let gateway = CloudflareGateway::from_config(&config, args.dry_run)
        .context("Cannot create Cloudflare client")?
        .with_base_url(api_base);

    let zones = gateway
        .list_zones()
        .await
        .context("Cannot list zones with the configured API token")?;
    info!("API token has access to {} zone(s)", zones.len());

    let resolver = TraceIpSource::with_url(PUBLIC_IP_PAGE, request_timeout)?;

    if config.health.enabled && !args.once {
        health::spawn(config.health.listen_addr, Arc::new(resolver.clone())).await?;
    }

    let (engine, events) = DdnsEngine::new(Box::new(resolver), Box::new(gateway), config)?;

    Ok(Daemon { engine, events })
}

/// Run the engine until a shutdown signal, or for one cycle with `once`
async fn run(daemon: Daemon, once: bool) -> Result<()> {
    let Daemon { engine, events } = daemon;
    tokio::spawn(log_events(events));

    if once {
        let report = engine.run_cycle().await;
        info!(
            "Single cycle finished: {} updated, {} unchanged, {} not found, {} failed zone(s), {} failed record(s)",
            report.records_updated,
            report.records_unchanged,
            report.records_not_found,
            report.zones_failed,
            report.records_failed
        );
        if report.has_failures() {
            anyhow::bail!("Reconciliation cycle finished with failures");
        }
        return Ok(());
    }

    let shutdown_rx = install_shutdown_handler()?;
    engine.run_with_shutdown(Some(shutdown_rx)).await?;

    info!("Shutting down daemon");
    Ok(())
}

/// Drain engine events so the channel never fills up
async fn log_events(mut events: mpsc::Receiver<EngineEvent>) {
    while let Some(event) = events.recv().await {
        debug!(?event, "Engine event");
    }
}

/// Listen for SIGTERM and SIGINT and fire the returned receiver on either
#[cfg(unix)]
fn install_shutdown_handler() -> Result<oneshot::Receiver<()>> {
    let mut sigterm =
        signal(SignalKind::terminate()).context("Failed to setup SIGTERM handler")?;
    let mut sigint = signal(SignalKind::interrupt()).context("Failed to setup SIGINT handler")?;

    let (tx, rx) = oneshot::channel();
    tokio::spawn(async move {
        let signal = tokio::select! {
            _ = sigterm.recv() => "SIGTERM",
            _ = sigint.recv() => "SIGINT",
        };
        info!("Received shutdown signal: {}", signal);
        let _ = tx.send(());
    });

    Ok(rx)
}

/// Listen for Ctrl-C
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
fn install_shutdown_handler() -> Result<oneshot::Receiver<()>> {
    let (tx, rx) = oneshot::channel();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Received shutdown signal: SIGINT");
                let _ = tx.send(());
            }
            Err(e) => {
                error!("Failed to wait for CTRL-C: {}", e);
                // Keep the sender alive so the engine is not stopped
                let _tx = tx;
                std::future::pending::<()>().await
            }
        }
    });
    Ok(rx)
}
