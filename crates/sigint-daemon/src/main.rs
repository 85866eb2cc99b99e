//! Sigint Wi-Fi collector - Main entry point
//!
//! Captures 802.11 frames from a monitor-mode interface (or a capture file),
//! attributes them to stations and stores the observations in SQLite.

mod collect;
mod config;

use anyhow::{Context, Result};
use clap::Parser;
use sigint_capture::iface::best_guess_wifi_iface;
use sigint_capture::{Collector, PcapSource};
use std::path::PathBuf;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "sigint-wifi")]
#[command(about = "Passive Wi-Fi station collector")]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "sigint.toml")]
    config: PathBuf,

    /// Monitor-mode interface to capture on
    #[arg(short, long)]
    interface: Option<String>,

    /// SQLite database file
    #[arg(short, long)]
    dbname: Option<PathBuf>,

    /// Replay a capture file instead of capturing live
    #[arg(long)]
    pcap_file: Option<PathBuf>,

    /// Stop after this many seconds (0 runs until interrupted)
    #[arg(short, long)]
    timeout: Option<u64>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Stay on the current channel
    #[arg(long)]
    no_hop: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("Sigint Wi-Fi v{}", env!("CARGO_PKG_VERSION"));

    let mut config = config::load_config(&args.config)?;

    if let Some(interface) = args.interface {
        config.capture.interface = interface;
    }
    if let Some(dbname) = args.dbname {
        config.store.path = dbname;
    }
    if let Some(timeout) = args.timeout {
        config.session.timeout_secs = timeout;
    }
    if args.no_hop || args.pcap_file.is_some() {
        config.capture.hop = false;
    }

    let ignore = config.ignore_list()?;
    let store_config = config.to_store_config();
    let mut capture_config = config.to_capture_config();

    let source = match &args.pcap_file {
        Some(path) => PcapSource::open_file(path)
            .with_context(|| format!("Failed to open capture file {}", path.display()))?,
        None => {
            if capture_config.interface.is_empty() {
                capture_config.interface =
                    best_guess_wifi_iface().context("No interface given and none could be guessed")?;
                info!(iface = %capture_config.interface, "Guessed wireless interface");
            }
            PcapSource::open_live(
                &capture_config.interface,
                capture_config.snaplen,
                capture_config.promiscuous,
            )
            .with_context(|| format!("Failed to open capture on {}", capture_config.interface))?
        }
    };

    info!(
        iface = %capture_config.interface,
        db = %store_config.path.display(),
        hop = capture_config.hop_enabled,
        timeout_secs = config.session.timeout_secs,
        "Configuration loaded"
    );

    let root = CancellationToken::new();
    spawn_shutdown(root.clone(), config.session_timeout());

    let collector = Collector::new(capture_config, ignore);
    collect::collect(collector, source, &store_config, &root).await?;

    info!("Done");
    Ok(())
}

/// Cancel `root` on Ctrl-C or when the session deadline passes
fn spawn_shutdown(root: CancellationToken, timeout: Option<Duration>) {
    tokio::spawn(async move {
        let deadline = async {
            match timeout {
                Some(timeout) => tokio::time::sleep(timeout).await,
                None => std::future::pending().await,
            }
        };
        tokio::select! {
            res = tokio::signal::ctrl_c() => match res {
                Ok(()) => info!("Interrupted, shutting down"),
                Err(e) => tracing::error!(error = %e, "Cannot listen for Ctrl-C, shutting down"),
            },
            _ = deadline => info!("Timeout reached, shutting down"),
            _ = root.cancelled() => return,
        }
        root.cancel();
    });
}
