//! Rover controller entry point.
//!
//! # Architecture
//!
//! ```text
//! main()
//!  └─ load_config()            -- TOML file named by --config
//!  └─ start services
//!       ├─ OutboundPublisher    (Tokio task, one tick per publish interval)
//!       ├─ InboundDispatcher    (Tokio task, DistanceDisplay handler)
//!       └─ operator console     (stdin lines -> OperatorInput, distance readings -> stdout)
//! ```
//!
//! The controller exits when the operator types `quit`, on Ctrl-C, or when
//! the inbound subscription is lost.

use std::path::PathBuf;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use anyhow::Context;
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use rover_controller::application::operator_input::OperatorInput;
use rover_controller::application::telemetry_view::{distance_label, DistanceDisplay};
use rover_controller::infrastructure::console::{self, HELP};
use rover_controller::infrastructure::storage::config::load_config;
use rover_link::{
    open_subscription, InboundDispatcher, OutboundPublisher, OutboundQueue, RedisTransport,
};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Operator-side relay for a remotely driven rover.
#[derive(Debug, Parser)]
#[command(
    name = "rover-controller",
    about = "Publishes drive commands to a rover over a Redis-compatible bus",
    version
)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, short, default_value = "rover.toml", env = "ROVER_CONFIG")]
    config: PathBuf,
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Level is overridden by `RUST_LOG`.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli.config)
        .with_context(|| format!("loading configuration from {}", cli.config.display()))?;
    info!(
        "rover controller starting, bus={}, channel={}",
        config.bus.address(),
        config.bus.channel
    );

    let transport = RedisTransport::new(config.bus.clone());
    let channel = config.bus.channel.clone();
    let running = Arc::new(AtomicBool::new(true));

    // ── Outbound publisher ────────────────────────────────────────────────────
    let queue = Arc::new(OutboundQueue::new());
    let mut publisher = OutboundPublisher::new(transport.clone(), Arc::clone(&queue), &channel);
    if let Err(e) = publisher.connect().await {
        warn!("bus not reachable yet, will retry on first publish: {e}");
    }
    let period = config.controller.publish_interval();
    let publisher_running = Arc::clone(&running);
    let publisher_task = tokio::spawn(async move {
        publisher.run(period, publisher_running).await;
    });

    // ── Inbound telemetry ─────────────────────────────────────────────────────
    let subscription = open_subscription(&transport, &channel)
        .await
        .context("subscribing to the command channel")?;
    let (display, mut distance_rx) = DistanceDisplay::channel();
    let mut dispatcher = InboundDispatcher::new().with_handler(Box::new(display));
    info!("telemetry listener has {} handler(s)", dispatcher.handler_count());
    let mut listener = tokio::spawn(async move { dispatcher.listen(subscription).await });

    // ── Operator console ──────────────────────────────────────────────────────
    let mut input = OperatorInput::new(Arc::clone(&queue));
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    info!("ready. {HELP}");

    let mut display_open = true;
    let outcome = loop {
        tokio::select! {
            line = lines.next_line() => match line {
                Ok(Some(line)) => match console::parse_line(&line) {
                    Ok(Some(command)) => {
                        if !console::apply(command, &mut input) {
                            break Ok(());
                        }
                    }
                    Ok(None) => {}
                    Err(e) => warn!("{e}"),
                },
                Ok(None) => {
                    info!("stdin closed");
                    break Ok(());
                }
                Err(e) => break Err(anyhow::Error::new(e).context("reading operator console")),
            },
            changed = distance_rx.changed(), if display_open => match changed {
                Ok(()) => {
                    let latest = *distance_rx.borrow_and_update();
                    if let Some(distance) = latest {
                        println!("{}", distance_label(distance));
                    }
                }
                Err(_) => display_open = false,
            },
            _ = tokio::signal::ctrl_c() => {
                info!("shutdown signal received");
                break Ok(());
            }
            result = &mut listener => {
                break match result {
                    Ok(e) => Err(anyhow::Error::new(e).context("telemetry subscription lost")),
                    Err(e) => Err(anyhow::Error::new(e).context("listener task failed")),
                };
            }
        }
    };

    running.store(false, Ordering::Relaxed);
    listener.abort();
    if let Err(e) = publisher_task.await {
        error!("publisher task failed: {e}");
    }
    info!("rover controller stopped");
    outcome
}
