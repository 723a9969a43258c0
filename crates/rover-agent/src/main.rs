//! Rover agent entry point.
//!
//! # Architecture
//!
//! ```text
//! main()
//!  └─ load_config()             -- TOML file named by --config
//!  └─ SimulatedActuator         -- shared by drive handler and sampler
//!  └─ start services
//!       ├─ OutboundPublisher     (Tokio task, drains telemetry)
//!       ├─ TelemetrySampler      (blocking thread)
//!       └─ InboundDispatcher     (listen loop, DriveController handler)
//! ```
//!
//! The agent runs until Ctrl-C or until the subscription is lost; losing the
//! subscription exits with an error so a supervisor can restart it.  The
//! motors are stopped on the way out either way.

use std::path::PathBuf;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use anyhow::Context;
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use rover_agent::application::drive::{Actuator, DriveController};
use rover_agent::application::telemetry::TelemetrySampler;
use rover_agent::infrastructure::actuator::SimulatedActuator;
use rover_agent::infrastructure::storage::config::load_config;
use rover_link::{
    open_subscription, InboundDispatcher, OutboundPublisher, OutboundQueue, RedisTransport,
};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Rover-side relay: drives the motors and reports distance telemetry.
#[derive(Debug, Parser)]
#[command(
    name = "rover-agent",
    about = "Executes drive commands received over a Redis-compatible bus",
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
        "rover agent starting, bus={}, channel={}",
        config.bus.address(),
        config.bus.channel
    );

    let transport = RedisTransport::new(config.bus.clone());
    let channel = config.bus.channel.clone();
    let running = Arc::new(AtomicBool::new(true));
    let actuator: Arc<dyn Actuator> =
        Arc::new(SimulatedActuator::new(config.agent.simulated_distance_cm));

    // ── Outbound telemetry publisher ──────────────────────────────────────────
    let queue = Arc::new(OutboundQueue::new());
    let mut publisher = OutboundPublisher::new(transport.clone(), Arc::clone(&queue), &channel);
    if let Err(e) = publisher.connect().await {
        warn!("bus not reachable yet, will retry on first publish: {e}");
    }
    let period = config.agent.publish_interval();
    let publisher_running = Arc::clone(&running);
    let publisher_task = tokio::spawn(async move {
        publisher.run(period, publisher_running).await;
    });

    // ── Telemetry sampler ─────────────────────────────────────────────────────
    let mut sampler = TelemetrySampler::new(
        Arc::clone(&actuator),
        Arc::clone(&queue),
        config.agent.sampler(),
    );
    let sampler_running = Arc::clone(&running);
    let sampler_task = tokio::task::spawn_blocking(move || sampler.run_blocking(sampler_running));

    // ── Inbound commands ──────────────────────────────────────────────────────
    let subscription = open_subscription(&transport, &channel)
        .await
        .context("subscribing to the command channel")?;
    let mut dispatcher =
        InboundDispatcher::new().with_handler(Box::new(DriveController::new(Arc::clone(&actuator))));
    info!(
        "rover agent ready with {} command handler(s).  Press Ctrl-C to exit.",
        dispatcher.handler_count()
    );

    let outcome = tokio::select! {
        err = dispatcher.listen(subscription) => {
            Err(anyhow::Error::new(err).context("command subscription lost"))
        }
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown signal received");
            Ok(())
        }
    };

    // ── Shutdown ──────────────────────────────────────────────────────────────
    running.store(false, Ordering::Relaxed);
    if let Err(e) = actuator.stop() {
        error!("failed to stop motors on exit: {e}");
    }
    if let Err(e) = sampler_task.await {
        error!("sampler thread failed: {e}");
    }
    if let Err(e) = publisher_task.await {
        error!("publisher task failed: {e}");
    }
    info!("rover agent stopped");
    outcome
}
