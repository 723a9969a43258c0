//! Distance telemetry display.
//!
//! [`DistanceDisplay`] is registered with the controller's
//! [`InboundDispatcher`](rover_link::InboundDispatcher).  Every message that
//! carries a `distance` updates a `tokio::sync::watch` channel; the console
//! loop in `main` watches that channel and prints [`distance_label`].  Commands
//! echoed back on the shared channel carry no distance and are ignored.

use rover_core::CommandMessage;
use rover_link::{HandlerError, MessageHandler};
use tokio::sync::watch;
use tracing::debug;

/// Formats a distance the way the operator sees it.
pub fn distance_label(distance_cm: f64) -> String {
    format!("Distance Reading: {distance_cm}")
}

/// Inbound handler that keeps the latest distance reading.
#[derive(Debug)]
pub struct DistanceDisplay {
    tx: watch::Sender<Option<f64>>,
}

impl DistanceDisplay {
    /// Creates the handler and the receiver that observes its readings.
    pub fn channel() -> (Self, watch::Receiver<Option<f64>>) {
        let (tx, rx) = watch::channel(None);
        (Self { tx }, rx)
    }
}

impl MessageHandler for DistanceDisplay {
    fn handle(&mut self, message: &CommandMessage) -> Result<(), HandlerError> {
        let Some(distance) = message.distance else {
            return Ok(());
        };
        if *self.tx.borrow() == Some(distance) {
            return Ok(());
        }
        debug!("distance reading {distance} cm");
        self.tx
            .send(Some(distance))
            .map_err(|_| HandlerError::Closed("distance display receiver dropped".into()))
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
