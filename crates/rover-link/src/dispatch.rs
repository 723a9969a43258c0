//! Inbound dispatch: turns bus envelopes into handler calls.
//!
//! The dispatcher owns an ordered list of [`MessageHandler`]s.  For every
//! envelope received on the subscription it:
//!
//! 1. Decodes the envelope.  Control notifications and malformed payloads are
//!    logged and skipped; neither stops the loop.
//! 2. Calls every handler, in registration order, with the decoded message.
//!    A handler that returns an error or panics is logged; the remaining
//!    handlers still run and the loop keeps going.
//!
//! Only a [`ConnectivityError`] on the subscription ends [`InboundDispatcher::listen`].

use std::panic::{self, AssertUnwindSafe};

use rover_core::{decode_envelope, CommandMessage, DecodeError, Envelope};
use thiserror::Error;
use tracing::{debug, error, warn};

use crate::transport::{BusSubscription, ConnectivityError};

/// Failure reported by a [`MessageHandler`].
#[derive(Debug, Error)]
pub enum HandlerError {
    /// The hardware (or its driver) refused the command.
    #[error("actuator failure: {0}")]
    Actuator(String),
    /// The handler's downstream consumer has gone away.
    #[error("handler output closed: {0}")]
    Closed(String),
    /// Any other handler-specific failure.
    #[error("{0}")]
    Other(String),
}

/// A component that reacts to decoded inbound messages.
///
/// Handlers run synchronously inside the listen loop, so they must not block
/// for long.
#[cfg_attr(test, mockall::automock)]
pub trait MessageHandler: Send {
    /// Reacts to one message.
    ///
    /// # Errors
    ///
    /// Returns [`HandlerError`] if the message could not be acted on.  The
    /// error is logged by the dispatcher and does not affect other handlers.
    fn handle(&mut self, message: &CommandMessage) -> Result<(), HandlerError>;
}

/// What happened to one envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The envelope was not a decodable data message; no handler ran.
    Skipped,
    /// Every handler was invoked; `failures` of them errored or panicked.
    Delivered { failures: usize },
}

/// Routes decoded messages to an ordered set of handlers.
#[derive(Default)]
pub struct InboundDispatcher {
    handlers: Vec<Box<dyn MessageHandler>>,
}

impl InboundDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a handler.  Handlers are called in the order they were added.
    pub fn register(&mut self, handler: Box<dyn MessageHandler>) {
        self.handlers.push(handler);
    }

    /// Builder-style [`register`](Self::register).
    pub fn with_handler(mut self, handler: Box<dyn MessageHandler>) -> Self {
        self.register(handler);
        self
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }

    /// Decodes `envelope` and, if it holds a command, delivers it.
    pub fn dispatch(&mut self, envelope: &Envelope) -> DispatchOutcome {
        match decode_envelope(envelope) {
            Ok(message) => {
                debug!("received {message:?} on {}", envelope.channel);
                DispatchOutcome::Delivered {
                    failures: self.deliver(&message),
                }
            }
            Err(DecodeError::NotData(kind)) => {
                debug!("ignoring {kind} notification on {}", envelope.channel);
                DispatchOutcome::Skipped
            }
            Err(e) => {
                warn!("dropping undecodable message on {}: {e}", envelope.channel);
                DispatchOutcome::Skipped
            }
        }
    }

    /// Calls every handler with `message`; returns how many failed.
    pub fn deliver(&mut self, message: &CommandMessage) -> usize {
        let mut failures = 0;
        for (index, handler) in self.handlers.iter_mut().enumerate() {
            let result = panic::catch_unwind(AssertUnwindSafe(|| handler.handle(message)));
            match result {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    failures += 1;
                    warn!("handler #{index} failed: {e}");
                }
                Err(_) => {
                    failures += 1;
                    error!("handler #{index} panicked while handling {message:?}");
                }
            }
        }
        failures
    }

    /// Receives and dispatches envelopes until the subscription fails.
    ///
    /// Returns the error that ended the loop.
    pub async fn listen<S: BusSubscription>(&mut self, mut subscription: S) -> ConnectivityError {
        debug!("listening with {} handler(s)", self.handlers.len());
        loop {
            match subscription.receive().await {
                Ok(envelope) => {
                    self.dispatch(&envelope);
                }
                Err(e) => {
                    error!("subscription lost: {e}");
                    return e;
                }
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::{predicate::eq, Sequence};
    use rover_core::encode_command;

    const CH: &str = "remotecommands";

    fn data(message: &CommandMessage) -> Envelope {
        Envelope::data(CH, encode_command(message))
    }

    #[test]
    fn test_handlers_run_in_registration_order() {
        // Arrange
        let msg = CommandMessage::steer(0.5, 0.5);
        let mut seq = Sequence::new();
        let mut first = MockMessageHandler::new();
        first
            .expect_handle()
            .with(eq(msg))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        let mut second = MockMessageHandler::new();
        second
            .expect_handle()
            .with(eq(msg))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        let mut dispatcher = InboundDispatcher::new()
            .with_handler(Box::new(first))
            .with_handler(Box::new(second));

        // Act
        let outcome = dispatcher.dispatch(&data(&msg));

        // Assert
        assert_eq!(outcome, DispatchOutcome::Delivered { failures: 0 });
    }

    #[test]
    fn test_failing_handler_does_not_block_the_next() {
        // Arrange
        let mut failing = MockMessageHandler::new();
        failing
            .expect_handle()
            .times(1)
            .returning(|_| Err(HandlerError::Other("boom".into())));
        let mut healthy = MockMessageHandler::new();
        healthy.expect_handle().times(1).returning(|_| Ok(()));
        let mut dispatcher = InboundDispatcher::new()
            .with_handler(Box::new(failing))
            .with_handler(Box::new(healthy));

        // Act
        let outcome = dispatcher.dispatch(&data(&CommandMessage::emergency_stop()));

        // Assert
        assert_eq!(outcome, DispatchOutcome::Delivered { failures: 1 });
    }

    struct PanickingHandler;

    impl MessageHandler for PanickingHandler {
        fn handle(&mut self, _message: &CommandMessage) -> Result<(), HandlerError> {
            panic!("driver exploded");
        }
    }

    #[test]
    fn test_panicking_handler_is_isolated() {
        let panicking = PanickingHandler;
        let mut healthy = MockMessageHandler::new();
        healthy.expect_handle().times(2).returning(|_| Ok(()));
        let mut dispatcher = InboundDispatcher::new()
            .with_handler(Box::new(panicking))
            .with_handler(Box::new(healthy));

        let msg = data(&CommandMessage::speed_bias(0.2));
        assert_eq!(
            dispatcher.dispatch(&msg),
            DispatchOutcome::Delivered { failures: 1 }
        );
        assert_eq!(
            dispatcher.dispatch(&msg),
            DispatchOutcome::Delivered { failures: 1 }
        );
    }

    #[test]
    fn test_undecodable_envelopes_reach_no_handler() {
        // Arrange – a handler with no expectations fails the test if called
        let handler = MockMessageHandler::new();
        let mut dispatcher = InboundDispatcher::new().with_handler(Box::new(handler));

        // Act / Assert
        for env in [
            Envelope::control("subscribe", CH),
            Envelope {
                kind: "message".into(),
                channel: CH.into(),
                data: None,
            },
            Envelope::data(CH, "{not json"),
            Envelope::data(CH, "[1, 2]"),
            Envelope::data(CH, "{\"direction\": [2.0, 0.0]}"),
        ] {
            assert_eq!(dispatcher.dispatch(&env), DispatchOutcome::Skipped);
        }
    }

    #[tokio::test]
    async fn test_listen_returns_the_subscription_error() {
        // Arrange
        let bus = crate::transport::MemoryBus::new();
        let sub = crate::transport::open_subscription(&bus, CH).await.unwrap();
        let mut handler = MockMessageHandler::new();
        handler.expect_handle().times(1).returning(|_| Ok(()));
        let mut dispatcher = InboundDispatcher::new().with_handler(Box::new(handler));

        bus.inject(Envelope::data(CH, "garbage"));
        bus.inject(data(&CommandMessage::emergency_stop()));
        bus.sever();

        // Act
        let err = dispatcher.listen(sub).await;

        // Assert
        assert!(matches!(err, ConnectivityError::Disconnected));
    }
}
