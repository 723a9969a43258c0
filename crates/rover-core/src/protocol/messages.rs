//! Command and telemetry message types exchanged over the bus.
//!
//! Both directions share one payload shape, [`CommandMessage`].  Every field is
//! independently optional: a joystick update carries only `direction`, a slider
//! change only `speed`, a telemetry report only `distance`.  Receivers decide
//! what a message *means* purely from which fields are populated, never from
//! the channel it arrived on.

use serde::{Deserialize, Deserializer, Serialize};

// ── Protocol constants ────────────────────────────────────────────────────────

/// Envelope discriminator used by the bus for data messages.
///
/// Anything else (`"subscribe"`, `"unsubscribe"`, `"pong"`, …) is a transport
/// control notification and never reaches the codec.
pub const DATA_KIND: &str = "message";

/// Channel shared by commands and telemetry unless configured otherwise.
pub const DEFAULT_CHANNEL: &str = "remotecommands";

// ── Direction ─────────────────────────────────────────────────────────────────

/// A joystick sample: `x` is strafe (left/right), `y` is forward/back.
///
/// On the wire this is a two-element JSON array `[x, y]`, matching what the
/// joystick widget reports as its pad position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "(f64, f64)", into = "(f64, f64)")]
pub struct Direction {
    pub x: f64,
    pub y: f64,
}

impl Direction {
    /// The centred joystick.  Receiving exactly this value means "all stop".
    pub const CENTERED: Direction = Direction { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Returns `true` only for an exact `(0.0, 0.0)` sample.
    ///
    /// Uses exact float comparison on purpose: the widget snaps back to the
    /// origin when released, and anything else is a deliberate input.
    pub fn is_centered(&self) -> bool {
        self.x == 0.0 && self.y == 0.0
    }
}

impl From<(f64, f64)> for Direction {
    fn from((x, y): (f64, f64)) -> Self {
        Self { x, y }
    }
}

impl From<Direction> for (f64, f64) {
    fn from(d: Direction) -> Self {
        (d.x, d.y)
    }
}

// ── Command message ───────────────────────────────────────────────────────────

/// The domain payload carried inside every data envelope.
///
/// Unknown keys are rejected so that a typo on the sender side shows up as a
/// decode error instead of a silently ignored command.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CommandMessage {
    /// Joystick position, or `None` when this message does not steer.
    #[serde(default)]
    pub direction: Option<Direction>,
    /// When `true`, stops the motors and overrides `direction`.  A `null`
    /// on the wire reads as `false`.
    #[serde(default, deserialize_with = "null_as_false")]
    pub stop: bool,
    /// New speed bias in `[0.0, 1.0]`; `None` means "leave the bias alone".
    #[serde(default)]
    pub speed: Option<f64>,
    /// Distance reading in centimetres.  Only telemetry sets this.
    #[serde(default)]
    pub distance: Option<f64>,
}

fn null_as_false<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    Ok(Option::<bool>::deserialize(deserializer)?.unwrap_or(false))
}

impl CommandMessage {
    /// A steering update.
    pub fn steer(x: f64, y: f64) -> Self {
        Self {
            direction: Some(Direction::new(x, y)),
            ..Self::default()
        }
    }

    /// An emergency stop.
    pub fn emergency_stop() -> Self {
        Self {
            stop: true,
            ..Self::default()
        }
    }

    /// A speed-bias update.
    pub fn speed_bias(speed: f64) -> Self {
        Self {
            speed: Some(speed),
            ..Self::default()
        }
    }

    /// A distance telemetry report.
    pub fn telemetry(distance_cm: f64) -> Self {
        Self {
            distance: Some(distance_cm),
            ..Self::default()
        }
    }
}

// ── Envelope ──────────────────────────────────────────────────────────────────

/// The wire unit yielded by the bus transport.
///
/// Conceptually `{"type": "message", "channel": "...", "data": "<json>"}`.
/// `data` holds the serialized [`CommandMessage`] and is `None` for control
/// notifications such as subscription confirmations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    /// Discriminator; [`DATA_KIND`] for data messages.
    #[serde(rename = "type")]
    pub kind: String,
    /// Channel the envelope was received on.
    #[serde(default)]
    pub channel: String,
    /// Serialized payload, if any.
    #[serde(default)]
    pub data: Option<String>,
}

impl Envelope {
    /// Builds a data envelope carrying `payload`.
    pub fn data(channel: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            kind: DATA_KIND.to_string(),
            channel: channel.into(),
            data: Some(payload.into()),
        }
    }

    /// Builds a control notification (no payload) of the given kind.
    pub fn control(kind: impl Into<String>, channel: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            channel: channel.into(),
            data: None,
        }
    }

    /// Returns `true` if the discriminator marks this as a data message.
    pub fn is_data(&self) -> bool {
        self.kind == DATA_KIND
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_centered_is_only_exact_origin() {
        assert!(Direction::CENTERED.is_centered());
        assert!(Direction::new(0.0, -0.0).is_centered());
        assert!(!Direction::new(0.0, 0.0001).is_centered());
    }

    #[test]
    fn test_constructors_populate_a_single_field() {
        let steer = CommandMessage::steer(0.5, -0.25);
        assert_eq!(steer.direction, Some(Direction::new(0.5, -0.25)));
        assert!(!steer.stop);
        assert_eq!(steer.speed, None);

        let stop = CommandMessage::emergency_stop();
        assert!(stop.stop);
        assert_eq!(stop.direction, None);

        let speed = CommandMessage::speed_bias(0.75);
        assert_eq!(speed.speed, Some(0.75));

        let telemetry = CommandMessage::telemetry(42.0);
        assert_eq!(telemetry.distance, Some(42.0));
        assert_eq!(speed.distance, None);
    }

    #[test]
    fn test_direction_serializes_as_two_element_array() {
        let json = serde_json::to_string(&Direction::new(0.5, -1.0)).unwrap();
        assert_eq!(json, "[0.5,-1.0]");
    }

    #[test]
    fn test_envelope_type_field_is_renamed_on_the_wire() {
        // Arrange
        let env = Envelope::data("remotecommands", "{}");

        // Act
        let json = serde_json::to_value(&env).unwrap();

        // Assert
        assert_eq!(json["type"], "message");
        assert_eq!(json["data"], "{}");
        assert!(env.is_data());
    }

    #[test]
    fn test_control_envelope_has_no_payload() {
        let env = Envelope::control("subscribe", "remotecommands");
        assert!(!env.is_data());
        assert_eq!(env.data, None);
    }
}
