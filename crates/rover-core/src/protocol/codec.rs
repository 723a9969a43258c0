//! JSON codec for [`CommandMessage`] payloads and bus envelopes.
//!
//! Wire format of a payload (every key is always written, absent values are
//! `null`):
//! ```text
//! {"direction":[x,y]|null,"distance":d|null,"speed":s|null,"stop":bool}
//! ```
//!
//! Decoding is strict about shape and range but never panics: every failure is
//! a [`DecodeError`] that the listen loop logs and skips.

use std::ops::RangeInclusive;

use serde_json::{json, Value};
use thiserror::Error;

use crate::protocol::messages::{CommandMessage, Envelope, DATA_KIND};

/// Valid range for each joystick axis.
const AXIS_RANGE: RangeInclusive<f64> = -1.0..=1.0;

/// Valid range for the speed bias.
const SPEED_RANGE: RangeInclusive<f64> = 0.0..=1.0;

/// Errors that can occur while decoding an envelope or payload.
#[derive(Debug, Error, PartialEq)]
pub enum DecodeError {
    /// The envelope is a transport control notification, not data.
    #[error("not a data envelope (type {0:?})")]
    NotData(String),

    /// A data envelope arrived without a payload.
    #[error("data envelope has no payload")]
    MissingPayload,

    /// The payload is not valid JSON.
    #[error("unparseable payload: {0}")]
    Unparseable(String),

    /// The payload parsed, but is not a JSON object.
    #[error("payload is not a mapping")]
    NotAMapping,

    /// The payload is an object with the wrong keys or value types.
    #[error("malformed payload: {0}")]
    Malformed(String),

    /// A numeric field is outside its allowed range.
    #[error("field {field} out of range: {value}")]
    OutOfRange { field: &'static str, value: f64 },
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Serializes a [`CommandMessage`] to its JSON payload string.
///
/// Encoding cannot fail: every field is a primitive or an optional primitive.
///
/// # Examples
///
/// ```rust
/// use rover_core::protocol::{decode_command, encode_command, CommandMessage};
///
/// let msg = CommandMessage::steer(0.5, 1.0);
/// let payload = encode_command(&msg);
/// assert_eq!(decode_command(&payload).unwrap(), msg);
/// ```
pub fn encode_command(msg: &CommandMessage) -> String {
    json!({
        "direction": msg.direction.map(|d| [d.x, d.y]),
        "stop": msg.stop,
        "speed": msg.speed,
        "distance": msg.distance,
    })
    .to_string()
}

/// Decodes the [`CommandMessage`] carried by a bus envelope.
///
/// # Errors
///
/// Returns [`DecodeError::NotData`] for control notifications,
/// [`DecodeError::MissingPayload`] when `data` is absent, and any error from
/// [`decode_command`] for a bad payload.
pub fn decode_envelope(envelope: &Envelope) -> Result<CommandMessage, DecodeError> {
    if envelope.kind != DATA_KIND {
        return Err(DecodeError::NotData(envelope.kind.clone()));
    }
    let payload = envelope.data.as_deref().ok_or(DecodeError::MissingPayload)?;
    decode_command(payload)
}

/// Decodes a JSON payload string into a [`CommandMessage`].
///
/// # Errors
///
/// Returns [`DecodeError`] if the payload is not JSON, not an object, has
/// unknown keys or wrongly typed values, or carries out-of-range numbers.
pub fn decode_command(payload: &str) -> Result<CommandMessage, DecodeError> {
    let value: Value =
        serde_json::from_str(payload).map_err(|e| DecodeError::Unparseable(e.to_string()))?;
    if !value.is_object() {
        return Err(DecodeError::NotAMapping);
    }

    let msg: CommandMessage =
        serde_json::from_value(value).map_err(|e| DecodeError::Malformed(e.to_string()))?;
    validate(&msg)?;
    Ok(msg)
}

// ── Validation ────────────────────────────────────────────────────────────────

fn validate(msg: &CommandMessage) -> Result<(), DecodeError> {
    if let Some(direction) = msg.direction {
        check_range("direction.x", direction.x, &AXIS_RANGE)?;
        check_range("direction.y", direction.y, &AXIS_RANGE)?;
    }
    if let Some(speed) = msg.speed {
        check_range("speed", speed, &SPEED_RANGE)?;
    }
    if let Some(distance) = msg.distance {
        if !distance.is_finite() {
            return Err(DecodeError::OutOfRange {
                field: "distance",
                value: distance,
            });
        }
    }
    Ok(())
}

fn check_range(
    field: &'static str,
    value: f64,
    range: &RangeInclusive<f64>,
) -> Result<(), DecodeError> {
    // NaN fails `contains`, so this also rejects non-finite values.
    if range.contains(&value) {
        Ok(())
    } else {
        Err(DecodeError::OutOfRange { field, value })
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
