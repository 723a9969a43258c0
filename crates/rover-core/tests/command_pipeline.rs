//! Integration tests for the rover-core protocol and drive planning.
//!
//! These tests go through the public API the way the agent does: a payload
//! string arrives inside an envelope, is decoded, and the resulting command is
//! turned into a motor plan.

use rover_core::{
    decode_envelope, encode_command, plan_drive, CommandMessage, DecodeError, Direction,
    DriveCommand, Envelope, SpeedBias,
};

/// Encodes a message, wraps it in a data envelope, and decodes it again.
fn through_the_wire(msg: &CommandMessage) -> CommandMessage {
    let envelope = Envelope::data("remotecommands", encode_command(msg));
    decode_envelope(&envelope).expect("decode must succeed")
}

#[test]
fn test_every_message_kind_survives_the_wire() {
    for msg in [
        CommandMessage::steer(-0.25, 0.75),
        CommandMessage::emergency_stop(),
        CommandMessage::speed_bias(1.0),
        CommandMessage::telemetry(17.5),
        CommandMessage::default(),
    ] {
        assert_eq!(through_the_wire(&msg), msg);
    }
}

#[test]
fn test_reverse_diagonal_produces_reference_wheel_speeds() {
    // Arrange
    let decoded = through_the_wire(&CommandMessage::steer(0.7, -0.7));
    let bias = SpeedBias::default();

    // Act
    let command = plan_drive(decoded.direction.expect("direction"), bias.value());

    // Assert
    let DriveCommand::Drive(wheels) = command else {
        panic!("expected a drive command, got {command:?}");
    };
    assert_eq!(format!("{:.6}", wheels.left), "-0.989949");
    assert_eq!(format!("{:.6}", wheels.right), "0.000000");
}

#[test]
fn test_bias_from_an_earlier_message_applies_to_a_later_direction() {
    // Arrange
    let mut bias = SpeedBias::default();
    let speed_msg = through_the_wire(&CommandMessage::speed_bias(0.5));
    let steer_msg = through_the_wire(&CommandMessage::steer(0.0, 1.0));

    // Act
    bias.update(speed_msg.speed);
    bias.update(steer_msg.speed);
    let with_bias = plan_drive(steer_msg.direction.unwrap(), bias.value());
    let without_bias = plan_drive(steer_msg.direction.unwrap(), 0.0);

    // Assert
    assert_eq!(bias.value(), 0.5);
    assert_ne!(with_bias, without_bias);
}

#[test]
fn test_centered_direction_plans_a_stop() {
    let decoded = through_the_wire(&CommandMessage::steer(0.0, 0.0));
    assert_eq!(decoded.direction, Some(Direction::CENTERED));
    assert_eq!(plan_drive(Direction::CENTERED, 0.9), DriveCommand::Stop);
}

#[test]
fn test_control_envelope_never_decodes() {
    let env = Envelope::control("subscribe", "remotecommands");
    assert!(matches!(decode_envelope(&env), Err(DecodeError::NotData(_))));
}
