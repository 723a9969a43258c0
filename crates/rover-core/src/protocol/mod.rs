//! Protocol module containing message types and the JSON codec.

pub mod codec;
pub mod messages;

pub use codec::{decode_command, decode_envelope, encode_command, DecodeError};
pub use messages::*;
