//! Binary message codec for the rovelink control link.
//!
//! Every message is framed with:
//! - A 1-byte message kind id
//! - A 2-byte little-endian payload length
//! - The payload, whose size is fixed per kind
//!
//! Camera chunks reuse the same header shape but carry raw image bytes of
//! any length up to 65535, so they skip the fixed-size check.

pub mod codec;
pub mod error;
pub mod kind;
pub mod message;
pub mod stream;

pub use codec::{
    encode_battery_level, encode_camera_chunk, encode_camera_control, encode_distance_reading,
    encode_motor_control, encode_motor_state, encode_move_control, encode_telemetry,
    parse_battery_level, parse_camera_chunk, parse_camera_control, parse_distance_reading,
    parse_motor_control, parse_motor_state, parse_move_control, parse_telemetry, Parsed,
    HEADER_SIZE, MAX_CHUNK_LEN,
};
pub use error::{FrameError, Result};
pub use kind::{classify, MessageKind};
pub use message::{Message, MotorControl, MotorId, MotorState, MotorStateCommand, MoveCommand, Telemetry};
pub use stream::{LinkCodec, DEFAULT_MAX_FRAME};
