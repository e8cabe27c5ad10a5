use bytes::{BufMut, BytesMut};

use crate::error::{FrameError, Result};
use crate::kind::MessageKind;
use crate::message::{MotorControl, MotorId, MotorState, MotorStateCommand, MoveCommand, Telemetry};

/// Frame header: kind id (1) + length (2) = 3 bytes.
pub const HEADER_SIZE: usize = 3;

/// Largest camera chunk the 16-bit length field can describe.
pub const MAX_CHUNK_LEN: usize = u16::MAX as usize;

/// A decoded value together with the number of bytes it consumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Parsed<T> {
    pub value: T,
    pub consumed: usize,
}

impl<T> Parsed<T> {
    /// Transform the decoded value, keeping the consumed count.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Parsed<U> {
        Parsed {
            value: f(self.value),
            consumed: self.consumed,
        }
    }
}

/// Write the header of a fixed-layout kind and return the full frame size.
///
/// Wire format:
/// ```text
/// ┌──────────┬──────────────┬───────────────────────┐
/// │ Id (1B)  │ Length (2B)  │ Payload (Length bytes) │
/// │          │ LE           │                       │
/// └──────────┴──────────────┴───────────────────────┘
/// ```
fn put_header(dst: &mut BytesMut, kind: MessageKind) -> usize {
    let len = kind.payload_len().unwrap_or(0);
    dst.reserve(HEADER_SIZE + len);
    dst.put_u8(kind.id());
    dst.put_u16_le(len as u16);
    HEADER_SIZE + len
}

/// Encode a motor-state command. Returns the frame size (5).
pub fn encode_motor_state(dst: &mut BytesMut, motor: MotorId, state: MotorState) -> usize {
    let total = put_header(dst, MessageKind::MotorState);
    dst.put_u8(motor as u8);
    dst.put_u8(state as u8);
    total
}

/// Encode a telemetry snapshot. Returns the frame size (8).
pub fn encode_telemetry(dst: &mut BytesMut, telemetry: &Telemetry) -> usize {
    let total = put_header(dst, MessageKind::Telemetry);
    dst.put_u8(telemetry.motor1 as u8);
    dst.put_u8(telemetry.motor2 as u8);
    dst.put_u8(telemetry.battery);
    dst.put_u8(telemetry.distance);
    dst.put_u8(telemetry.camera_fps);
    total
}

/// Encode a camera on/off command. Returns the frame size (4).
pub fn encode_camera_control(dst: &mut BytesMut, on: bool) -> usize {
    let total = put_header(dst, MessageKind::CameraControl);
    dst.put_u8(u8::from(on));
    total
}

/// Encode a camera chunk.
///
/// The length is written as two raw bytes, low byte first. Fails with
/// `PayloadTooLarge` when `data` does not fit in 16 bits.
pub fn encode_camera_chunk(dst: &mut BytesMut, data: &[u8]) -> Result<usize> {
    if data.len() > MAX_CHUNK_LEN {
        return Err(FrameError::PayloadTooLarge {
            size: data.len(),
            max: MAX_CHUNK_LEN,
        });
    }
    let len = data.len() as u16;
    dst.reserve(HEADER_SIZE + data.len());
    dst.put_u8(MessageKind::CameraChunk.id());
    dst.put_u8((len & 0xff) as u8);
    dst.put_u8((len >> 8) as u8);
    dst.put_slice(data);
    Ok(HEADER_SIZE + data.len())
}

/// Encode a both-motor command. Returns the frame size (5).
pub fn encode_motor_control(dst: &mut BytesMut, motor1: MotorState, motor2: MotorState) -> usize {
    let total = put_header(dst, MessageKind::MotorControl);
    dst.put_u8(motor1 as u8);
    dst.put_u8(motor2 as u8);
    total
}

/// Encode a combined move command. Returns the frame size (4).
pub fn encode_move_control(dst: &mut BytesMut, cmd: MoveCommand) -> usize {
    let total = put_header(dst, MessageKind::MoveControl);
    dst.put_u8(cmd as u8);
    total
}

/// Encode a battery level report. Returns the frame size (4).
pub fn encode_battery_level(dst: &mut BytesMut, level: u8) -> usize {
    let total = put_header(dst, MessageKind::BatteryLevel);
    dst.put_u8(level);
    total
}

/// Encode a forward distance report. Returns the frame size (4).
pub fn encode_distance_reading(dst: &mut BytesMut, forward_cm: u8) -> usize {
    let total = put_header(dst, MessageKind::DistanceReading);
    dst.put_u8(forward_cm);
    total
}

/// Validate the header of a fixed-layout frame and return its payload.
///
/// The declared length must equal the exact payload size of `kind`.
fn fixed_payload(src: &[u8], kind: MessageKind) -> Result<&[u8]> {
    let Some(&id) = src.first() else {
        return Err(FrameError::Empty);
    };
    if id != kind.id() {
        return Err(FrameError::UnexpectedKind {
            expected: kind.id(),
            found: id,
        });
    }
    if src.len() < HEADER_SIZE {
        return Err(FrameError::Truncated {
            needed: HEADER_SIZE,
            available: src.len(),
        });
    }

    let declared = u16::from_le_bytes([src[1], src[2]]) as usize;
    let expected = kind.payload_len().unwrap_or(0);
    if declared != expected {
        return Err(FrameError::LengthMismatch {
            kind: kind.name(),
            declared,
            expected,
        });
    }

    let total = HEADER_SIZE + expected;
    if src.len() < total {
        return Err(FrameError::Truncated {
            needed: total,
            available: src.len(),
        });
    }
    Ok(&src[HEADER_SIZE..total])
}

fn parsed<T>(value: T, kind: MessageKind) -> Parsed<T> {
    Parsed {
        value,
        consumed: HEADER_SIZE + kind.payload_len().unwrap_or(0),
    }
}

/// Parse a motor-state command.
pub fn parse_motor_state(src: &[u8]) -> Result<Parsed<MotorStateCommand>> {
    let payload = fixed_payload(src, MessageKind::MotorState)?;
    let cmd = MotorStateCommand {
        motor: MotorId::try_from(payload[0])?,
        state: MotorState::try_from(payload[1])?,
    };
    Ok(parsed(cmd, MessageKind::MotorState))
}

/// Parse a telemetry snapshot.
pub fn parse_telemetry(src: &[u8]) -> Result<Parsed<Telemetry>> {
    let payload = fixed_payload(src, MessageKind::Telemetry)?;
    let telemetry = Telemetry {
        motor1: MotorState::try_from(payload[0])?,
        motor2: MotorState::try_from(payload[1])?,
        battery: payload[2],
        distance: payload[3],
        camera_fps: payload[4],
    };
    Ok(parsed(telemetry, MessageKind::Telemetry))
}

/// Parse a camera on/off command. Any non-zero byte means on.
pub fn parse_camera_control(src: &[u8]) -> Result<Parsed<bool>> {
    let payload = fixed_payload(src, MessageKind::CameraControl)?;
    Ok(parsed(payload[0] != 0, MessageKind::CameraControl))
}

/// Parse a camera chunk, borrowing its data from `src`.
///
/// Skips the fixed-size length check; the 16-bit length bounds the slice.
pub fn parse_camera_chunk(src: &[u8]) -> Result<Parsed<&[u8]>> {
    let Some(&id) = src.first() else {
        return Err(FrameError::Empty);
    };
    if id != MessageKind::CameraChunk.id() {
        return Err(FrameError::UnexpectedKind {
            expected: MessageKind::CameraChunk.id(),
            found: id,
        });
    }
    if src.len() < HEADER_SIZE {
        return Err(FrameError::Truncated {
            needed: HEADER_SIZE,
            available: src.len(),
        });
    }

    let len = usize::from(src[1]) | (usize::from(src[2]) << 8);
    let total = HEADER_SIZE + len;
    if src.len() < total {
        return Err(FrameError::Truncated {
            needed: total,
            available: src.len(),
        });
    }
    Ok(Parsed {
        value: &src[HEADER_SIZE..total],
        consumed: total,
    })
}

/// Parse a both-motor command.
pub fn parse_motor_control(src: &[u8]) -> Result<Parsed<MotorControl>> {
    let payload = fixed_payload(src, MessageKind::MotorControl)?;
    let ctl = MotorControl {
        motor1: MotorState::try_from(payload[0])?,
        motor2: MotorState::try_from(payload[1])?,
    };
    Ok(parsed(ctl, MessageKind::MotorControl))
}

/// Parse a combined move command.
pub fn parse_move_control(src: &[u8]) -> Result<Parsed<MoveCommand>> {
    let payload = fixed_payload(src, MessageKind::MoveControl)?;
    Ok(parsed(
        MoveCommand::try_from(payload[0])?,
        MessageKind::MoveControl,
    ))
}

/// Parse a battery level report.
pub fn parse_battery_level(src: &[u8]) -> Result<Parsed<u8>> {
    let payload = fixed_payload(src, MessageKind::BatteryLevel)?;
    Ok(parsed(payload[0], MessageKind::BatteryLevel))
}

/// Parse a forward distance report.
pub fn parse_distance_reading(src: &[u8]) -> Result<Parsed<u8>> {
    let payload = fixed_payload(src, MessageKind::DistanceReading)?;
    Ok(parsed(payload[0], MessageKind::DistanceReading))
}
