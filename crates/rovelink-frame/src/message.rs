use bytes::{Bytes, BytesMut};

use crate::codec::{self, Parsed, HEADER_SIZE};
use crate::error::{FrameError, Result};
use crate::kind::{classify, MessageKind};

/// One of the two drive motors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MotorId {
    Motor1 = 0,
    Motor2 = 1,
}

impl MotorId {
    /// Both motors, in wire order.
    pub const ALL: [MotorId; 2] = [MotorId::Motor1, MotorId::Motor2];

    /// Zero-based index, usable for per-motor arrays.
    pub fn index(self) -> usize {
        self as usize
    }
}

impl TryFrom<u8> for MotorId {
    type Error = FrameError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(Self::Motor1),
            1 => Ok(Self::Motor2),
            value => Err(FrameError::InvalidValue {
                field: "motor",
                value,
            }),
        }
    }
}

impl std::fmt::Display for MotorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Motor1 => f.write_str("motor1"),
            Self::Motor2 => f.write_str("motor2"),
        }
    }
}

/// Commanded state of a single motor.
///
/// `Idle` is the power-on state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum MotorState {
    #[default]
    Idle = 0,
    Forward = 1,
    Backward = 2,
    Brake = 3,
}

impl MotorState {
    /// All states, in wire order.
    pub const ALL: [MotorState; 4] = [
        MotorState::Idle,
        MotorState::Forward,
        MotorState::Backward,
        MotorState::Brake,
    ];
}

impl TryFrom<u8> for MotorState {
    type Error = FrameError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(Self::Idle),
            1 => Ok(Self::Forward),
            2 => Ok(Self::Backward),
            3 => Ok(Self::Brake),
            value => Err(FrameError::InvalidValue {
                field: "motor state",
                value,
            }),
        }
    }
}

impl std::fmt::Display for MotorState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => f.write_str("idle"),
            Self::Forward => f.write_str("forward"),
            Self::Backward => f.write_str("backward"),
            Self::Brake => f.write_str("brake"),
        }
    }
}

/// Combined single-byte move command.
///
/// Values 0-3 address motor 1, values 4-7 address motor 2, each in
/// idle/forward/backward/brake order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MoveCommand {
    Motor1Idle = 0,
    Motor1Forward = 1,
    Motor1Backward = 2,
    Motor1Brake = 3,
    Motor2Idle = 4,
    Motor2Forward = 5,
    Motor2Backward = 6,
    Motor2Brake = 7,
}

impl MoveCommand {
    /// All commands, in wire order.
    pub const ALL: [MoveCommand; 8] = [
        MoveCommand::Motor1Idle,
        MoveCommand::Motor1Forward,
        MoveCommand::Motor1Backward,
        MoveCommand::Motor1Brake,
        MoveCommand::Motor2Idle,
        MoveCommand::Motor2Forward,
        MoveCommand::Motor2Backward,
        MoveCommand::Motor2Brake,
    ];

    /// The single `(motor, state)` actuation this command stands for.
    pub fn actuation(self) -> (MotorId, MotorState) {
        match self {
            Self::Motor1Idle => (MotorId::Motor1, MotorState::Idle),
            Self::Motor1Forward => (MotorId::Motor1, MotorState::Forward),
            Self::Motor1Backward => (MotorId::Motor1, MotorState::Backward),
            Self::Motor1Brake => (MotorId::Motor1, MotorState::Brake),
            Self::Motor2Idle => (MotorId::Motor2, MotorState::Idle),
            Self::Motor2Forward => (MotorId::Motor2, MotorState::Forward),
            Self::Motor2Backward => (MotorId::Motor2, MotorState::Backward),
            Self::Motor2Brake => (MotorId::Motor2, MotorState::Brake),
        }
    }
}

impl TryFrom<u8> for MoveCommand {
    type Error = FrameError;

    fn try_from(value: u8) -> Result<Self> {
        Self::ALL
            .get(usize::from(value))
            .copied()
            .ok_or(FrameError::InvalidValue {
                field: "move command",
                value,
            })
    }
}

/// Payload of a motor-state command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MotorStateCommand {
    pub motor: MotorId,
    pub state: MotorState,
}

/// Payload of a motor-control command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MotorControl {
    pub motor1: MotorState,
    pub motor2: MotorState,
}

/// Device telemetry snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Telemetry {
    pub motor1: MotorState,
    pub motor2: MotorState,
    /// Battery level, 0-255.
    pub battery: u8,
    /// Forward distance in centimetres, 0-255.
    pub distance: u8,
    /// Camera frames captured per second over the last window.
    pub camera_fps: u8,
}

/// A decoded message of any kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    MotorState(MotorStateCommand),
    Telemetry(Telemetry),
    CameraControl { on: bool },
    CameraChunk(Bytes),
    MotorControl(MotorControl),
    MoveControl(MoveCommand),
    BatteryLevel(u8),
    DistanceReading(u8),
}

impl Message {
    /// The kind tag of this message.
    pub fn kind(&self) -> MessageKind {
        match self {
            Self::MotorState(_) => MessageKind::MotorState,
            Self::Telemetry(_) => MessageKind::Telemetry,
            Self::CameraControl { .. } => MessageKind::CameraControl,
            Self::CameraChunk(_) => MessageKind::CameraChunk,
            Self::MotorControl(_) => MessageKind::MotorControl,
            Self::MoveControl(_) => MessageKind::MoveControl,
            Self::BatteryLevel(_) => MessageKind::BatteryLevel,
            Self::DistanceReading(_) => MessageKind::DistanceReading,
        }
    }

    /// Total wire size (header + payload).
    pub fn wire_size(&self) -> usize {
        let payload = match self {
            Self::CameraChunk(data) => data.len(),
            other => other.kind().payload_len().unwrap_or(0),
        };
        HEADER_SIZE + payload
    }

    /// Append this message to `dst`, returning the number of bytes written.
    pub fn encode(&self, dst: &mut BytesMut) -> Result<usize> {
        let written = match self {
            Self::MotorState(cmd) => codec::encode_motor_state(dst, cmd.motor, cmd.state),
            Self::Telemetry(t) => codec::encode_telemetry(dst, t),
            Self::CameraControl { on } => codec::encode_camera_control(dst, *on),
            Self::CameraChunk(data) => codec::encode_camera_chunk(dst, data)?,
            Self::MotorControl(ctl) => codec::encode_motor_control(dst, ctl.motor1, ctl.motor2),
            Self::MoveControl(cmd) => codec::encode_move_control(dst, *cmd),
            Self::BatteryLevel(level) => codec::encode_battery_level(dst, *level),
            Self::DistanceReading(cm) => codec::encode_distance_reading(dst, *cm),
        };
        Ok(written)
    }

    /// Encode into a buffer sized exactly for this message.
    pub fn to_bytes(&self) -> Result<Bytes> {
        let mut buf = BytesMut::with_capacity(self.wire_size());
        self.encode(&mut buf)?;
        Ok(buf.freeze())
    }

    /// Decode the message at the start of `src`.
    pub fn parse(src: &[u8]) -> Result<Parsed<Message>> {
        let kind = classify(src);
        let parsed = match kind {
            MessageKind::MotorState => codec::parse_motor_state(src)?.map(Self::MotorState),
            MessageKind::Telemetry => codec::parse_telemetry(src)?.map(Self::Telemetry),
            MessageKind::CameraControl => {
                codec::parse_camera_control(src)?.map(|on| Self::CameraControl { on })
            }
            MessageKind::CameraChunk => {
                codec::parse_camera_chunk(src)?.map(|data| Self::CameraChunk(Bytes::copy_from_slice(data)))
            }
            MessageKind::MotorControl => codec::parse_motor_control(src)?.map(Self::MotorControl),
            MessageKind::MoveControl => codec::parse_move_control(src)?.map(Self::MoveControl),
            MessageKind::BatteryLevel => codec::parse_battery_level(src)?.map(Self::BatteryLevel),
            MessageKind::DistanceReading => {
                codec::parse_distance_reading(src)?.map(Self::DistanceReading)
            }
            MessageKind::Unknown => {
                return Err(match src.first() {
                    Some(&id) => FrameError::UnknownKind(id),
                    None => FrameError::Empty,
                })
            }
        };
        Ok(parsed)
    }
}
