//! Message kind ids.
//!
//! Ids 1-8 are defined; 0 and everything from 9 up classify as unknown.

/// Motor state command (controller → device).
pub const MOTOR_STATE: u8 = 1;

/// Periodic device telemetry (device → controller).
pub const TELEMETRY: u8 = 2;

/// Camera on/off command (controller → device).
pub const CAMERA_CONTROL: u8 = 3;

/// Raw camera image bytes (device → controller).
pub const CAMERA_CHUNK: u8 = 4;

/// Both-motor state command (controller → device).
pub const MOTOR_CONTROL: u8 = 5;

/// Single-byte combined move command (controller → device).
pub const MOVE_CONTROL: u8 = 6;

/// Battery level report (device → controller).
pub const BATTERY_LEVEL: u8 = 7;

/// Forward distance report (device → controller).
pub const DISTANCE_READING: u8 = 8;

/// The closed set of message kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MessageKind {
    Unknown = 0,
    MotorState = MOTOR_STATE,
    Telemetry = TELEMETRY,
    CameraControl = CAMERA_CONTROL,
    CameraChunk = CAMERA_CHUNK,
    MotorControl = MOTOR_CONTROL,
    MoveControl = MOVE_CONTROL,
    BatteryLevel = BATTERY_LEVEL,
    DistanceReading = DISTANCE_READING,
}

impl MessageKind {
    /// Map a wire id onto a kind. Out-of-range ids map to `Unknown`.
    pub fn from_id(id: u8) -> Self {
        match id {
            MOTOR_STATE => Self::MotorState,
            TELEMETRY => Self::Telemetry,
            CAMERA_CONTROL => Self::CameraControl,
            CAMERA_CHUNK => Self::CameraChunk,
            MOTOR_CONTROL => Self::MotorControl,
            MOVE_CONTROL => Self::MoveControl,
            BATTERY_LEVEL => Self::BatteryLevel,
            DISTANCE_READING => Self::DistanceReading,
            _ => Self::Unknown,
        }
    }

    /// The wire id of this kind.
    pub fn id(self) -> u8 {
        self as u8
    }

    /// Exact payload size of fixed-layout kinds.
    ///
    /// Returns `None` for camera chunks (variable) and unknown kinds.
    pub fn payload_len(self) -> Option<usize> {
        match self {
            Self::MotorState => Some(2),
            Self::Telemetry => Some(5),
            Self::CameraControl => Some(1),
            Self::MotorControl => Some(2),
            Self::MoveControl => Some(1),
            Self::BatteryLevel => Some(1),
            Self::DistanceReading => Some(1),
            Self::CameraChunk | Self::Unknown => None,
        }
    }

    /// Human-readable name, used in logs and CLI output.
    pub fn name(self) -> &'static str {
        match self {
            Self::Unknown => "UNKNOWN",
            Self::MotorState => "MOTOR_STATE",
            Self::Telemetry => "TELEMETRY",
            Self::CameraControl => "CAMERA_CONTROL",
            Self::CameraChunk => "CAMERA_CHUNK",
            Self::MotorControl => "MOTOR_CONTROL",
            Self::MoveControl => "MOVE_CONTROL",
            Self::BatteryLevel => "BATTERY_LEVEL",
            Self::DistanceReading => "DISTANCE_READING",
        }
    }
}

impl std::fmt::Display for MessageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Classify a buffer by its first byte only.
///
/// Empty buffers and ids outside the known set are `Unknown`. The rest of
/// the buffer is not inspected.
pub fn classify(buf: &[u8]) -> MessageKind {
    match buf.first() {
        Some(&id) => MessageKind::from_id(id),
        None => MessageKind::Unknown,
    }
}
