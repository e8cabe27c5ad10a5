use std::path::PathBuf;

/// Errors that can occur in session operations.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// No endpoint URI is configured.
    #[error("no endpoint uri configured")]
    NoEndpoint,

    /// The session has no live transport handle.
    #[error("session not connected")]
    NotConnected,

    /// The session mutex was not acquired in time.
    #[error("session lock not acquired within {0:?}")]
    LockTimeout(std::time::Duration),

    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] rovelink_transport::TransportError),

    /// Frame-level error.
    #[error("frame error: {0}")]
    Frame(#[from] rovelink_frame::FrameError),

    /// Persisted configuration error.
    #[error("config store error: {0}")]
    Store(#[from] StoreError),

    /// Motor actuator error.
    #[error("motor error: {0}")]
    Motor(#[from] MotorError),

    /// The link tasks are already running.
    #[error("link already running")]
    AlreadyRunning,
}

/// Errors raised by the motor actuator.
#[derive(Debug, thiserror::Error)]
pub enum MotorError {
    /// Motor id byte outside 0..=1.
    #[error("invalid motor id {0}")]
    InvalidMotor(u8),

    /// Motor state byte outside 0..=3.
    #[error("invalid motor state {0}")]
    InvalidState(u8),

    /// Driving an output pin failed.
    #[error("failed to drive pin {pin}: {reason}")]
    Output { pin: u8, reason: String },
}

/// Errors raised by a [`ConfigStore`](crate::store::ConfigStore).
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The backing file could not be read or written.
    #[error("config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The backing file is not valid JSON.
    #[error("config json error: {0}")]
    Json(#[from] serde_json::Error),

    /// The key holds a value of another type.
    #[error("config key '{key}' is not a {expected}")]
    TypeMismatch { key: String, expected: &'static str },
}

/// Errors raised by a [`Camera`](crate::camera::Camera).
#[derive(Debug, thiserror::Error)]
pub enum CameraError {
    /// The sensor failed to initialize.
    #[error("camera init failed: {0}")]
    Init(String),

    /// A frame could not be captured.
    #[error("camera capture failed: {0}")]
    Capture(String),
}

pub type Result<T> = std::result::Result<T, SessionError>;
