/// Errors that can occur during message encoding/decoding.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The buffer holds no bytes at all.
    #[error("empty frame buffer")]
    Empty,

    /// The first byte is not a known message kind.
    #[error("unknown message id 0x{0:02x}")]
    UnknownKind(u8),

    /// A parse function was handed a frame of another kind.
    #[error("unexpected message id {found} (expected {expected})")]
    UnexpectedKind { expected: u8, found: u8 },

    /// The declared length does not match the payload size of the kind.
    #[error("length mismatch for {kind}: declared {declared}, expected {expected}")]
    LengthMismatch {
        kind: &'static str,
        declared: usize,
        expected: usize,
    },

    /// The buffer ends before the declared frame does.
    #[error("truncated frame ({available} bytes, need {needed})")]
    Truncated { needed: usize, available: usize },

    /// A payload byte is outside the range of its enumeration.
    #[error("invalid {field} value {value}")]
    InvalidValue { field: &'static str, value: u8 },

    /// The payload exceeds what the length field can describe.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// An I/O error occurred while reading or writing a frame stream.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, FrameError>;
