use std::time::Duration;

/// Errors that can occur in transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The endpoint URI could not be parsed.
    #[error("invalid endpoint uri '{uri}': {reason}")]
    InvalidUri { uri: String, reason: String },

    /// The endpoint URI names a scheme this transport does not speak.
    #[error("unsupported uri scheme '{0}'")]
    UnsupportedScheme(String),

    /// Failed to connect to the endpoint.
    #[error("failed to connect to {addr}: {source}")]
    Connect {
        addr: String,
        source: std::io::Error,
    },

    /// The transport has no live connection.
    #[error("transport not connected")]
    NotConnected,

    /// `start` was called twice on the same handle.
    #[error("transport already started")]
    AlreadyStarted,

    /// A send did not complete within its deadline.
    #[error("send timed out after {0:?}")]
    SendTimeout(Duration),

    /// An I/O error occurred on the transport stream.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The transport has been stopped.
    #[error("transport shut down")]
    Shutdown,
}

pub type Result<T> = std::result::Result<T, TransportError>;
