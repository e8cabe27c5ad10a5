//! Camera and motor control link for remote-driven devices.
//!
//! # Crate Structure
//!
//! - [`frame`] - Binary message codec shared by device and controller
//! - [`transport`] - Connection seam with TCP and in-memory transports
//! - [`session`] - Session manager, motor actuator and link tasks
//! - [`sim`] - Simulated camera, GPIO and sensors for running off-device

/// Re-export frame types.
pub mod frame {
    pub use rovelink_frame::*;
}

/// Re-export transport types.
pub mod transport {
    pub use rovelink_transport::*;
}

/// Re-export session types.
pub mod session {
    pub use rovelink_session::*;
}

pub mod sim;
