//! Device side of the rovelink control link.
//!
//! This crate owns the connection to the controller and everything that
//! runs over it:
//! - [`Session`] keeps at most one transport handle behind a mutex and
//!   tracks the connect / reconnect state machine
//! - [`FrameProducer`] streams camera chunks and measures frame rates
//! - [`CommandConsumer`] services reconnect requests, telemetry and the
//!   watchdog
//! - [`MotorActuator`] turns motor commands into pin levels
//! - [`Link`] wires the pieces together and runs them as tokio tasks
//!
//! Hardware and persistence are reached through collaborator traits
//! ([`ConfigStore`], [`Camera`], [`DigitalOutput`], [`Sensors`]).

pub mod camera;
pub mod consumer;
pub mod control;
pub mod dispatch;
pub mod error;
pub mod link;
pub mod motor;
pub mod producer;
pub mod sensors;
pub mod session;
pub mod settings;
pub mod store;

pub use camera::{Camera, CameraSwitch};
pub use consumer::{CommandConsumer, IntervalTimer};
pub use control::{ControlEvent, ControlQueue, DEFAULT_CONTROL_CAPACITY};
pub use dispatch::{dispatch_frame, Dispatch};
pub use error::{CameraError, MotorError, Result, SessionError, StoreError};
pub use link::{Link, LinkConfig};
pub use motor::{DigitalOutput, MotorActuator};
pub use producer::{FpsWindow, FrameProducer, FrameRates};
pub use sensors::Sensors;
pub use session::{Session, SessionState};
pub use settings::{MotorPins, WifiCredentials};
pub use store::{ConfigStore, JsonFileStore, MemoryStore, StoredValue};
