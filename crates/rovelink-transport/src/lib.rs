//! Socket transport seam for the rovelink control link.
//!
//! The device keeps one outbound connection to its controller. This crate
//! defines what the session layer needs from that connection:
//! - [`Connector`] creates a [`Transport`] from an endpoint URI
//! - [`Transport`] starts, stops, sends binary frames and reports liveness
//! - [`TransportEvent`]s (connected, data, disconnected, error) flow back
//!   through an [`EventSink`] instead of callbacks
//!
//! Two implementations ship here: [`tcp`] for real sockets and [`memory`]
//! for tests and loopback demos.

pub mod error;
pub mod event;
pub mod memory;
pub mod tcp;
pub mod traits;

pub use error::{Result, TransportError};
pub use event::{event_channel, EventHub, EventSink, EventStream, TaggedEvent, TransportEvent};
pub use memory::{MemoryConnector, MemoryRemote};
pub use tcp::{TcpConnector, TcpTransport, TransportConfig};
pub use traits::{Connector, Transport};
