use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::Result;
use crate::event::EventSink;

/// One live outbound connection handle.
///
/// Handles are single-use: `start` once, `stop` once, then drop. Events are
/// raised through the [`EventSink`] the handle was created with.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Begin connecting in the background. Returns once the attempt is
    /// scheduled; completion is reported as a `Connected` or `Error` event.
    fn start(&mut self) -> Result<()>;

    /// Stop the connection and release its resources.
    async fn stop(&mut self);

    /// Send one complete binary frame.
    async fn send_binary(&mut self, frame: Bytes, timeout: Duration) -> Result<()>;

    /// Whether the connection is currently up.
    fn is_connected(&self) -> bool;

    /// Endpoint this handle was created for.
    fn uri(&self) -> &str;
}

/// Factory for transport handles.
pub trait Connector: Send + Sync {
    /// Create a handle for `uri` that reports through `events`.
    fn create(&self, uri: &str, events: EventSink) -> Result<Box<dyn Transport>>;
}
