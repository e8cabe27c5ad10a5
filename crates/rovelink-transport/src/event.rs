use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::mpsc;

/// Notification raised by a transport on its own execution context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// The connection is up.
    Connected,
    /// One complete inbound frame.
    Data(Bytes),
    /// The peer closed the connection.
    Disconnected,
    /// The connection failed.
    Error(String),
}

/// An event stamped with the generation of the transport that raised it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaggedEvent {
    pub generation: u64,
    pub event: TransportEvent,
}

/// Non-blocking event sender handed to exactly one transport.
///
/// Emitting never waits, so it is safe from any context.
#[derive(Debug, Clone)]
pub struct EventSink {
    generation: u64,
    tx: mpsc::UnboundedSender<TaggedEvent>,
}

impl EventSink {
    /// Generation number of the transport that owns this sink.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Emit an event. Returns `false` when nobody is listening any more.
    pub fn emit(&self, event: TransportEvent) -> bool {
        self.tx
            .send(TaggedEvent {
                generation: self.generation,
                event,
            })
            .is_ok()
    }
}

/// Issues sinks with increasing generation numbers.
#[derive(Debug, Clone)]
pub struct EventHub {
    tx: mpsc::UnboundedSender<TaggedEvent>,
    next_generation: Arc<AtomicU64>,
}

impl EventHub {
    /// Create a sink for a new transport handle.
    pub fn sink(&self) -> EventSink {
        EventSink {
            generation: self.next_generation.fetch_add(1, Ordering::Relaxed) + 1,
            tx: self.tx.clone(),
        }
    }
}

/// Receiving side of the transport event channel.
#[derive(Debug)]
pub struct EventStream {
    rx: mpsc::UnboundedReceiver<TaggedEvent>,
}

impl EventStream {
    /// Wait for the next event. Returns `None` once every sender is gone.
    pub async fn recv(&mut self) -> Option<TaggedEvent> {
        self.rx.recv().await
    }

    /// Take the next event if one is already queued.
    pub fn try_recv(&mut self) -> Option<TaggedEvent> {
        self.rx.try_recv().ok()
    }
}

/// Create the event channel shared by all transports of one session.
pub fn event_channel() -> (EventHub, EventStream) {
    let (tx, rx) = mpsc::unbounded_channel();
    (
        EventHub {
            tx,
            next_generation: Arc::new(AtomicU64::new(0)),
        },
        EventStream { rx },
    )
}
