//! In-process transport.
//!
//! [`MemoryConnector`] hands out transports whose far end is a
//! [`MemoryRemote`]: the remote decides when the link comes up or drops,
//! delivers inbound frames and records everything the device sent.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tracing::debug;

use crate::error::{Result, TransportError};
use crate::event::{EventSink, TransportEvent};
use crate::traits::{Connector, Transport};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Default)]
struct ConnectorState {
    remotes: Vec<MemoryRemote>,
    connect_on_start: bool,
    fail_next_start: bool,
    send_delay: Duration,
}

/// Connector creating in-memory transports.
#[derive(Debug, Clone, Default)]
pub struct MemoryConnector {
    state: Arc<Mutex<ConnectorState>>,
}

impl MemoryConnector {
    /// Connector whose transports wait for [`MemoryRemote::accept`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Connector whose transports come up as soon as they are started.
    pub fn auto_connect() -> Self {
        let connector = Self::default();
        lock(&connector.state).connect_on_start = true;
        connector
    }

    /// Make the next `start` fail.
    pub fn fail_next_start(&self) {
        lock(&self.state).fail_next_start = true;
    }

    /// Delay every send of transports created from now on.
    pub fn set_send_delay(&self, delay: Duration) {
        lock(&self.state).send_delay = delay;
    }

    /// Number of transports created so far.
    pub fn created(&self) -> usize {
        lock(&self.state).remotes.len()
    }

    /// Remote end of the most recently created transport.
    pub fn last(&self) -> Option<MemoryRemote> {
        lock(&self.state).remotes.last().cloned()
    }

    /// Remote ends of every transport created so far, oldest first.
    pub fn remotes(&self) -> Vec<MemoryRemote> {
        lock(&self.state).remotes.clone()
    }
}

impl Connector for MemoryConnector {
    fn create(&self, uri: &str, events: EventSink) -> Result<Box<dyn Transport>> {
        let mut state = lock(&self.state);
        let shared = Arc::new(Shared {
            uri: uri.to_string(),
            connected: AtomicBool::new(false),
            started: AtomicBool::new(false),
            stopped: AtomicBool::new(false),
            sent: Mutex::new(Vec::new()),
            send_delay: Mutex::new(state.send_delay),
        });
        let remote = MemoryRemote {
            shared: Arc::clone(&shared),
            events: events.clone(),
        };
        state.remotes.push(remote);

        Ok(Box::new(MemoryTransport {
            shared,
            events,
            connector: Arc::clone(&self.state),
        }))
    }
}

#[derive(Debug)]
struct Shared {
    uri: String,
    connected: AtomicBool,
    started: AtomicBool,
    stopped: AtomicBool,
    sent: Mutex<Vec<Bytes>>,
    send_delay: Mutex<Duration>,
}

/// Device-side handle of an in-memory link.
pub struct MemoryTransport {
    shared: Arc<Shared>,
    events: EventSink,
    connector: Arc<Mutex<ConnectorState>>,
}

#[async_trait]
impl Transport for MemoryTransport {
    fn start(&mut self) -> Result<()> {
        let (fail, auto) = {
            let mut state = lock(&self.connector);
            (std::mem::take(&mut state.fail_next_start), state.connect_on_start)
        };
        if fail {
            return Err(TransportError::Connect {
                addr: self.shared.uri.clone(),
                source: std::io::Error::from(std::io::ErrorKind::ConnectionRefused),
            });
        }
        if self.shared.started.swap(true, Ordering::SeqCst) {
            return Err(TransportError::AlreadyStarted);
        }
        if auto {
            self.shared.connected.store(true, Ordering::SeqCst);
            self.events.emit(TransportEvent::Connected);
        }
        Ok(())
    }

    async fn stop(&mut self) {
        self.shared.connected.store(false, Ordering::SeqCst);
        self.shared.stopped.store(true, Ordering::SeqCst);
        debug!(uri = %self.shared.uri, "memory transport stopped");
    }

    async fn send_binary(&mut self, frame: Bytes, timeout: Duration) -> Result<()> {
        if !self.shared.connected.load(Ordering::SeqCst) {
            return Err(TransportError::NotConnected);
        }
        let delay = *lock(&self.shared.send_delay);
        if !delay.is_zero() {
            if delay > timeout {
                tokio::time::sleep(timeout).await;
                return Err(TransportError::SendTimeout(timeout));
            }
            tokio::time::sleep(delay).await;
        }
        lock(&self.shared.sent).push(frame);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.shared.connected.load(Ordering::SeqCst)
    }

    fn uri(&self) -> &str {
        &self.shared.uri
    }
}

/// Controller-side handle of an in-memory link.
#[derive(Debug, Clone)]
pub struct MemoryRemote {
    shared: Arc<Shared>,
    events: EventSink,
}

impl MemoryRemote {
    /// Endpoint the transport was created for.
    pub fn uri(&self) -> &str {
        &self.shared.uri
    }

    /// Generation of the transport this remote belongs to.
    pub fn generation(&self) -> u64 {
        self.events.generation()
    }

    /// Bring the link up and raise `Connected`.
    pub fn accept(&self) {
        self.shared.connected.store(true, Ordering::SeqCst);
        self.events.emit(TransportEvent::Connected);
    }

    /// Drop the link and raise `Disconnected`.
    pub fn disconnect(&self) {
        self.shared.connected.store(false, Ordering::SeqCst);
        self.events.emit(TransportEvent::Disconnected);
    }

    /// Fail the link and raise `Error`.
    pub fn fail(&self, reason: &str) {
        self.shared.connected.store(false, Ordering::SeqCst);
        self.events.emit(TransportEvent::Error(reason.to_string()));
    }

    /// Deliver one inbound frame to the device.
    pub fn deliver(&self, frame: impl Into<Bytes>) {
        self.events.emit(TransportEvent::Data(frame.into()));
    }

    /// Delay subsequent sends on this link.
    pub fn set_send_delay(&self, delay: Duration) {
        *lock(&self.shared.send_delay) = delay;
    }

    /// Frames the device has sent so far.
    pub fn sent(&self) -> Vec<Bytes> {
        lock(&self.shared.sent).clone()
    }

    /// Remove and return the frames sent so far.
    pub fn take_sent(&self) -> Vec<Bytes> {
        std::mem::take(&mut *lock(&self.shared.sent))
    }

    /// Whether the device started this transport.
    pub fn is_started(&self) -> bool {
        self.shared.started.load(Ordering::SeqCst)
    }

    /// Whether the device stopped this transport.
    pub fn is_stopped(&self) -> bool {
        self.shared.stopped.load(Ordering::SeqCst)
    }
}
