//! Ownership of the single controller connection.
//!
//! ```text
//! Idle --connect--> Connecting --Connected--> Connected
//!                       ^                         |
//!                       |                   error / close
//!                  reconnect                      v
//!                       +---------------- Disconnected
//! ```
//!
//! The transport handle lives behind one async mutex and nothing outside
//! this module touches it. Lifecycle state and the current handle
//! generation share a small lock of their own, so readers never contend
//! with senders and an event is checked and applied in one step.

use std::sync::{Arc, Mutex as StdMutex, MutexGuard, PoisonError};
use std::time::Duration;

use bytes::Bytes;
use rovelink_frame::Message;
use rovelink_transport::{
    event_channel, Connector, EventHub, EventStream, TaggedEvent, Transport, TransportEvent,
};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::control::{ControlEvent, ControlQueue};
use crate::error::{Result, SessionError};
use crate::settings;
use crate::store::ConfigStore;

/// Default deadline for one transport write.
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_secs(1);

/// Connection lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SessionState {
    Idle = 0,
    Connecting = 1,
    Connected = 2,
    Disconnected = 3,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => f.write_str("idle"),
            Self::Connecting => f.write_str("connecting"),
            Self::Connected => f.write_str("connected"),
            Self::Disconnected => f.write_str("disconnected"),
        }
    }
}

/// Generation of the live handle (0 when none) and the recorded state.
#[derive(Debug)]
struct Lifecycle {
    generation: u64,
    state: SessionState,
}

impl Lifecycle {
    fn set_state(&mut self, state: SessionState) {
        if self.state != state {
            debug!(from = %self.state, to = %state, "session state changed");
            self.state = state;
        }
    }
}

struct Handle {
    transport: Box<dyn Transport>,
    generation: u64,
}

/// The device's connection to its controller.
pub struct Session {
    store: Arc<dyn ConfigStore>,
    connector: Arc<dyn Connector>,
    events: EventHub,
    handle: Mutex<Option<Handle>>,
    lifecycle: StdMutex<Lifecycle>,
    write_timeout: Duration,
}

impl Session {
    /// Create an idle session. Transport events for every handle this
    /// session creates arrive on the returned stream.
    pub fn new(
        store: Arc<dyn ConfigStore>,
        connector: Arc<dyn Connector>,
        write_timeout: Duration,
    ) -> (Self, EventStream) {
        let (events, stream) = event_channel();
        let session = Self {
            store,
            connector,
            events,
            handle: Mutex::new(None),
            lifecycle: StdMutex::new(Lifecycle {
                generation: 0,
                state: SessionState::Idle,
            }),
            write_timeout,
        };
        (session, stream)
    }

    pub fn state(&self) -> SessionState {
        self.lifecycle().state
    }

    pub fn is_connected(&self) -> bool {
        self.state() == SessionState::Connected
    }

    fn lifecycle(&self) -> MutexGuard<'_, Lifecycle> {
        self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Retire the current generation and record `state`.
    fn retire(&self, state: SessionState) {
        let mut lifecycle = self.lifecycle();
        lifecycle.generation = 0;
        lifecycle.set_state(state);
    }

    /// Connect to the endpoint stored in the config store.
    ///
    /// Any existing handle is stopped and dropped first. Without a stored
    /// endpoint nothing is created and the state is left as it was.
    pub async fn connect(&self) -> Result<()> {
        let uri = settings::load_ws_uri(self.store.as_ref())?.ok_or(SessionError::NoEndpoint)?;

        let mut guard = self.handle.lock().await;
        if let Some(mut old) = guard.take() {
            self.lifecycle().generation = 0;
            old.transport.stop().await;
            debug!(
                uri = old.transport.uri(),
                generation = old.generation,
                "previous transport dropped"
            );
        }

        let sink = self.events.sink();
        let generation = sink.generation();
        let mut transport = match self.connector.create(&uri, sink) {
            Ok(transport) => transport,
            Err(err) => {
                self.retire(SessionState::Disconnected);
                return Err(err.into());
            }
        };

        {
            let mut lifecycle = self.lifecycle();
            lifecycle.generation = generation;
            lifecycle.set_state(SessionState::Connecting);
        }
        if let Err(err) = transport.start() {
            self.retire(SessionState::Disconnected);
            return Err(err.into());
        }

        info!(uri = %uri, generation, "session connecting");
        *guard = Some(Handle {
            transport,
            generation,
        });
        Ok(())
    }

    /// Stop and drop the transport handle, if any.
    pub async fn stop(&self) {
        let mut guard = self.handle.lock().await;
        if let Some(mut handle) = guard.take() {
            self.retire(SessionState::Disconnected);
            handle.transport.stop().await;
            info!(
                uri = handle.transport.uri(),
                generation = handle.generation,
                "session stopped"
            );
        }
    }

    /// Send one frame, waiting as long as needed for the session lock.
    pub async fn send(&self, frame: Bytes) -> Result<()> {
        let mut guard = self.handle.lock().await;
        self.send_locked(&mut guard, frame).await
    }

    /// Send one frame, giving up if the session lock is not free within
    /// `wait`.
    pub async fn send_timeout(&self, frame: Bytes, wait: Duration) -> Result<()> {
        let mut guard = tokio::time::timeout(wait, self.handle.lock())
            .await
            .map_err(|_| SessionError::LockTimeout(wait))?;
        self.send_locked(&mut guard, frame).await
    }

    /// Encode and [`send`](Self::send) a message.
    pub async fn send_message(&self, message: &Message) -> Result<()> {
        self.send(message.to_bytes()?).await
    }

    /// Encode and [`send_timeout`](Self::send_timeout) a message.
    pub async fn send_message_timeout(&self, message: &Message, wait: Duration) -> Result<()> {
        self.send_timeout(message.to_bytes()?, wait).await
    }

    async fn send_locked(&self, handle: &mut Option<Handle>, frame: Bytes) -> Result<()> {
        let handle = handle.as_mut().ok_or(SessionError::NotConnected)?;
        if !handle.transport.is_connected() {
            return Err(SessionError::NotConnected);
        }
        handle
            .transport
            .send_binary(frame, self.write_timeout)
            .await?;
        Ok(())
    }

    /// Apply one transport event. Never waits on the transport.
    ///
    /// The generation check and the state change happen under the
    /// lifecycle lock, so an event from a retired handle cannot touch the
    /// state of its replacement. Returns the frame carried by a
    /// current-generation `Data` event for the caller to dispatch.
    pub fn handle_event(&self, tagged: TaggedEvent, control: &ControlQueue) -> Option<Bytes> {
        let mut lifecycle = self.lifecycle();
        let current = lifecycle.generation;
        if current == 0 || tagged.generation != current {
            debug!(
                generation = tagged.generation,
                current, "ignoring event from stale transport"
            );
            return None;
        }

        match tagged.event {
            TransportEvent::Connected => {
                lifecycle.set_state(SessionState::Connected);
                info!(generation = current, "session connected");
                None
            }
            TransportEvent::Data(frame) => Some(frame),
            TransportEvent::Disconnected => {
                lifecycle.set_state(SessionState::Disconnected);
                info!(generation = current, "session disconnected");
                self.request_reconnect(control);
                None
            }
            TransportEvent::Error(reason) => {
                lifecycle.set_state(SessionState::Disconnected);
                warn!(generation = current, %reason, "session transport error");
                self.request_reconnect(control);
                None
            }
        }
    }

    fn request_reconnect(&self, control: &ControlQueue) {
        if !control.try_push(ControlEvent::ReconnectRequested) {
            debug!("control queue full, reconnect request dropped");
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("lifecycle", &*self.lifecycle())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use rovelink_frame::Telemetry;
    use rovelink_transport::MemoryConnector;

    use super::*;
    use crate::store::MemoryStore;

    fn session_with(
        connector: &MemoryConnector,
        uri: Option<&str>,
    ) -> (Arc<Session>, EventStream) {
        let store = MemoryStore::new();
        if let Some(uri) = uri {
            settings::save_ws_uri(&store, uri).unwrap();
        }
        let (session, events) = Session::new(
            Arc::new(store),
            Arc::new(connector.clone()),
            Duration::from_secs(10),
        );
        (Arc::new(session), events)
    }

    fn pump(session: &Session, events: &mut EventStream, control: &ControlQueue) {
        while let Some(tagged) = events.try_recv() {
            session.handle_event(tagged, control);
        }
    }

    #[tokio::test]
    async fn connect_without_endpoint_stays_idle() {
        let connector = MemoryConnector::new();
        let (session, _events) = session_with(&connector, None);

        let err = session.connect().await.unwrap_err();
        assert!(matches!(err, SessionError::NoEndpoint));
        assert_eq!(session.state(), SessionState::Idle);
        assert_eq!(connector.created(), 0);
    }

    #[tokio::test]
    async fn connected_event_moves_to_connected() {
        let connector = MemoryConnector::new();
        let (session, mut events) = session_with(&connector, Some("mem://controller"));
        let control = ControlQueue::default();

        session.connect().await.unwrap();
        assert_eq!(session.state(), SessionState::Connecting);

        connector.last().unwrap().accept();
        pump(&session, &mut events, &control);
        assert!(session.is_connected());
        assert!(control.is_empty());
    }

    #[tokio::test]
    async fn send_reaches_transport() {
        let connector = MemoryConnector::auto_connect();
        let (session, mut events) = session_with(&connector, Some("mem://controller"));
        session.connect().await.unwrap();
        pump(&session, &mut events, &ControlQueue::default());

        let message = Message::Telemetry(Telemetry::default());
        session.send_message(&message).await.unwrap();
        let sent = connector.last().unwrap().sent();
        assert_eq!(sent, vec![message.to_bytes().unwrap()]);
    }

    #[tokio::test]
    async fn send_without_handle_is_not_connected() {
        let connector = MemoryConnector::new();
        let (session, _events) = session_with(&connector, None);
        let err = session.send(Bytes::from_static(&[7, 1, 0, 50])).await.unwrap_err();
        assert!(matches!(err, SessionError::NotConnected));
    }

    #[tokio::test]
    async fn disconnect_and_error_request_reconnect() {
        let connector = MemoryConnector::auto_connect();
        let (session, mut events) = session_with(&connector, Some("mem://controller"));
        let control = ControlQueue::default();
        session.connect().await.unwrap();
        pump(&session, &mut events, &control);

        let remote = connector.last().unwrap();
        remote.disconnect();
        remote.fail("reset by peer");
        remote.fail("reset by peer");
        pump(&session, &mut events, &control);

        assert_eq!(session.state(), SessionState::Disconnected);
        assert_eq!(control.len(), 2);
    }

    #[tokio::test]
    async fn reconnect_replaces_handle_and_ignores_stale_events() {
        let connector = MemoryConnector::auto_connect();
        let (session, mut events) = session_with(&connector, Some("mem://controller"));
        let control = ControlQueue::default();

        session.connect().await.unwrap();
        let first = connector.last().unwrap();
        session.connect().await.unwrap();
        let second = connector.last().unwrap();
        assert!(first.is_stopped());
        assert!(!second.is_stopped());
        assert_ne!(first.generation(), second.generation());

        pump(&session, &mut events, &control);
        first.disconnect();
        first.deliver(Bytes::from_static(&[3, 1, 0, 1]));
        pump(&session, &mut events, &control);

        assert!(session.is_connected());
        assert!(control.is_empty());
    }

    #[tokio::test]
    async fn event_read_before_reconnect_cannot_touch_new_handle() {
        let connector = MemoryConnector::auto_connect();
        let (session, mut events) = session_with(&connector, Some("mem://controller"));
        let control = ControlQueue::default();
        session.connect().await.unwrap();
        pump(&session, &mut events, &control);

        let first = connector.last().unwrap();
        first.disconnect();
        let in_flight = events.recv().await.unwrap();
        assert_eq!(in_flight.event, TransportEvent::Disconnected);

        session.stop().await;
        session.connect().await.unwrap();
        let connected = events.recv().await.unwrap();
        session.handle_event(connected, &control);
        assert!(session.is_connected());

        assert!(session.handle_event(in_flight, &control).is_none());
        assert!(session.is_connected());
        assert!(control.is_empty());
    }

    #[tokio::test]
    async fn events_after_stop_are_ignored() {
        let connector = MemoryConnector::auto_connect();
        let (session, mut events) = session_with(&connector, Some("mem://controller"));
        let control = ControlQueue::default();
        session.connect().await.unwrap();
        pump(&session, &mut events, &control);

        let remote = connector.last().unwrap();
        session.stop().await;
        remote.fail("late failure");
        pump(&session, &mut events, &control);

        assert_eq!(session.state(), SessionState::Disconnected);
        assert!(control.is_empty());
    }

    #[tokio::test]
    async fn send_on_dropped_link_is_not_connected() {
        let connector = MemoryConnector::auto_connect();
        let (session, mut events) = session_with(&connector, Some("mem://controller"));
        session.connect().await.unwrap();
        pump(&session, &mut events, &ControlQueue::default());

        let remote = connector.last().unwrap();
        remote.disconnect();
        let err = session.send(Bytes::from_static(&[7, 1, 0, 3])).await.unwrap_err();
        assert!(matches!(err, SessionError::NotConnected));
        assert!(remote.sent().is_empty());
    }

    #[tokio::test]
    async fn data_events_are_returned_for_dispatch() {
        let connector = MemoryConnector::auto_connect();
        let (session, mut events) = session_with(&connector, Some("mem://controller"));
        let control = ControlQueue::default();
        session.connect().await.unwrap();
        pump(&session, &mut events, &control);

        connector.last().unwrap().deliver(vec![3, 1, 0, 1]);
        let tagged = events.recv().await.unwrap();
        let frame = session.handle_event(tagged, &control);
        assert_eq!(frame.as_deref(), Some(&[3u8, 1, 0, 1][..]));
    }

    #[tokio::test]
    async fn stop_drops_handle() {
        let connector = MemoryConnector::auto_connect();
        let (session, mut events) = session_with(&connector, Some("mem://controller"));
        session.connect().await.unwrap();
        pump(&session, &mut events, &ControlQueue::default());

        session.stop().await;
        assert!(connector.last().unwrap().is_stopped());
        assert_eq!(session.state(), SessionState::Disconnected);
        let err = session.send(Bytes::from_static(&[8, 1, 0, 9])).await.unwrap_err();
        assert!(matches!(err, SessionError::NotConnected));
    }

    #[tokio::test]
    async fn failed_start_leaves_disconnected() {
        let connector = MemoryConnector::auto_connect();
        connector.fail_next_start();
        let (session, _events) = session_with(&connector, Some("mem://controller"));

        let err = session.connect().await.unwrap_err();
        assert!(matches!(err, SessionError::Transport(_)));
        assert_eq!(session.state(), SessionState::Disconnected);
    }

    #[tokio::test(start_paused = true)]
    async fn send_timeout_reports_lock_timeout() {
        let connector = MemoryConnector::auto_connect();
        let (session, mut events) = session_with(&connector, Some("mem://controller"));
        session.connect().await.unwrap();
        pump(&session, &mut events, &ControlQueue::default());
        connector.last().unwrap().set_send_delay(Duration::from_secs(5));

        let slow = Arc::clone(&session);
        let holder = tokio::spawn(async move { slow.send(Bytes::from_static(&[7, 1, 0, 1])).await });
        tokio::task::yield_now().await;

        let err = session
            .send_timeout(Bytes::from_static(&[7, 1, 0, 2]), Duration::from_millis(100))
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::LockTimeout(_)));

        holder.await.unwrap().unwrap();
        assert_eq!(connector.last().unwrap().sent().len(), 1);
    }
}
