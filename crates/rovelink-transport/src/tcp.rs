use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::StreamExt;
use rovelink_frame::{LinkCodec, DEFAULT_MAX_FRAME};
use tokio::io::AsyncWriteExt;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::codec::FramedRead;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

use crate::error::{Result, TransportError};
use crate::event::{EventSink, TransportEvent};
use crate::traits::{Connector, Transport};

/// Configuration for socket transports.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Deadline for establishing the connection. Default: 10 s.
    pub connect_timeout: Duration,
    /// Largest inbound frame accepted, header included.
    pub max_frame: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            max_frame: DEFAULT_MAX_FRAME,
        }
    }
}

/// Creates [`TcpTransport`] handles from `tcp://host:port` URIs.
#[derive(Debug, Clone, Default)]
pub struct TcpConnector {
    config: TransportConfig,
}

impl TcpConnector {
    /// Create a connector with explicit configuration.
    pub fn with_config(config: TransportConfig) -> Self {
        Self { config }
    }
}

impl Connector for TcpConnector {
    fn create(&self, uri: &str, events: EventSink) -> Result<Box<dyn Transport>> {
        Ok(Box::new(TcpTransport::new(uri, self.config.clone(), events)?))
    }
}

/// Resolve a `tcp://host:port` URI into a socket address string.
pub fn socket_addr(uri: &str) -> Result<String> {
    let parsed = Url::parse(uri).map_err(|err| TransportError::InvalidUri {
        uri: uri.to_string(),
        reason: err.to_string(),
    })?;
    if parsed.scheme() != "tcp" {
        return Err(TransportError::UnsupportedScheme(parsed.scheme().to_string()));
    }
    let host = parsed
        .host_str()
        .ok_or_else(|| TransportError::InvalidUri {
            uri: uri.to_string(),
            reason: "missing host".to_string(),
        })?;
    let port = parsed.port().ok_or_else(|| TransportError::InvalidUri {
        uri: uri.to_string(),
        reason: "missing port".to_string(),
    })?;
    Ok(format!("{host}:{port}"))
}

/// TCP stream transport.
///
/// A background task owns the read half and turns inbound frames into
/// `Data` events; the write half sits behind an async mutex for senders.
pub struct TcpTransport {
    uri: String,
    addr: String,
    config: TransportConfig,
    events: EventSink,
    writer: Arc<Mutex<Option<OwnedWriteHalf>>>,
    connected: Arc<AtomicBool>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl TcpTransport {
    /// Create an unstarted handle for `uri`.
    pub fn new(uri: &str, config: TransportConfig, events: EventSink) -> Result<Self> {
        let addr = socket_addr(uri)?;
        Ok(Self {
            uri: uri.to_string(),
            addr,
            config,
            events,
            writer: Arc::new(Mutex::new(None)),
            connected: Arc::new(AtomicBool::new(false)),
            cancel: CancellationToken::new(),
            task: None,
        })
    }
}

#[async_trait]
impl Transport for TcpTransport {
    fn start(&mut self) -> Result<()> {
        if self.task.is_some() {
            return Err(TransportError::AlreadyStarted);
        }
        let worker = Worker {
            addr: self.addr.clone(),
            config: self.config.clone(),
            events: self.events.clone(),
            writer: Arc::clone(&self.writer),
            connected: Arc::clone(&self.connected),
            cancel: self.cancel.clone(),
        };
        self.task = Some(tokio::spawn(worker.run()));
        debug!(addr = %self.addr, "tcp transport started");
        Ok(())
    }

    async fn stop(&mut self) {
        self.cancel.cancel();
        self.connected.store(false, Ordering::SeqCst);
        if let Some(mut writer) = self.writer.lock().await.take() {
            let _ = writer.shutdown().await;
        }
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
        debug!(addr = %self.addr, "tcp transport stopped");
    }

    async fn send_binary(&mut self, frame: Bytes, timeout: Duration) -> Result<()> {
        if !self.connected.load(Ordering::SeqCst) {
            return Err(TransportError::NotConnected);
        }
        let mut guard = self.writer.lock().await;
        let writer = guard.as_mut().ok_or(TransportError::NotConnected)?;
        match tokio::time::timeout(timeout, writer.write_all(&frame)).await {
            Ok(result) => result.map_err(TransportError::Io),
            Err(_) => Err(TransportError::SendTimeout(timeout)),
        }
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn uri(&self) -> &str {
        &self.uri
    }
}

impl Drop for TcpTransport {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

struct Worker {
    addr: String,
    config: TransportConfig,
    events: EventSink,
    writer: Arc<Mutex<Option<OwnedWriteHalf>>>,
    connected: Arc<AtomicBool>,
    cancel: CancellationToken,
}

impl Worker {
    async fn run(self) {
        let connect = tokio::time::timeout(self.config.connect_timeout, TcpStream::connect(&self.addr));
        let stream = tokio::select! {
            _ = self.cancel.cancelled() => return,
            result = connect => match result {
                Ok(Ok(stream)) => stream,
                Ok(Err(err)) => {
                    warn!(addr = %self.addr, error = %err, "tcp connect failed");
                    self.events.emit(TransportEvent::Error(err.to_string()));
                    return;
                }
                Err(_) => {
                    warn!(addr = %self.addr, "tcp connect timed out");
                    self.events.emit(TransportEvent::Error(format!(
                        "connect timed out after {:?}",
                        self.config.connect_timeout
                    )));
                    return;
                }
            },
        };

        let _ = stream.set_nodelay(true);
        let (read_half, write_half) = stream.into_split();
        *self.writer.lock().await = Some(write_half);
        self.connected.store(true, Ordering::SeqCst);
        info!(addr = %self.addr, "tcp transport connected");
        self.events.emit(TransportEvent::Connected);

        let mut frames = FramedRead::new(read_half, LinkCodec::with_max_frame(self.config.max_frame));
        let failure = loop {
            tokio::select! {
                _ = self.cancel.cancelled() => return,
                next = frames.next() => match next {
                    Some(Ok(frame)) => {
                        self.events.emit(TransportEvent::Data(frame));
                    }
                    Some(Err(err)) => break Some(err.to_string()),
                    None => break None,
                },
            }
        };

        self.connected.store(false, Ordering::SeqCst);
        self.writer.lock().await.take();
        match failure {
            Some(reason) => {
                warn!(addr = %self.addr, error = %reason, "tcp transport failed");
                self.events.emit(TransportEvent::Error(reason));
            }
            None => {
                info!(addr = %self.addr, "tcp transport closed by peer");
                self.events.emit(TransportEvent::Disconnected);
            }
        }
    }
}
