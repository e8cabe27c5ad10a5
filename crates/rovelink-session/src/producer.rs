//! Outbound camera stream.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::BytesMut;
use rovelink_frame::encode_camera_chunk;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, trace};

use crate::camera::CameraSwitch;
use crate::error::SessionError;
use crate::session::Session;

/// Frame rates measured over one window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameRates {
    pub captured_fps: u8,
    pub sent_fps: u8,
}

/// Counts captured and sent frames over a fixed window.
#[derive(Debug)]
pub struct FpsWindow {
    window: Duration,
    started: Instant,
    captured: u32,
    sent: u32,
}

impl FpsWindow {
    pub fn new(window: Duration, now: Instant) -> Self {
        Self {
            window,
            started: now,
            captured: 0,
            sent: 0,
        }
    }

    pub fn record_capture(&mut self) {
        self.captured = self.captured.saturating_add(1);
    }

    pub fn record_sent(&mut self) {
        self.sent = self.sent.saturating_add(1);
    }

    /// Close the window if it has elapsed, returning its rates and
    /// starting a new one.
    pub fn poll(&mut self, now: Instant) -> Option<FrameRates> {
        if now.duration_since(self.started) < self.window {
            return None;
        }
        let secs = u32::try_from(self.window.as_secs().max(1)).unwrap_or(u32::MAX);
        let rate = |count: u32| u8::try_from(count / secs).unwrap_or(u8::MAX);
        let rates = FrameRates {
            captured_fps: rate(self.captured),
            sent_fps: rate(self.sent),
        };
        self.started = now;
        self.captured = 0;
        self.sent = 0;
        Some(rates)
    }
}

/// Captures camera frames and streams them as camera chunks.
///
/// Delivery is best effort: a frame whose send cannot get the session lock
/// within `lock_wait` is dropped.
pub struct FrameProducer {
    session: Arc<Session>,
    camera: Arc<CameraSwitch>,
    camera_fps: Arc<AtomicU8>,
    period: Duration,
    lock_wait: Duration,
    window: FpsWindow,
    buf: BytesMut,
}

impl FrameProducer {
    pub fn new(
        session: Arc<Session>,
        camera: Arc<CameraSwitch>,
        camera_fps: Arc<AtomicU8>,
        period: Duration,
        lock_wait: Duration,
        fps_window: Duration,
    ) -> Self {
        Self {
            session,
            camera,
            camera_fps,
            period,
            lock_wait,
            window: FpsWindow::new(fps_window, Instant::now()),
            buf: BytesMut::new(),
        }
    }

    /// Run until the task is aborted.
    pub async fn run(mut self) {
        let mut ticker = tokio::time::interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            self.step().await;
        }
    }

    /// One producer cycle.
    pub async fn step(&mut self) {
        tokio::task::yield_now().await;

        if self.camera.is_enabled() && self.session.is_connected() {
            self.capture_and_send().await;
        }

        if let Some(rates) = self.window.poll(Instant::now()) {
            self.camera_fps.store(rates.captured_fps, Ordering::Relaxed);
            info!(
                captured_fps = rates.captured_fps,
                sent_fps = rates.sent_fps,
                "camera frame rates"
            );
        }
    }

    async fn capture_and_send(&mut self) {
        let frame = match self.camera.capture() {
            Ok(Some(frame)) => frame,
            Ok(None) => return,
            Err(err) => {
                debug!(error = %err, "capture failed, skipping frame");
                return;
            }
        };
        self.window.record_capture();

        self.buf.clear();
        if let Err(err) = encode_camera_chunk(&mut self.buf, &frame) {
            debug!(error = %err, "skipping oversize frame");
            return;
        }
        let chunk = self.buf.split().freeze();

        match self.session.send_timeout(chunk, self.lock_wait).await {
            Ok(()) => self.window.record_sent(),
            Err(SessionError::LockTimeout(_)) => trace!("session busy, frame dropped"),
            Err(err) => debug!(error = %err, "frame send failed"),
        }
    }
}
