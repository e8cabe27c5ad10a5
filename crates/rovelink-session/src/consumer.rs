//! Control loop: reconnect requests, telemetry and the watchdog.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use rovelink_frame::{Message, Telemetry};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::control::{ControlEvent, ControlQueue};
use crate::error::SessionError;
use crate::motor::MotorActuator;
use crate::sensors::Sensors;
use crate::session::Session;

/// Fires at most once per period.
#[derive(Debug)]
pub struct IntervalTimer {
    period: Duration,
    last: Instant,
}

impl IntervalTimer {
    pub fn new(period: Duration, now: Instant) -> Self {
        Self { period, last: now }
    }

    /// Whether a full period has passed since the last firing. Firing
    /// restarts the period at `now`.
    pub fn due(&mut self, now: Instant) -> bool {
        if now.saturating_duration_since(self.last) >= self.period {
            self.last = now;
            true
        } else {
            false
        }
    }
}

/// Current telemetry snapshot.
pub fn telemetry_snapshot(motors: &MotorActuator, sensors: &dyn Sensors, camera_fps: u8) -> Telemetry {
    let (motor1, motor2) = motors.states();
    Telemetry {
        motor1,
        motor2,
        battery: sensors.battery_level(),
        distance: sensors.forward_distance(),
        camera_fps,
    }
}

/// The command-side task of the link.
pub struct CommandConsumer {
    session: Arc<Session>,
    control: Arc<ControlQueue>,
    motors: Arc<MotorActuator>,
    sensors: Arc<dyn Sensors>,
    camera_fps: Arc<AtomicU8>,
    period: Duration,
    send_lock_wait: Duration,
    telemetry: IntervalTimer,
    watchdog: IntervalTimer,
}

impl CommandConsumer {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        session: Arc<Session>,
        control: Arc<ControlQueue>,
        motors: Arc<MotorActuator>,
        sensors: Arc<dyn Sensors>,
        camera_fps: Arc<AtomicU8>,
        period: Duration,
        telemetry_interval: Duration,
        watchdog_interval: Duration,
        send_lock_wait: Duration,
    ) -> Self {
        let now = Instant::now();
        Self {
            session,
            control,
            motors,
            sensors,
            camera_fps,
            period,
            send_lock_wait,
            telemetry: IntervalTimer::new(telemetry_interval, now),
            watchdog: IntervalTimer::new(watchdog_interval, now),
        }
    }

    /// Run until the task is aborted.
    pub async fn run(mut self) {
        loop {
            self.step(Instant::now()).await;
            tokio::time::sleep(self.period).await;
        }
    }

    /// One consumer cycle at time `now`.
    pub async fn step(&mut self, now: Instant) {
        if let Some(event) = self.control.try_recv() {
            self.handle_control(event).await;
        }

        if self.telemetry.due(now) && self.session.is_connected() {
            self.send_telemetry().await;
        }

        if self.watchdog.due(now) && !self.session.is_connected() {
            info!(state = %self.session.state(), "watchdog: session down, requesting reconnect");
            self.control.overwrite(ControlEvent::ReconnectRequested);
        }
    }

    async fn handle_control(&self, event: ControlEvent) {
        match event {
            ControlEvent::ReconnectRequested => {
                debug!("reconnecting session");
                self.session.stop().await;
                match self.session.connect().await {
                    Ok(()) => {}
                    Err(SessionError::NoEndpoint) => {
                        warn!("no endpoint configured, staying offline");
                    }
                    Err(err) => warn!(error = %err, "reconnect failed"),
                }
            }
        }
    }

    async fn send_telemetry(&self) {
        let telemetry = telemetry_snapshot(
            &self.motors,
            self.sensors.as_ref(),
            self.camera_fps.load(Ordering::Relaxed),
        );
        match self
            .session
            .send_message_timeout(&Message::Telemetry(telemetry), self.send_lock_wait)
            .await
        {
            Ok(()) => debug!(?telemetry, "telemetry sent"),
            Err(err) => debug!(error = %err, "telemetry not sent"),
        }
    }
}
