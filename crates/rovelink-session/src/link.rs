//! The assembled device link and its task runtime.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use rovelink_frame::{Message, MotorId, MotorState};
use rovelink_transport::{Connector, EventStream};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::camera::{Camera, CameraSwitch};
use crate::consumer::{telemetry_snapshot, CommandConsumer};
use crate::control::{ControlQueue, DEFAULT_CONTROL_CAPACITY};
use crate::dispatch::dispatch_frame;
use crate::error::{MotorError, Result, SessionError};
use crate::motor::{DigitalOutput, MotorActuator};
use crate::producer::FrameProducer;
use crate::sensors::Sensors;
use crate::session::{Session, SessionState, DEFAULT_WRITE_TIMEOUT};
use crate::store::ConfigStore;

/// Timing and sizing of the link tasks.
#[derive(Debug, Clone)]
pub struct LinkConfig {
    /// Camera capture period. Default: 100 ms.
    pub frame_period: Duration,
    /// Command loop delay. Default: 10 ms.
    pub command_period: Duration,
    /// Telemetry period while connected. Default: 1 s.
    pub telemetry_interval: Duration,
    /// Reconnect check period while not connected. Default: 10 s.
    pub watchdog_interval: Duration,
    /// Frame rate measurement window. Default: 5 s.
    pub fps_window: Duration,
    /// Longest a camera chunk waits for the session lock. Default: 100 ms.
    pub frame_lock_wait: Duration,
    /// Longest telemetry and sensor reports wait for the session lock.
    /// Default: 100 ms.
    pub send_lock_wait: Duration,
    /// Deadline for one transport write. Default: 1 s.
    pub write_timeout: Duration,
    /// Pending control events. Default: 2.
    pub control_capacity: usize,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            frame_period: Duration::from_millis(100),
            command_period: Duration::from_millis(10),
            telemetry_interval: Duration::from_secs(1),
            watchdog_interval: Duration::from_secs(10),
            fps_window: Duration::from_secs(5),
            frame_lock_wait: Duration::from_millis(100),
            send_lock_wait: Duration::from_millis(100),
            write_timeout: DEFAULT_WRITE_TIMEOUT,
            control_capacity: DEFAULT_CONTROL_CAPACITY,
        }
    }
}

/// Device link: session, motors, camera and the tasks that drive them.
pub struct Link {
    config: LinkConfig,
    session: Arc<Session>,
    control: Arc<ControlQueue>,
    motors: Arc<MotorActuator>,
    camera: Arc<CameraSwitch>,
    sensors: Arc<dyn Sensors>,
    camera_fps: Arc<AtomicU8>,
    events: Option<EventStream>,
    tasks: Vec<JoinHandle<()>>,
}

impl Link {
    /// Initialize motors and camera. Nothing runs until [`start`](Self::start).
    pub fn new(
        config: LinkConfig,
        store: Arc<dyn ConfigStore>,
        connector: Arc<dyn Connector>,
        output: Box<dyn DigitalOutput>,
        camera: Box<dyn Camera>,
        sensors: Arc<dyn Sensors>,
    ) -> Result<Self> {
        let motors = MotorActuator::init(store.as_ref(), output)?;
        let camera = CameraSwitch::new(camera);
        camera.boot();
        let (session, events) = Session::new(store, connector, config.write_timeout);

        Ok(Self {
            control: Arc::new(ControlQueue::new(config.control_capacity)),
            config,
            session: Arc::new(session),
            motors: Arc::new(motors),
            camera: Arc::new(camera),
            sensors,
            camera_fps: Arc::new(AtomicU8::new(0)),
            events: Some(events),
            tasks: Vec::new(),
        })
    }

    /// Spawn the link tasks and make the first connection attempt.
    ///
    /// A missing endpoint is not an error: the session stays idle.
    pub async fn start(&mut self) -> Result<()> {
        let mut events = self.events.take().ok_or(SessionError::AlreadyRunning)?;

        let session = Arc::clone(&self.session);
        let control = Arc::clone(&self.control);
        let motors = Arc::clone(&self.motors);
        let camera = Arc::clone(&self.camera);
        self.tasks.push(tokio::spawn(async move {
            while let Some(tagged) = events.recv().await {
                if let Some(frame) = session.handle_event(tagged, &control) {
                    let outcome = dispatch_frame(&frame, &motors, &camera);
                    debug!(?outcome, "inbound frame");
                }
            }
        }));

        let producer = FrameProducer::new(
            Arc::clone(&self.session),
            Arc::clone(&self.camera),
            Arc::clone(&self.camera_fps),
            self.config.frame_period,
            self.config.frame_lock_wait,
            self.config.fps_window,
        );
        self.tasks.push(tokio::spawn(producer.run()));

        let consumer = CommandConsumer::new(
            Arc::clone(&self.session),
            Arc::clone(&self.control),
            Arc::clone(&self.motors),
            Arc::clone(&self.sensors),
            Arc::clone(&self.camera_fps),
            self.config.command_period,
            self.config.telemetry_interval,
            self.config.watchdog_interval,
            self.config.send_lock_wait,
        );
        self.tasks.push(tokio::spawn(consumer.run()));

        match self.session.connect().await {
            Ok(()) => {}
            Err(SessionError::NoEndpoint) => warn!("no endpoint configured, session idle"),
            Err(err) => warn!(error = %err, "initial connect failed, watchdog will retry"),
        }
        info!(state = %self.session.state(), "link started");
        Ok(())
    }

    /// Stop the session, then abort the link tasks.
    pub async fn shutdown(&mut self) {
        self.session.stop().await;
        for task in self.tasks.drain(..) {
            task.abort();
            let _ = task.await;
        }
        info!("link shut down");
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    pub fn state(&self) -> SessionState {
        self.session.state()
    }

    pub fn is_connected(&self) -> bool {
        self.session.is_connected()
    }

    /// Camera frames captured per second over the last window.
    pub fn camera_fps(&self) -> u8 {
        self.camera_fps.load(Ordering::Relaxed)
    }

    /// Turn the camera on or off. Returns whether it ended up enabled.
    pub fn set_camera_state(&self, on: bool) -> bool {
        self.camera.set(on)
    }

    pub fn camera_enabled(&self) -> bool {
        self.camera.is_enabled()
    }

    pub async fn send_distance_reading(&self, forward_cm: u8) -> Result<()> {
        self.session
            .send_message_timeout(&Message::DistanceReading(forward_cm), self.config.send_lock_wait)
            .await
    }

    pub async fn send_battery_level(&self, level: u8) -> Result<()> {
        self.session
            .send_message_timeout(&Message::BatteryLevel(level), self.config.send_lock_wait)
            .await
    }

    /// Send a telemetry snapshot now.
    pub async fn send_status_response(&self) -> Result<()> {
        let telemetry = telemetry_snapshot(&self.motors, self.sensors.as_ref(), self.camera_fps());
        self.session
            .send_message_timeout(&Message::Telemetry(telemetry), self.config.send_lock_wait)
            .await
    }

    pub fn motor_set(&self, motor: MotorId, state: MotorState) -> std::result::Result<(), MotorError> {
        self.motors.set(motor, state)
    }

    pub fn motor_get(&self, motor: MotorId) -> MotorState {
        self.motors.get(motor)
    }

    pub fn motor_forward(&self) -> std::result::Result<(), MotorError> {
        self.motors.forward()
    }

    pub fn motor_backward(&self) -> std::result::Result<(), MotorError> {
        self.motors.backward()
    }

    pub fn motor_brake(&self) -> std::result::Result<(), MotorError> {
        self.motors.brake()
    }

    pub fn motor_off(&self) -> std::result::Result<(), MotorError> {
        self.motors.off()
    }

    pub fn motors(&self) -> &MotorActuator {
        &self.motors
    }
}

impl Drop for Link {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}
