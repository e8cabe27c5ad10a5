use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use bytes::Bytes;
use tracing::{info, warn};

use crate::error::CameraError;

/// Image sensor driver.
pub trait Camera: Send {
    /// Power up and configure the sensor.
    fn init(&mut self) -> Result<(), CameraError>;

    /// Power the sensor down.
    fn stop(&mut self);

    /// Capture one encoded frame. `Ok(None)` means no frame was ready.
    fn capture(&mut self) -> Result<Option<Bytes>, CameraError>;
}

/// Camera driver plus the enabled flag the frame producer reads.
pub struct CameraSwitch {
    enabled: AtomicBool,
    camera: Mutex<Box<dyn Camera>>,
}

impl CameraSwitch {
    /// Wrap `camera`, initially disabled.
    pub fn new(camera: Box<dyn Camera>) -> Self {
        Self {
            enabled: AtomicBool::new(false),
            camera: Mutex::new(camera),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Box<dyn Camera>> {
        self.camera.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Initialize the sensor at boot. Failure leaves the camera disabled.
    pub fn boot(&self) -> bool {
        self.set(true)
    }

    /// Turn the camera on or off. Returns the resulting enabled state.
    ///
    /// Only a change of state touches the sensor: turning on initializes
    /// it, and if that fails the flag stays off. Turning off stops it.
    pub fn set(&self, on: bool) -> bool {
        let mut camera = self.lock();
        if on == self.enabled.load(Ordering::SeqCst) {
            return on;
        }
        if on {
            match camera.init() {
                Ok(()) => {
                    self.enabled.store(true, Ordering::SeqCst);
                    info!("camera enabled");
                }
                Err(err) => {
                    warn!(error = %err, "camera init failed, camera disabled");
                }
            }
        } else {
            camera.stop();
            self.enabled.store(false, Ordering::SeqCst);
            info!("camera disabled");
        }
        self.enabled.load(Ordering::SeqCst)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    /// Capture a frame from the sensor.
    pub fn capture(&self) -> Result<Option<Bytes>, CameraError> {
        self.lock().capture()
    }
}

impl std::fmt::Debug for CameraSwitch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CameraSwitch")
            .field("enabled", &self.is_enabled())
            .finish_non_exhaustive()
    }
}
