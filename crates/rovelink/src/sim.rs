//! Stand-ins for device hardware.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU32, AtomicU8, Ordering};
use std::sync::Mutex;

use bytes::{BufMut, Bytes, BytesMut};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rovelink_session::{Camera, CameraError, DigitalOutput, MotorError, Sensors};
use tracing::{debug, trace};

/// Camera producing numbered placeholder frames of a fixed size.
///
/// Each frame starts with the JPEG start-of-image marker followed by a
/// big-endian frame counter.
#[derive(Debug)]
pub struct SyntheticCamera {
    frame_len: usize,
    sequence: u32,
    running: bool,
}

impl SyntheticCamera {
    pub fn new(frame_len: usize) -> Self {
        Self {
            frame_len,
            sequence: 0,
            running: false,
        }
    }
}

impl Camera for SyntheticCamera {
    fn init(&mut self) -> Result<(), CameraError> {
        self.running = true;
        debug!(frame_len = self.frame_len, "synthetic camera started");
        Ok(())
    }

    fn stop(&mut self) {
        self.running = false;
        debug!("synthetic camera stopped");
    }

    fn capture(&mut self) -> Result<Option<Bytes>, CameraError> {
        if !self.running {
            return Err(CameraError::Capture("camera not initialized".to_string()));
        }
        self.sequence = self.sequence.wrapping_add(1);
        let mut frame = BytesMut::with_capacity(self.frame_len.max(6));
        frame.put_slice(&[0xFF, 0xD8]);
        frame.put_u32(self.sequence);
        frame.resize(self.frame_len.max(6), 0);
        frame.truncate(self.frame_len);
        Ok(Some(frame.freeze()))
    }
}

/// GPIO bank that only logs and remembers pin levels.
#[derive(Debug, Default)]
pub struct LoggingOutput {
    levels: BTreeMap<u8, bool>,
}

impl LoggingOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn level(&self, pin: u8) -> Option<bool> {
        self.levels.get(&pin).copied()
    }
}

impl DigitalOutput for LoggingOutput {
    fn set_level(&mut self, pin: u8, high: bool) -> Result<(), MotorError> {
        trace!(pin, high, "gpio set");
        self.levels.insert(pin, high);
        Ok(())
    }
}

/// Battery that drains by one on every read, and a random range finder.
#[derive(Debug)]
pub struct SimulatedSensors {
    battery: AtomicU8,
    last_distance: AtomicU8,
    reads: AtomicU32,
    rng: Mutex<StdRng>,
}

impl SimulatedSensors {
    /// Sensors starting at `battery`, with a randomly seeded range finder.
    pub fn new(battery: u8) -> Self {
        Self::with_rng(battery, StdRng::from_entropy())
    }

    /// Deterministic sensors for tests and demos.
    pub fn seeded(battery: u8, seed: u64) -> Self {
        Self::with_rng(battery, StdRng::seed_from_u64(seed))
    }

    fn with_rng(battery: u8, rng: StdRng) -> Self {
        Self {
            battery: AtomicU8::new(battery),
            last_distance: AtomicU8::new(60),
            reads: AtomicU32::new(0),
            rng: Mutex::new(rng),
        }
    }

    /// Distance returned by the latest read.
    pub fn last_distance(&self) -> u8 {
        self.last_distance.load(Ordering::Relaxed)
    }

    /// Number of battery reads so far.
    pub fn reads(&self) -> u32 {
        self.reads.load(Ordering::Relaxed)
    }
}

impl Default for SimulatedSensors {
    fn default() -> Self {
        Self::new(100)
    }
}

impl Sensors for SimulatedSensors {
    fn battery_level(&self) -> u8 {
        self.reads.fetch_add(1, Ordering::Relaxed);
        let previous = self
            .battery
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |level| {
                Some(level.saturating_sub(1))
            })
            .unwrap_or_default();
        previous.saturating_sub(1)
    }

    fn forward_distance(&self) -> u8 {
        let distance = self
            .rng
            .lock()
            .map(|mut rng| rng.gen::<u8>())
            .unwrap_or_else(|poisoned| poisoned.into_inner().gen::<u8>());
        self.last_distance.store(distance, Ordering::Relaxed);
        distance
    }
}
