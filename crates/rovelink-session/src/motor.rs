//! Dual H-bridge motor actuator.
//!
//! Each motor has two inputs, A and B:
//!
//! | state    | A | B |
//! |----------|---|---|
//! | Idle     | 0 | 0 |
//! | Forward  | 1 | 0 |
//! | Backward | 0 | 1 |
//! | Brake    | 1 | 1 |

use std::sync::{Mutex, MutexGuard, PoisonError};

use rovelink_frame::{MotorId, MotorState};
use tracing::{debug, warn};

use crate::error::MotorError;
use crate::settings::{self, MotorPins};
use crate::store::ConfigStore;

type Result<T> = std::result::Result<T, MotorError>;

/// A bank of digital output pins.
pub trait DigitalOutput: Send {
    /// Drive `pin` high or low.
    fn set_level(&mut self, pin: u8, high: bool) -> Result<()>;
}

/// `(A, B)` input levels for `state`.
pub fn pin_levels(state: MotorState) -> (bool, bool) {
    match state {
        MotorState::Idle => (false, false),
        MotorState::Forward => (true, false),
        MotorState::Backward => (false, true),
        MotorState::Brake => (true, true),
    }
}

struct Inner {
    output: Box<dyn DigitalOutput>,
    states: [MotorState; 2],
}

/// Drives both motors and remembers what each was last told to do.
pub struct MotorActuator {
    pins: MotorPins,
    inner: Mutex<Inner>,
}

impl MotorActuator {
    /// Read the pin assignment from `store` and drive every pin low.
    ///
    /// A store that cannot be read falls back to the default pins.
    pub fn init(store: &dyn ConfigStore, output: Box<dyn DigitalOutput>) -> Result<Self> {
        let pins = settings::load_motor_pins(store).unwrap_or_else(|err| {
            warn!(error = %err, "failed to read motor pins, using defaults");
            MotorPins::default()
        });
        Self::with_pins(pins, output)
    }

    /// Use an explicit pin assignment and drive every pin low.
    pub fn with_pins(pins: MotorPins, mut output: Box<dyn DigitalOutput>) -> Result<Self> {
        for pin in pins.all() {
            output.set_level(pin, false)?;
        }
        debug!(
            motor1a = pins.motor1a,
            motor1b = pins.motor1b,
            motor2a = pins.motor2a,
            motor2b = pins.motor2b,
            "motors initialized"
        );
        Ok(Self {
            pins,
            inner: Mutex::new(Inner {
                output,
                states: [MotorState::Idle; 2],
            }),
        })
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn pins(&self) -> MotorPins {
        self.pins
    }

    /// Command `motor` into `state`.
    ///
    /// The command is recorded before the pins are driven, so a failed pin
    /// write still leaves [`get`](Self::get) reporting what was commanded.
    pub fn set(&self, motor: MotorId, state: MotorState) -> Result<()> {
        let (pin_a, pin_b) = self.pins.pair(motor);
        let (level_a, level_b) = pin_levels(state);
        let mut inner = self.lock();
        inner.states[motor.index()] = state;
        inner.output.set_level(pin_a, level_a)?;
        inner.output.set_level(pin_b, level_b)?;
        debug!(%motor, %state, "motor set");
        Ok(())
    }

    /// Last commanded state of `motor`.
    pub fn get(&self, motor: MotorId) -> MotorState {
        self.lock().states[motor.index()]
    }

    /// Last commanded states of motor 1 and motor 2.
    pub fn states(&self) -> (MotorState, MotorState) {
        let states = self.lock().states;
        (states[0], states[1])
    }

    /// [`set`](Self::set) from wire bytes. Unknown bytes change nothing.
    pub fn set_raw(&self, motor: u8, state: u8) -> Result<()> {
        let motor = MotorId::try_from(motor).map_err(|_| MotorError::InvalidMotor(motor))?;
        let state = MotorState::try_from(state).map_err(|_| MotorError::InvalidState(state))?;
        self.set(motor, state)
    }

    /// [`get`](Self::get) from a wire motor byte.
    pub fn get_raw(&self, motor: u8) -> Result<MotorState> {
        let motor = MotorId::try_from(motor).map_err(|_| MotorError::InvalidMotor(motor))?;
        Ok(self.get(motor))
    }

    fn set_both(&self, state: MotorState) -> Result<()> {
        for motor in MotorId::ALL {
            self.set(motor, state)?;
        }
        Ok(())
    }

    pub fn forward(&self) -> Result<()> {
        self.set_both(MotorState::Forward)
    }

    pub fn backward(&self) -> Result<()> {
        self.set_both(MotorState::Backward)
    }

    pub fn brake(&self) -> Result<()> {
        self.set_both(MotorState::Brake)
    }

    pub fn off(&self) -> Result<()> {
        self.set_both(MotorState::Idle)
    }
}

impl std::fmt::Debug for MotorActuator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MotorActuator")
            .field("pins", &self.pins)
            .field("states", &self.lock().states)
            .finish()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::BTreeMap;
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::settings::MOTOR1A_KEY;
    use crate::store::MemoryStore;

    /// Output that remembers the current level of every pin.
    #[derive(Clone, Default)]
    pub(crate) struct PinBank {
        pub levels: Arc<Mutex<BTreeMap<u8, bool>>>,
        pub writes: Arc<Mutex<usize>>,
        pub broken_pin: Arc<Mutex<Option<u8>>>,
    }

    impl PinBank {
        pub fn level(&self, pin: u8) -> Option<bool> {
            self.levels.lock().unwrap().get(&pin).copied()
        }

        pub fn writes(&self) -> usize {
            *self.writes.lock().unwrap()
        }
    }

    impl DigitalOutput for PinBank {
        fn set_level(&mut self, pin: u8, high: bool) -> Result<()> {
            if *self.broken_pin.lock().unwrap() == Some(pin) {
                return Err(MotorError::Output {
                    pin,
                    reason: "open circuit".to_string(),
                });
            }
            self.levels.lock().unwrap().insert(pin, high);
            *self.writes.lock().unwrap() += 1;
            Ok(())
        }
    }

    struct BrokenOutput;

    impl DigitalOutput for BrokenOutput {
        fn set_level(&mut self, pin: u8, _high: bool) -> Result<()> {
            Err(MotorError::Output {
                pin,
                reason: "not wired".to_string(),
            })
        }
    }

    #[test]
    fn init_drives_pins_low_and_starts_idle() {
        let bank = PinBank::default();
        let motors = MotorActuator::init(&MemoryStore::new(), Box::new(bank.clone())).unwrap();

        for pin in [12, 13, 14, 15] {
            assert_eq!(bank.level(pin), Some(false));
        }
        assert_eq!(motors.states(), (MotorState::Idle, MotorState::Idle));
    }

    #[test]
    fn failed_pin_write_still_records_command() {
        let bank = PinBank::default();
        let motors = MotorActuator::with_pins(MotorPins::default(), Box::new(bank.clone())).unwrap();
        *bank.broken_pin.lock().unwrap() = Some(13);

        let err = motors.set(MotorId::Motor1, MotorState::Forward).unwrap_err();
        assert!(matches!(err, MotorError::Output { pin: 13, .. }));
        assert_eq!(motors.get(MotorId::Motor1), MotorState::Forward);
        assert_eq!(bank.level(12), Some(true));
        assert_eq!(motors.get(MotorId::Motor2), MotorState::Idle);
    }

    #[test]
    fn unreadable_store_falls_back_to_default_pins() {
        let store = MemoryStore::new();
        store.set_str(MOTOR1A_KEY, "oops").unwrap();
        let motors = MotorActuator::init(&store, Box::new(PinBank::default())).unwrap();
        assert_eq!(motors.pins(), MotorPins::default());
    }

    #[test]
    fn pin_table_holds_for_every_motor_and_state() {
        let bank = PinBank::default();
        let motors = MotorActuator::with_pins(MotorPins::default(), Box::new(bank.clone())).unwrap();

        for motor in MotorId::ALL {
            let (pin_a, pin_b) = motors.pins().pair(motor);
            for state in MotorState::ALL {
                motors.set(motor, state).unwrap();
                let expected = pin_levels(state);
                assert_eq!(
                    (bank.level(pin_a), bank.level(pin_b)),
                    (Some(expected.0), Some(expected.1)),
                    "{motor} {state}"
                );
                assert_eq!(motors.get(motor), state);
            }
        }
        assert_eq!(pin_levels(MotorState::Forward), (true, false));
        assert_eq!(pin_levels(MotorState::Backward), (false, true));
        assert_eq!(pin_levels(MotorState::Brake), (true, true));
    }

    #[test]
    fn set_raw_rejects_unknown_bytes_without_mutation() {
        let bank = PinBank::default();
        let motors = MotorActuator::with_pins(MotorPins::default(), Box::new(bank.clone())).unwrap();
        motors.set_raw(0, 1).unwrap();
        let writes = bank.writes();

        assert!(matches!(motors.set_raw(2, 1), Err(MotorError::InvalidMotor(2))));
        assert!(matches!(motors.set_raw(0, 4), Err(MotorError::InvalidState(4))));
        assert!(matches!(motors.get_raw(9), Err(MotorError::InvalidMotor(9))));
        assert_eq!(bank.writes(), writes);
        assert_eq!(motors.get_raw(0).unwrap(), MotorState::Forward);
    }

    #[test]
    fn both_motor_helpers() {
        let motors =
            MotorActuator::with_pins(MotorPins::default(), Box::new(PinBank::default())).unwrap();
        motors.forward().unwrap();
        assert_eq!(motors.states(), (MotorState::Forward, MotorState::Forward));
        motors.backward().unwrap();
        assert_eq!(motors.states(), (MotorState::Backward, MotorState::Backward));
        motors.brake().unwrap();
        assert_eq!(motors.states(), (MotorState::Brake, MotorState::Brake));
        motors.off().unwrap();
        assert_eq!(motors.states(), (MotorState::Idle, MotorState::Idle));
    }

    #[test]
    fn init_propagates_output_failure() {
        assert!(MotorActuator::with_pins(MotorPins::default(), Box::new(BrokenOutput)).is_err());
    }
}
