//! Inbound command dispatch.

use rovelink_frame::{classify, Message, MessageKind, MotorId};
use tracing::{debug, warn};

use crate::camera::CameraSwitch;
use crate::motor::MotorActuator;

/// What happened to one inbound frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// The command was applied.
    Applied(MessageKind),
    /// A well-formed frame of a kind the device does not act on.
    Ignored(MessageKind),
    /// The frame failed to parse or the command could not be applied.
    Rejected(MessageKind),
    /// Empty frame or unknown id.
    Unknown(Option<u8>),
}

/// Parse one inbound frame and apply it to the motors or the camera.
pub fn dispatch_frame(frame: &[u8], motors: &MotorActuator, camera: &CameraSwitch) -> Dispatch {
    let kind = classify(frame);
    if kind == MessageKind::Unknown {
        warn!(id = ?frame.first(), len = frame.len(), "unknown message id");
        return Dispatch::Unknown(frame.first().copied());
    }

    let parsed = match Message::parse(frame) {
        Ok(parsed) => parsed,
        Err(err) => {
            warn!(%kind, error = %err, "discarding malformed frame");
            return Dispatch::Rejected(kind);
        }
    };
    if parsed.consumed < frame.len() {
        debug!(%kind, trailing = frame.len() - parsed.consumed, "ignoring trailing bytes");
    }

    let applied = match parsed.value {
        Message::CameraControl { on } => {
            let enabled = camera.set(on);
            debug!(on, enabled, "camera control");
            Ok(())
        }
        Message::MotorState(cmd) => motors.set(cmd.motor, cmd.state),
        Message::MotorControl(ctl) => motors
            .set(MotorId::Motor1, ctl.motor1)
            .and_then(|()| motors.set(MotorId::Motor2, ctl.motor2)),
        Message::MoveControl(cmd) => {
            let (motor, state) = cmd.actuation();
            motors.set(motor, state)
        }
        Message::Telemetry(_)
        | Message::CameraChunk(_)
        | Message::BatteryLevel(_)
        | Message::DistanceReading(_) => {
            debug!(%kind, "ignoring device-originated message");
            return Dispatch::Ignored(kind);
        }
    };

    match applied {
        Ok(()) => Dispatch::Applied(kind),
        Err(err) => {
            warn!(%kind, error = %err, "failed to apply command");
            Dispatch::Rejected(kind)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use bytes::BytesMut;
    use rovelink_frame::{
        encode_battery_level, encode_camera_control, encode_motor_control, encode_motor_state,
        encode_move_control, encode_telemetry, MotorState, MoveCommand, Telemetry,
    };

    use super::*;
    use crate::camera::tests::FakeCamera;
    use crate::motor::tests::PinBank;
    use crate::settings::MotorPins;

    fn fixture() -> (MotorActuator, CameraSwitch, FakeCamera) {
        let motors =
            MotorActuator::with_pins(MotorPins::default(), Box::new(PinBank::default())).unwrap();
        let camera = FakeCamera::default();
        let switch = CameraSwitch::new(Box::new(camera.clone()));
        (motors, switch, camera)
    }

    #[test]
    fn motor_state_command_sets_one_motor() {
        let (motors, camera, _) = fixture();
        let mut buf = BytesMut::new();
        encode_motor_state(&mut buf, MotorId::Motor2, MotorState::Backward);

        assert_eq!(
            dispatch_frame(&buf, &motors, &camera),
            Dispatch::Applied(MessageKind::MotorState)
        );
        assert_eq!(motors.states(), (MotorState::Idle, MotorState::Backward));
    }

    #[test]
    fn motor_control_sets_both_motors() {
        let (motors, camera, _) = fixture();
        let mut buf = BytesMut::new();
        encode_motor_control(&mut buf, MotorState::Forward, MotorState::Brake);

        dispatch_frame(&buf, &motors, &camera);
        assert_eq!(motors.states(), (MotorState::Forward, MotorState::Brake));
    }

    #[test]
    fn each_move_command_actuates_exactly_one_motor() {
        for cmd in MoveCommand::ALL {
            let (motors, camera, _) = fixture();
            let mut buf = BytesMut::new();
            encode_move_control(&mut buf, cmd);
            assert_eq!(
                dispatch_frame(&buf, &motors, &camera),
                Dispatch::Applied(MessageKind::MoveControl)
            );

            let (motor, state) = cmd.actuation();
            assert_eq!(motors.get(motor), state, "{cmd:?}");
            let other = match motor {
                MotorId::Motor1 => MotorId::Motor2,
                MotorId::Motor2 => MotorId::Motor1,
            };
            assert_eq!(motors.get(other), MotorState::Idle, "{cmd:?}");
        }
    }

    #[test]
    fn camera_control_toggles_flag() {
        let (motors, camera, _) = fixture();
        let mut buf = BytesMut::new();
        encode_camera_control(&mut buf, true);
        dispatch_frame(&buf, &motors, &camera);
        assert!(camera.is_enabled());

        buf.clear();
        encode_camera_control(&mut buf, false);
        dispatch_frame(&buf, &motors, &camera);
        assert!(!camera.is_enabled());
    }

    #[test]
    fn repeated_camera_control_is_idempotent() {
        let (motors, switch, camera) = fixture();
        assert!(switch.boot());
        camera.fail_init.store(true, Ordering::SeqCst);

        let mut on = BytesMut::new();
        encode_camera_control(&mut on, true);
        let mut off = BytesMut::new();
        encode_camera_control(&mut off, false);

        dispatch_frame(&on, &motors, &switch);
        assert!(switch.is_enabled());

        dispatch_frame(&off, &motors, &switch);
        dispatch_frame(&off, &motors, &switch);
        assert!(!switch.is_enabled());
        assert_eq!(camera.stops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn device_originated_kinds_are_ignored() {
        let (motors, camera, _) = fixture();
        let mut buf = BytesMut::new();
        encode_telemetry(&mut buf, &Telemetry::default());
        assert_eq!(
            dispatch_frame(&buf, &motors, &camera),
            Dispatch::Ignored(MessageKind::Telemetry)
        );

        buf.clear();
        encode_battery_level(&mut buf, 40);
        assert_eq!(
            dispatch_frame(&buf, &motors, &camera),
            Dispatch::Ignored(MessageKind::BatteryLevel)
        );
    }

    #[test]
    fn malformed_and_unknown_frames_change_nothing() {
        let (motors, camera, _) = fixture();

        assert_eq!(dispatch_frame(&[], &motors, &camera), Dispatch::Unknown(None));
        assert_eq!(
            dispatch_frame(&[42, 1, 0, 0], &motors, &camera),
            Dispatch::Unknown(Some(42))
        );
        assert_eq!(
            dispatch_frame(&[1, 3, 0, 0, 1, 0], &motors, &camera),
            Dispatch::Rejected(MessageKind::MotorState)
        );
        assert_eq!(
            dispatch_frame(&[1, 2, 0, 0, 9], &motors, &camera),
            Dispatch::Rejected(MessageKind::MotorState)
        );
        assert_eq!(motors.states(), (MotorState::Idle, MotorState::Idle));
    }
}
