use futures_util::{SinkExt, StreamExt};
use rovelink_frame::{
    LinkCodec, Message, MessageKind, MotorControl, MotorId, MotorState, MotorStateCommand,
    MoveCommand,
};
use tokio::net::TcpListener;
use tokio_util::codec::{FramedRead, FramedWrite};
use tracing::{info, warn};

use crate::cmd::{runtime, ListenArgs};
use crate::exit::{frame_error, io_error, CliError, CliResult, SUCCESS, USAGE};
use crate::output::{print_message, OutputFormat};

pub fn run(args: ListenArgs, format: OutputFormat) -> CliResult<i32> {
    let commands = args
        .send
        .iter()
        .map(|arg| parse_command(arg))
        .collect::<CliResult<Vec<_>>>()?;
    runtime()?.block_on(listen(args, commands, format))
}

async fn listen(args: ListenArgs, commands: Vec<Message>, format: OutputFormat) -> CliResult<i32> {
    let listener = TcpListener::bind(&args.addr)
        .await
        .map_err(|err| io_error("bind failed", err))?;
    let local = listener
        .local_addr()
        .map_err(|err| io_error("bind failed", err))?;
    info!(addr = %local, "waiting for device");

    let (stream, peer) = tokio::select! {
        accepted = listener.accept() => accepted.map_err(|err| io_error("accept failed", err))?,
        _ = tokio::signal::ctrl_c() => return Ok(SUCCESS),
    };
    info!(%peer, "device connected");
    let _ = stream.set_nodelay(true);
    let (reader, writer) = stream.into_split();
    let mut frames = FramedRead::new(reader, LinkCodec::new());
    let mut sink = FramedWrite::new(writer, LinkCodec::new());

    for command in commands {
        info!(kind = %command.kind(), "sending command");
        sink.send(command)
            .await
            .map_err(|err| frame_error("send failed", err))?;
    }

    let mut printed = 0usize;
    loop {
        let next = tokio::select! {
            next = frames.next() => next,
            _ = tokio::signal::ctrl_c() => break,
        };
        let Some(frame) = next else {
            info!("device disconnected");
            break;
        };
        let frame = frame.map_err(|err| frame_error("receive failed", err))?;

        let message = match Message::parse(&frame) {
            Ok(parsed) => parsed.value,
            Err(err) => {
                warn!(error = %err, len = frame.len(), "undecodable frame");
                continue;
            }
        };
        if args.no_chunks && message.kind() == MessageKind::CameraChunk {
            continue;
        }

        print_message(&message, &frame, format);
        printed = printed.saturating_add(1);
        if args.count.is_some_and(|count| printed >= count) {
            break;
        }
    }

    Ok(SUCCESS)
}

fn parse_state(input: &str) -> CliResult<MotorState> {
    match input.trim().to_ascii_lowercase().as_str() {
        "idle" | "0" => Ok(MotorState::Idle),
        "forward" | "fwd" | "1" => Ok(MotorState::Forward),
        "backward" | "back" | "2" => Ok(MotorState::Backward),
        "brake" | "3" => Ok(MotorState::Brake),
        other => Err(CliError::new(USAGE, format!("invalid motor state: {other}"))),
    }
}

/// Parse a `--send` command such as `camera=on` or `motor=2:brake`.
pub fn parse_command(arg: &str) -> CliResult<Message> {
    let usage = || CliError::new(USAGE, format!("invalid command: {arg}"));
    let (name, value) = arg.split_once('=').ok_or_else(usage)?;

    match name.trim() {
        "camera" => match value.trim() {
            "on" | "1" => Ok(Message::CameraControl { on: true }),
            "off" | "0" => Ok(Message::CameraControl { on: false }),
            _ => Err(usage()),
        },
        "move" => {
            let raw: u8 = value.trim().parse().map_err(|_| usage())?;
            let cmd =
                MoveCommand::try_from(raw).map_err(|err| CliError::new(USAGE, err.to_string()))?;
            Ok(Message::MoveControl(cmd))
        }
        "motor" => {
            let (motor, state) = value.split_once(':').ok_or_else(usage)?;
            let motor = match motor.trim() {
                "1" => MotorId::Motor1,
                "2" => MotorId::Motor2,
                _ => return Err(usage()),
            };
            Ok(Message::MotorState(MotorStateCommand {
                motor,
                state: parse_state(state)?,
            }))
        }
        "motors" => {
            let (motor1, motor2) = value.split_once(',').ok_or_else(usage)?;
            Ok(Message::MotorControl(MotorControl {
                motor1: parse_state(motor1)?,
                motor2: parse_state(motor2)?,
            }))
        }
        _ => Err(usage()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_camera_and_move_commands() {
        assert_eq!(
            parse_command("camera=off").unwrap(),
            Message::CameraControl { on: false }
        );
        assert_eq!(
            parse_command("move=6").unwrap(),
            Message::MoveControl(MoveCommand::Motor2Backward)
        );
    }

    #[test]
    fn parses_motor_commands() {
        assert_eq!(
            parse_command("motor=2:brake").unwrap(),
            Message::MotorState(MotorStateCommand {
                motor: MotorId::Motor2,
                state: MotorState::Brake,
            })
        );
        assert_eq!(
            parse_command("motors=fwd,0").unwrap(),
            Message::MotorControl(MotorControl {
                motor1: MotorState::Forward,
                motor2: MotorState::Idle,
            })
        );
    }

    #[test]
    fn rejects_bad_commands() {
        for arg in ["camera", "camera=maybe", "move=8", "motor=3:idle", "motors=idle", "warp=9"] {
            let err = parse_command(arg).expect_err(arg);
            assert_eq!(err.code, USAGE, "{arg}");
        }
    }
}
