mod cmd;
mod exit;
mod logging;
mod output;

use std::path::PathBuf;

use clap::Parser;

use crate::cmd::Command;
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "rovelink", version, about = "Camera and motor control link")]
struct Cli {
    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(long, value_name = "LEVEL", default_value = "info", global = true)]
    log_level: LogLevel,

    /// Persisted settings file.
    #[arg(
        long,
        value_name = "PATH",
        env = "ROVELINK_CONFIG",
        default_value = "rovelink.json",
        global = true
    )]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    let result = cmd::run(cli.command, format, &cli.config);

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cmd::ConfigAction;

    #[test]
    fn parses_run_subcommand() {
        let cli = Cli::try_parse_from([
            "rovelink",
            "run",
            "--endpoint",
            "tcp://127.0.0.1:9000",
            "--duration",
            "3s",
            "--no-camera",
        ])
        .expect("run args should parse");

        assert!(matches!(cli.command, Command::Run(_)));
    }

    #[test]
    fn parses_listen_with_commands() {
        let cli = Cli::try_parse_from([
            "rovelink",
            "listen",
            "127.0.0.1:9000",
            "--send",
            "camera=off",
            "--send",
            "move=5",
            "--count",
            "3",
        ])
        .expect("listen args should parse");

        let Command::Listen(args) = cli.command else {
            panic!("expected listen");
        };
        assert_eq!(args.send, vec!["camera=off", "move=5"]);
        assert_eq!(args.count, Some(3));
    }

    #[test]
    fn parses_config_set_pins() {
        let cli = Cli::try_parse_from([
            "rovelink",
            "--config",
            "/tmp/x.json",
            "config",
            "set-pins",
            "1",
            "2",
            "3",
            "4",
        ])
        .expect("config args should parse");

        assert_eq!(cli.config, PathBuf::from("/tmp/x.json"));
        let Command::Config(args) = cli.command else {
            panic!("expected config");
        };
        assert!(matches!(args.action, ConfigAction::SetPins { motor1a: 1, .. }));
    }

    #[test]
    fn rejects_out_of_range_pin() {
        let err = Cli::try_parse_from(["rovelink", "config", "set-pins", "1", "2", "3", "300"])
            .expect_err("pin above 255 should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
    }
}
