use std::path::Path;
use std::time::Duration;

use clap::{Args, Subcommand, ValueEnum};

use crate::exit::{io_error, CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod config;
pub mod listen;
pub mod run;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the device link against a controller.
    Run(RunArgs),
    /// Act as the controller: accept one device and print its frames.
    Listen(ListenArgs),
    /// Show or change persisted settings.
    Config(ConfigArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat, config: &Path) -> CliResult<i32> {
    match command {
        Command::Run(args) => run::run(args, format, config),
        Command::Listen(args) => listen::run(args, format),
        Command::Config(args) => config::run(args, format, config),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Controller endpoint (tcp://host:port). Saved to the config file.
    #[arg(long, env = "ROVELINK_ENDPOINT")]
    pub endpoint: Option<String>,
    /// Stop after this long (e.g. 30s, 500ms). Default: until Ctrl-C.
    #[arg(long)]
    pub duration: Option<String>,
    /// Start with the camera off.
    #[arg(long)]
    pub no_camera: bool,
    /// Size of each synthetic camera frame in bytes.
    #[arg(long, default_value = "4096")]
    pub frame_size: usize,
    /// Initial simulated battery level.
    #[arg(long, default_value = "100")]
    pub battery: u8,
    /// Seed for the simulated range finder.
    #[arg(long)]
    pub seed: Option<u64>,
}

#[derive(Args, Debug)]
pub struct ListenArgs {
    /// Address to listen on.
    #[arg(default_value = "127.0.0.1:9000")]
    pub addr: String,
    /// Command to send once the device connects (repeatable):
    /// camera=on|off, move=0..7, motor=1|2:STATE, motors=STATE,STATE.
    #[arg(long)]
    pub send: Vec<String>,
    /// Exit after printing N frames.
    #[arg(long)]
    pub count: Option<usize>,
    /// Do not print camera chunks.
    #[arg(long)]
    pub no_chunks: bool,
}

#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print every persisted setting.
    Show,
    /// Set the controller endpoint URI.
    SetEndpoint { uri: String },
    /// Set the motor driver pins.
    SetPins {
        motor1a: u8,
        motor1b: u8,
        motor2a: u8,
        motor2b: u8,
    },
    /// Store WiFi credentials.
    SetWifi {
        #[arg(long)]
        ssid: String,
        #[arg(long, env = "ROVELINK_WIFI_PASSWORD")]
        password: String,
    },
    /// Remove a group of settings.
    Clear {
        #[arg(value_enum)]
        target: ClearTarget,
    },
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum ClearTarget {
    Endpoint,
    Pins,
    Wifi,
    All,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

pub(crate) fn runtime() -> CliResult<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| io_error("runtime setup failed", err))
}

pub(crate) fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "s")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        _ => Ok(Duration::from_secs(value)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_duration_seconds_and_millis() {
        assert_eq!(parse_duration("2s").unwrap(), Duration::from_secs(2));
        assert_eq!(parse_duration("150ms").unwrap(), Duration::from_millis(150));
        assert_eq!(parse_duration("3").unwrap(), Duration::from_secs(3));
    }

    #[test]
    fn parse_duration_rejects_invalid_values() {
        assert!(parse_duration("0s").is_err());
        assert!(parse_duration("bad").is_err());
        assert!(parse_duration("").is_err());
    }
}
