use std::path::Path;

use rovelink_session::settings::{self, MotorPins, WifiCredentials};
use rovelink_session::JsonFileStore;

use crate::cmd::{ClearTarget, ConfigAction, ConfigArgs};
use crate::exit::{store_error, transport_error, CliResult, SUCCESS};
use crate::output::{print_record, OutputFormat};

pub fn run(args: ConfigArgs, format: OutputFormat, config: &Path) -> CliResult<i32> {
    let store = JsonFileStore::open(config).map_err(|err| store_error("open config failed", err))?;

    match args.action {
        ConfigAction::Show => show(&store, format),
        ConfigAction::SetEndpoint { uri } => {
            rovelink_transport::tcp::socket_addr(&uri)
                .map_err(|err| transport_error("invalid endpoint", err))?;
            settings::save_ws_uri(&store, &uri)
                .map_err(|err| store_error("save endpoint failed", err))?;
            Ok(SUCCESS)
        }
        ConfigAction::SetPins {
            motor1a,
            motor1b,
            motor2a,
            motor2b,
        } => {
            let pins = MotorPins {
                motor1a,
                motor1b,
                motor2a,
                motor2b,
            };
            settings::save_motor_pins(&store, &pins)
                .map_err(|err| store_error("save pins failed", err))?;
            Ok(SUCCESS)
        }
        ConfigAction::SetWifi { ssid, password } => {
            settings::save_wifi_credentials(&store, &WifiCredentials { ssid, password })
                .map_err(|err| store_error("save wifi failed", err))?;
            Ok(SUCCESS)
        }
        ConfigAction::Clear { target } => {
            let cleared = match target {
                ClearTarget::Endpoint => settings::clear_ws_uri(&store),
                ClearTarget::Pins => settings::clear_motor_pins(&store),
                ClearTarget::Wifi => settings::clear_wifi_credentials(&store),
                ClearTarget::All => settings::clear_all(&store),
            };
            cleared.map_err(|err| store_error("clear failed", err))?;
            Ok(SUCCESS)
        }
    }
}

fn show(store: &JsonFileStore, format: OutputFormat) -> CliResult<i32> {
    let endpoint =
        settings::load_ws_uri(store).map_err(|err| store_error("read endpoint failed", err))?;
    let pins = settings::load_motor_pins(store).map_err(|err| store_error("read pins failed", err))?;
    let wifi = settings::load_wifi_credentials(store)
        .map_err(|err| store_error("read wifi failed", err))?;

    let record = [
        ("path", store.path().display().to_string()),
        ("endpoint", endpoint.unwrap_or_else(|| "-".to_string())),
        ("motor1a", pins.motor1a.to_string()),
        ("motor1b", pins.motor1b.to_string()),
        ("motor2a", pins.motor2a.to_string()),
        ("motor2b", pins.motor2b.to_string()),
        (
            "ssid",
            wifi.as_ref()
                .map(|w| w.ssid.clone())
                .unwrap_or_else(|| "-".to_string()),
        ),
        (
            "password",
            if wifi.is_some() { "********" } else { "-" }.to_string(),
        ),
    ];
    print_record(&record, format);
    Ok(SUCCESS)
}
