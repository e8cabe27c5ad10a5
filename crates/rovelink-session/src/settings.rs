//! Typed accessors for the settings the device persists.

use rovelink_frame::MotorId;
use serde::Serialize;
use tracing::info;

use crate::error::StoreError;
use crate::store::ConfigStore;

type Result<T> = std::result::Result<T, StoreError>;

/// Controller endpoint URI.
pub const WS_URI_KEY: &str = "ws_uri";
/// WiFi network name.
pub const WIFI_SSID_KEY: &str = "ssid";
/// WiFi passphrase.
pub const WIFI_PASSWORD_KEY: &str = "password";
pub const MOTOR1A_KEY: &str = "motor1a";
pub const MOTOR1B_KEY: &str = "motor1b";
pub const MOTOR2A_KEY: &str = "motor2a";
pub const MOTOR2B_KEY: &str = "motor2b";

/// Every key the device knows about.
pub const ALL_KEYS: [&str; 7] = [
    WS_URI_KEY,
    WIFI_SSID_KEY,
    WIFI_PASSWORD_KEY,
    MOTOR1A_KEY,
    MOTOR1B_KEY,
    MOTOR2A_KEY,
    MOTOR2B_KEY,
];

/// GPIO assignment of the two H-bridge inputs of each motor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MotorPins {
    pub motor1a: u8,
    pub motor1b: u8,
    pub motor2a: u8,
    pub motor2b: u8,
}

impl MotorPins {
    /// `(a, b)` pins of `motor`.
    pub fn pair(&self, motor: MotorId) -> (u8, u8) {
        match motor {
            MotorId::Motor1 => (self.motor1a, self.motor1b),
            MotorId::Motor2 => (self.motor2a, self.motor2b),
        }
    }

    /// All four pins.
    pub fn all(&self) -> [u8; 4] {
        [self.motor1a, self.motor1b, self.motor2a, self.motor2b]
    }
}

impl Default for MotorPins {
    fn default() -> Self {
        Self {
            motor1a: 12,
            motor1b: 13,
            motor2a: 14,
            motor2b: 15,
        }
    }
}

/// Stored WiFi network credentials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WifiCredentials {
    pub ssid: String,
    #[serde(skip_serializing)]
    pub password: String,
}

/// Load the controller endpoint. An empty value counts as unset.
pub fn load_ws_uri(store: &dyn ConfigStore) -> Result<Option<String>> {
    Ok(store
        .get_str(WS_URI_KEY)?
        .filter(|uri| !uri.trim().is_empty()))
}

pub fn save_ws_uri(store: &dyn ConfigStore, uri: &str) -> Result<()> {
    store.set_str(WS_URI_KEY, uri)?;
    info!(uri, "endpoint uri saved");
    Ok(())
}

pub fn clear_ws_uri(store: &dyn ConfigStore) -> Result<()> {
    store.erase(WS_URI_KEY)?;
    info!("endpoint uri cleared");
    Ok(())
}

/// Load the motor pin assignment. Missing keys take their default pin.
pub fn load_motor_pins(store: &dyn ConfigStore) -> Result<MotorPins> {
    let defaults = MotorPins::default();
    Ok(MotorPins {
        motor1a: store.get_u8(MOTOR1A_KEY)?.unwrap_or(defaults.motor1a),
        motor1b: store.get_u8(MOTOR1B_KEY)?.unwrap_or(defaults.motor1b),
        motor2a: store.get_u8(MOTOR2A_KEY)?.unwrap_or(defaults.motor2a),
        motor2b: store.get_u8(MOTOR2B_KEY)?.unwrap_or(defaults.motor2b),
    })
}

pub fn save_motor_pins(store: &dyn ConfigStore, pins: &MotorPins) -> Result<()> {
    store.set_u8(MOTOR1A_KEY, pins.motor1a)?;
    store.set_u8(MOTOR1B_KEY, pins.motor1b)?;
    store.set_u8(MOTOR2A_KEY, pins.motor2a)?;
    store.set_u8(MOTOR2B_KEY, pins.motor2b)?;
    info!(
        motor1a = pins.motor1a,
        motor1b = pins.motor1b,
        motor2a = pins.motor2a,
        motor2b = pins.motor2b,
        "motor pins saved"
    );
    Ok(())
}

pub fn clear_motor_pins(store: &dyn ConfigStore) -> Result<()> {
    for key in [MOTOR1A_KEY, MOTOR1B_KEY, MOTOR2A_KEY, MOTOR2B_KEY] {
        store.erase(key)?;
    }
    info!("motor pins cleared");
    Ok(())
}

/// Load WiFi credentials. Both the SSID and the password must be present.
pub fn load_wifi_credentials(store: &dyn ConfigStore) -> Result<Option<WifiCredentials>> {
    let Some(ssid) = store.get_str(WIFI_SSID_KEY)? else {
        return Ok(None);
    };
    let Some(password) = store.get_str(WIFI_PASSWORD_KEY)? else {
        return Ok(None);
    };
    Ok(Some(WifiCredentials { ssid, password }))
}

pub fn save_wifi_credentials(store: &dyn ConfigStore, credentials: &WifiCredentials) -> Result<()> {
    store.set_str(WIFI_SSID_KEY, &credentials.ssid)?;
    store.set_str(WIFI_PASSWORD_KEY, &credentials.password)?;
    info!(ssid = %credentials.ssid, "wifi credentials saved");
    Ok(())
}

pub fn clear_wifi_credentials(store: &dyn ConfigStore) -> Result<()> {
    store.erase(WIFI_SSID_KEY)?;
    store.erase(WIFI_PASSWORD_KEY)?;
    info!("wifi credentials cleared");
    Ok(())
}

/// Erase every known key, leaving anything else in the store alone.
pub fn clear_all(store: &dyn ConfigStore) -> Result<()> {
    for key in ALL_KEYS {
        store.erase(key)?;
    }
    info!("all settings cleared");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[test]
    fn clear_all_erases_known_keys_only() {
        let store = MemoryStore::new();
        save_ws_uri(&store, "tcp://10.0.0.2:8080").unwrap();
        save_motor_pins(&store, &MotorPins::default()).unwrap();
        save_wifi_credentials(
            &store,
            &WifiCredentials {
                ssid: "rover".to_string(),
                password: "hunter22".to_string(),
            },
        )
        .unwrap();
        store.set_str("calibration", "v2").unwrap();

        clear_all(&store).unwrap();
        for key in ALL_KEYS {
            assert_eq!(store.get_str(key).unwrap(), None, "{key}");
        }
        assert_eq!(store.get_str("calibration").unwrap().as_deref(), Some("v2"));
    }

    #[test]
    fn empty_uri_counts_as_unset() {
        let store = MemoryStore::new();
        assert_eq!(load_ws_uri(&store).unwrap(), None);

        save_ws_uri(&store, "  ").unwrap();
        assert_eq!(load_ws_uri(&store).unwrap(), None);

        save_ws_uri(&store, "tcp://10.0.0.2:8080").unwrap();
        assert_eq!(
            load_ws_uri(&store).unwrap().as_deref(),
            Some("tcp://10.0.0.2:8080")
        );

        clear_ws_uri(&store).unwrap();
        assert_eq!(load_ws_uri(&store).unwrap(), None);
    }

    #[test]
    fn missing_pins_fall_back_per_key() {
        let store = MemoryStore::new();
        assert_eq!(load_motor_pins(&store).unwrap(), MotorPins::default());

        store.set_u8(MOTOR2A_KEY, 27).unwrap();
        let pins = load_motor_pins(&store).unwrap();
        assert_eq!(pins.all(), [12, 13, 27, 15]);
        assert_eq!(pins.pair(MotorId::Motor2), (27, 15));
    }

    #[test]
    fn motor_pins_roundtrip_and_clear() {
        let store = MemoryStore::new();
        let pins = MotorPins {
            motor1a: 1,
            motor1b: 2,
            motor2a: 3,
            motor2b: 4,
        };
        save_motor_pins(&store, &pins).unwrap();
        assert_eq!(load_motor_pins(&store).unwrap(), pins);

        clear_motor_pins(&store).unwrap();
        assert_eq!(load_motor_pins(&store).unwrap(), MotorPins::default());
    }

    #[test]
    fn corrupt_pin_is_an_error() {
        let store = MemoryStore::new();
        store.set_str(MOTOR1B_KEY, "13").unwrap();
        assert!(load_motor_pins(&store).is_err());
    }

    #[test]
    fn wifi_credentials_need_both_keys() {
        let store = MemoryStore::new();
        store.set_str(WIFI_SSID_KEY, "garage").unwrap();
        assert_eq!(load_wifi_credentials(&store).unwrap(), None);

        let credentials = WifiCredentials {
            ssid: "garage".to_string(),
            password: "hunter22".to_string(),
        };
        save_wifi_credentials(&store, &credentials).unwrap();
        assert_eq!(load_wifi_credentials(&store).unwrap(), Some(credentials));

        clear_wifi_credentials(&store).unwrap();
        assert_eq!(load_wifi_credentials(&store).unwrap(), None);
    }
}
