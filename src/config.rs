use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use anyhow::Error;
use serde::{Deserialize, Serialize};

use crate::driver::{LedDriver, SimulatedDriver, SysfsDriver};

/// Environment variable pointing at the config file. Defaults to `config.ron`
/// in the working directory.
pub const CONFIG_ENV: &str = "GLYPH_CHARGING_CONFIG";

#[derive(Debug, Deserialize, Serialize, PartialEq)]
pub struct Config {
    pub driver: Driver,
    /// RON file holding the user's [`SettingsSnapshot`](crate::settings::SettingsSnapshot).
    pub settings_path: PathBuf,
    /// sysfs node that reads `1` while external power is connected.
    #[serde(default = "default_power_supply_path")]
    pub power_supply_path: PathBuf,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Local socket accepting text commands from other processes.
    #[serde(default)]
    pub control_socket: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, PartialEq)]
pub enum Driver {
    Sysfs {
        led_path: PathBuf,
        battery_path: PathBuf,
        max_brightness: u32,
    },
    /// No hardware, writes are only logged.
    Simulated { battery_level: u8 },
}

fn default_power_supply_path() -> PathBuf {
    PathBuf::from("/sys/class/power_supply/usb/online")
}

fn default_poll_interval_ms() -> u64 {
    500
}

impl Config {
    pub fn load() -> Result<Config, Error> {
        let path = std::env::var(CONFIG_ENV).unwrap_or_else(|_| "config.ron".to_string());
        Config::load_from(path)
    }

    pub fn load_from(path: impl AsRef<Path>) -> Result<Config, Error> {
        let config = std::fs::read_to_string(path)?;
        let config: Config = ron::from_str(&config)?;
        Ok(config)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn build_driver(&self) -> Arc<dyn LedDriver> {
        match &self.driver {
            Driver::Sysfs {
                led_path,
                battery_path,
                max_brightness,
            } => Arc::new(SysfsDriver::new(
                led_path.clone(),
                battery_path.clone(),
                *max_brightness,
            )),
            Driver::Simulated { battery_level } => Arc::new(SimulatedDriver::new(*battery_level)),
        }
    }
}
