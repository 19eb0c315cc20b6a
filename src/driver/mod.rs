use std::io;

use thiserror::Error;

pub mod simulated;
pub mod sysfs;

pub use simulated::{LedWrite, SimulatedDriver};
pub use sysfs::SysfsDriver;

/// Identifier of a single glyph LED, as understood by the kernel driver.
pub type LedId = u8;

#[derive(Debug, Error)]
pub enum DriverError {
    /// A single write or read failed. The animation treats the step as
    /// best-effort and carries on.
    #[error("LED {led}: device I/O failed: {source}")]
    Io {
        led: LedId,
        #[source]
        source: io::Error,
    },
    /// The adapter is gone, nothing more can be written.
    #[error("LED driver unavailable: {0}")]
    Unavailable(String),
    #[error("battery level {0:?} is not a percentage")]
    InvalidBatteryLevel(String),
}

impl DriverError {
    /// Whether the running animation has to give up on the device entirely.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, DriverError::Io { .. })
    }
}

/// Synchronous access to the glyph LEDs and the battery gauge.
///
/// Calls are expected to be fast; they are made directly from the animation
/// worker between holds.
pub trait LedDriver: Send + Sync {
    /// Set one LED to a brightness fraction in `[0, 1]`.
    fn write_led(&self, id: LedId, brightness: f32) -> Result<(), DriverError>;

    /// Current battery charge in percent, `0..=100`.
    fn read_battery_level(&self) -> Result<u8, DriverError>;
}

/// Turn a raw reading from the battery gauge into a percentage.
pub fn parse_battery_level(raw: &str) -> Result<u8, DriverError> {
    let trimmed = raw.trim();
    match trimmed.parse::<u8>() {
        Ok(level) if level <= 100 => Ok(level),
        _ => Err(DriverError::InvalidBatteryLevel(trimmed.to_string())),
    }
}
