use std::{
    fs,
    io::{self, Write},
    path::PathBuf,
};

use log::debug;

use super::{parse_battery_level, DriverError, LedDriver, LedId};

/// Drives the glyph LEDs through the kernel's sysfs nodes.
///
/// Every write opens the single-LED node and writes `"<id> <value>"`, where
/// value is the brightness fraction scaled to the hardware range.
pub struct SysfsDriver {
    led_path: PathBuf,
    battery_path: PathBuf,
    max_brightness: u32,
}

impl SysfsDriver {
    pub fn new(led_path: PathBuf, battery_path: PathBuf, max_brightness: u32) -> Self {
        Self {
            led_path,
            battery_path,
            max_brightness,
        }
    }

    fn scale(&self, brightness: f32) -> u32 {
        (brightness.clamp(0.0, 1.0) * self.max_brightness as f32).round() as u32
    }

    fn open_node(&self, id: LedId) -> Result<fs::File, DriverError> {
        fs::OpenOptions::new()
            .write(true)
            .truncate(true)
            .open(&self.led_path)
            .map_err(|source| match source.kind() {
                io::ErrorKind::NotFound | io::ErrorKind::PermissionDenied => {
                    DriverError::Unavailable(format!("{}: {}", self.led_path.display(), source))
                }
                _ => DriverError::Io { led: id, source },
            })
    }
}

impl LedDriver for SysfsDriver {
    fn write_led(&self, id: LedId, brightness: f32) -> Result<(), DriverError> {
        let value = self.scale(brightness);
        let mut node = self.open_node(id)?;
        node.write_all(format!("{} {}", id, value).as_bytes())
            .map_err(|source| DriverError::Io { led: id, source })?;

        debug!("LED {}: wrote {}", id, value);
        Ok(())
    }

    fn read_battery_level(&self) -> Result<u8, DriverError> {
        let raw = fs::read_to_string(&self.battery_path).map_err(|e| {
            DriverError::Unavailable(format!("{}: {}", self.battery_path.display(), e))
        })?;
        parse_battery_level(&raw)
    }
}
