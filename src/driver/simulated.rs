use std::{
    collections::{HashMap, HashSet},
    io,
    sync::{
        atomic::{AtomicBool, AtomicU8, Ordering},
        Mutex, MutexGuard,
    },
};

use log::trace;
use tokio::time::Instant;

use super::{DriverError, LedDriver, LedId};

#[derive(Clone, Debug, PartialEq)]
pub struct LedWrite {
    pub led: LedId,
    pub brightness: f32,
    pub at: Instant,
}

#[derive(Default)]
struct Recorded {
    writes: Vec<LedWrite>,
    brightness: HashMap<LedId, f32>,
}

/// An in-memory stand-in for the LED hardware.
///
/// It keeps every write it receives so the animations can be checked step by
/// step, and failures can be injected per LED or for the whole device.
pub struct SimulatedDriver {
    battery_level: AtomicU8,
    recorded: Mutex<Recorded>,
    failing_leds: Mutex<HashSet<LedId>>,
    unplugged: AtomicBool,
}

impl SimulatedDriver {
    pub fn new(battery_level: u8) -> Self {
        Self {
            battery_level: AtomicU8::new(battery_level.min(100)),
            recorded: Mutex::new(Recorded::default()),
            failing_leds: Mutex::new(HashSet::new()),
            unplugged: AtomicBool::new(false),
        }
    }

    pub fn set_battery_level(&self, level: u8) {
        self.battery_level.store(level.min(100), Ordering::SeqCst);
    }

    /// Make every write to `led` fail with an I/O error.
    pub fn fail_led(&self, led: LedId) {
        lock(&self.failing_leds).insert(led);
    }

    /// Make the whole device unreachable.
    pub fn unplug(&self) {
        self.unplugged.store(true, Ordering::SeqCst);
    }

    /// Last brightness written to `led`, zero if it was never touched.
    pub fn brightness(&self, led: LedId) -> f32 {
        lock(&self.recorded)
            .brightness
            .get(&led)
            .copied()
            .unwrap_or(0.0)
    }

    pub fn writes(&self) -> Vec<LedWrite> {
        lock(&self.recorded).writes.clone()
    }

    pub fn write_count(&self) -> usize {
        lock(&self.recorded).writes.len()
    }

    pub fn clear_writes(&self) {
        lock(&self.recorded).writes.clear();
    }
}

impl LedDriver for SimulatedDriver {
    fn write_led(&self, id: LedId, brightness: f32) -> Result<(), DriverError> {
        if self.unplugged.load(Ordering::SeqCst) {
            return Err(DriverError::Unavailable("simulated device unplugged".into()));
        }
        if lock(&self.failing_leds).contains(&id) {
            return Err(DriverError::Io {
                led: id,
                source: io::Error::new(io::ErrorKind::Other, "simulated write failure"),
            });
        }

        trace!("LED {}: {:.2}", id, brightness);

        let mut recorded = lock(&self.recorded);
        recorded.brightness.insert(id, brightness);
        recorded.writes.push(LedWrite {
            led: id,
            brightness,
            at: Instant::now(),
        });
        Ok(())
    }

    fn read_battery_level(&self) -> Result<u8, DriverError> {
        if self.unplugged.load(Ordering::SeqCst) {
            return Err(DriverError::Unavailable("simulated device unplugged".into()));
        }
        Ok(self.battery_level.load(Ordering::SeqCst))
    }
}

// A panic while holding one of these locks cannot leave the data half-written,
// so a poisoned lock is still usable.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
