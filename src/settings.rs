use std::{
    path::PathBuf,
    sync::atomic::{AtomicBool, Ordering},
};

use anyhow::Error;
use log::warn;
use serde::{Deserialize, Serialize};

/// The user's charging animation preferences at one point in time.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct SettingsSnapshot {
    /// Breathe the charging dot while plugged in.
    pub dot: bool,
    /// Show the battery level when plugged in.
    pub level: bool,
}

/// Where the coordinator reads the user's preferences from.
pub trait SettingsSource: Send + Sync {
    fn is_dot_enabled(&self) -> bool;

    fn is_level_enabled(&self) -> bool;

    /// Read both preferences at once. Fails if the settings could not be read,
    /// in which case nothing should be concluded from them.
    fn snapshot(&self) -> Result<SettingsSnapshot, Error> {
        Ok(SettingsSnapshot {
            dot: self.is_dot_enabled(),
            level: self.is_level_enabled(),
        })
    }
}

/// Settings stored in a RON file, read again on every query.
///
/// The single-value queries treat a file that is missing or does not parse as
/// every animation being switched off. [`SettingsSource::snapshot`] reports
/// the failure instead.
pub struct RonSettings {
    path: PathBuf,
}

impl RonSettings {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn load(&self) -> Result<SettingsSnapshot, Error> {
        let settings = std::fs::read_to_string(&self.path)?;
        let settings: SettingsSnapshot = ron::from_str(&settings)?;
        Ok(settings)
    }

    fn load_or_default(&self) -> SettingsSnapshot {
        self.load().unwrap_or_else(|e| {
            warn!("Could not read settings from {}: {}", self.path.display(), e);
            SettingsSnapshot::default()
        })
    }
}

impl SettingsSource for RonSettings {
    fn is_dot_enabled(&self) -> bool {
        self.load_or_default().dot
    }

    fn is_level_enabled(&self) -> bool {
        self.load_or_default().level
    }

    fn snapshot(&self) -> Result<SettingsSnapshot, Error> {
        self.load()
    }
}

/// Settings held in memory, changed programmatically.
#[derive(Default)]
pub struct MemorySettings {
    dot: AtomicBool,
    level: AtomicBool,
}

impl MemorySettings {
    pub fn new(dot: bool, level: bool) -> Self {
        Self {
            dot: AtomicBool::new(dot),
            level: AtomicBool::new(level),
        }
    }

    pub fn set_dot(&self, enabled: bool) {
        self.dot.store(enabled, Ordering::SeqCst);
    }

    pub fn set_level(&self, enabled: bool) {
        self.level.store(enabled, Ordering::SeqCst);
    }
}

impl SettingsSource for MemorySettings {
    fn is_dot_enabled(&self) -> bool {
        self.dot.load(Ordering::SeqCst)
    }

    fn is_level_enabled(&self) -> bool {
        self.level.load(Ordering::SeqCst)
    }
}
