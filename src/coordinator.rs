use std::sync::Arc;

use log::{debug, error, warn};

use crate::{
    animation::Animations,
    settings::{SettingsSnapshot, SettingsSource},
};

/// Turns settings and power state changes into animation start/stop
/// requests.
///
/// The coordinator remembers the settings it saw last, so a refresh only
/// restarts an animation whose setting was just switched on.
pub struct ChargingCoordinator {
    animations: Animations,
    settings: Arc<dyn SettingsSource>,
    previous: SettingsSnapshot,
}

impl ChargingCoordinator {
    pub fn new(animations: Animations, settings: Arc<dyn SettingsSource>) -> Self {
        Self {
            animations,
            settings,
            previous: SettingsSnapshot::default(),
        }
    }

    pub fn animations(&self) -> &Animations {
        &self.animations
    }

    /// Bring the animations in line with the current settings.
    ///
    /// `force_restart` starts every enabled animation even if its setting did
    /// not change, which is what a fresh power connection wants. If the
    /// settings cannot be read, nothing changes and the last good settings are
    /// kept for the next comparison.
    pub fn reconcile(&mut self, force_restart: bool) {
        let current = match self.settings.snapshot() {
            Ok(current) => current,
            Err(e) => {
                warn!("Could not read settings, leaving animations as they are: {}", e);
                return;
            }
        };
        debug!(
            "Reconciling charging animations: {:?} (was {:?}, force restart {})",
            current, self.previous, force_restart
        );

        if current.level {
            if !self.previous.level || force_restart {
                self.animations.enable_level();
            }
        } else {
            self.animations.disable_level();
        }

        if current.dot {
            if !self.previous.dot || force_restart {
                self.animations.enable_dot();
            }
        } else {
            self.animations.disable_dot();
        }

        self.previous = current;
    }

    /// Stop everything, whatever the settings say.
    pub fn power_disconnected(&self) {
        self.animations.disable_all();
    }

    /// The LED device stopped responding. LEDs stay as they are since nothing
    /// can be written to them any more.
    pub fn on_device_fault(&self, reason: &str) {
        error!("LED device failure, stopping charging animations: {}", reason);
        self.animations.disable_all();
    }
}
