use std::{sync::Arc, time::Duration};

use log::{debug, info, warn};
use tokio::{sync::mpsc, time::timeout};

use crate::{coordinator::ChargingCoordinator, driver::LedDriver, ChargingEvent};

/// How long shutdown waits for the animations to clean up after themselves.
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// Feeds power, settings and device events to the coordinator.
pub struct PowerEventListener {
    coordinator: ChargingCoordinator,
    driver: Arc<dyn LedDriver>,
    charging: bool,
}

impl PowerEventListener {
    pub fn new(coordinator: ChargingCoordinator, driver: Arc<dyn LedDriver>) -> Self {
        Self {
            coordinator,
            driver,
            charging: false,
        }
    }

    pub fn is_charging(&self) -> bool {
        self.charging
    }

    /// React to one event. Returns `false` once the listener should stop.
    pub fn handle(&mut self, event: ChargingEvent) -> bool {
        match event {
            ChargingEvent::PowerConnected => {
                info!("Power connected");
                match self.driver.read_battery_level() {
                    Ok(level) => info!("Battery level: {}%", level),
                    Err(e) => warn!("Could not read the battery level: {}", e),
                }
                self.charging = true;
                self.coordinator.reconcile(true);
            }
            ChargingEvent::PowerDisconnected => {
                info!("Power disconnected");
                self.charging = false;
                self.coordinator.power_disconnected();
            }
            ChargingEvent::Refresh => {
                if self.charging {
                    self.coordinator.reconcile(false);
                } else {
                    debug!("Not charging, ignoring refresh");
                }
            }
            ChargingEvent::AllLed { claim } => {
                let state = self.coordinator.animations().state();
                if claim {
                    info!("All-LED mode claimed the LEDs");
                    state.claim_all_led();
                } else {
                    info!("All-LED mode released the LEDs");
                    state.release_all_led();
                }
            }
            ChargingEvent::DeviceFault(reason) => {
                self.coordinator.on_device_fault(&reason);
            }
            ChargingEvent::Shutdown => {
                info!("Shutting down charging animations");
                self.coordinator.power_disconnected();
                return false;
            }
        }
        true
    }

    /// Handle events until [`ChargingEvent::Shutdown`] arrives or every sender
    /// is dropped, then wait for the animations to wind down.
    pub async fn start(mut self, mut events: mpsc::Receiver<ChargingEvent>) {
        while let Some(event) = events.recv().await {
            if !self.handle(event) {
                break;
            }
        }

        self.coordinator.power_disconnected();
        let state = self.coordinator.animations().state().clone();
        let wound_down = timeout(SHUTDOWN_GRACE, async {
            state.level_active.wait_until(false).await;
            state.dot_active.wait_until(false).await;
        })
        .await;
        if wound_down.is_err() {
            warn!("Charging animations still running after {:?}", SHUTDOWN_GRACE);
        }
    }
}
