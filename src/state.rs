use std::fmt;

use tokio::sync::watch;

/// A boolean that can be read and written from anywhere and awaited on.
///
/// Backed by a watch channel so a waiting animation is woken by the write
/// instead of spinning on the value.
pub struct Flag {
    tx: watch::Sender<bool>,
}

impl Flag {
    fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx }
    }

    pub fn get(&self) -> bool {
        *self.tx.borrow()
    }

    pub fn set(&self, value: bool) {
        self.tx.send_replace(value);
    }

    /// Resolve once the flag holds `value`. Returns immediately if it already
    /// does.
    pub async fn wait_until(&self, value: bool) {
        let mut rx = self.tx.subscribe();
        // The sender is owned by `self`, so the channel cannot close while we
        // wait on it.
        let _ = rx.wait_for(|current| *current == value).await;
    }
}

impl fmt::Debug for Flag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.get())
    }
}

/// Which charging animations should run and which are running, plus the
/// all-LED mode that pre-empts both of them.
///
/// `enabled` flags are written by the coordinator, `active` flags by the
/// animation bodies themselves. An animation can still be active for a step
/// after it was disabled.
#[derive(Debug)]
pub struct IndicatorState {
    pub dot_enabled: Flag,
    pub dot_active: Flag,
    pub level_enabled: Flag,
    pub level_active: Flag,
    pub all_led_enabled: Flag,
    pub all_led_active: Flag,
}

impl IndicatorState {
    pub fn new() -> Self {
        Self {
            dot_enabled: Flag::new(),
            dot_active: Flag::new(),
            level_enabled: Flag::new(),
            level_active: Flag::new(),
            all_led_enabled: Flag::new(),
            all_led_active: Flag::new(),
        }
    }

    /// Take over every LED for the all-LED mode. Running animations yield at
    /// their next step.
    pub fn claim_all_led(&self) {
        self.all_led_enabled.set(true);
        self.all_led_active.set(true);
    }

    /// Hand the LEDs back after the all-LED mode is done with them.
    pub fn release_all_led(&self) {
        self.all_led_active.set(false);
        self.all_led_enabled.set(false);
    }

    /// Wait until the all-LED mode has finished with the LEDs and no longer
    /// asks for them.
    pub async fn all_led_released(&self) {
        self.all_led_active.wait_until(false).await;
        self.all_led_enabled.wait_until(false).await;
    }

    /// True when neither animation is running.
    pub fn is_idle(&self) -> bool {
        !self.dot_active.get() && !self.level_active.get()
    }
}

impl Default for IndicatorState {
    fn default() -> Self {
        Self::new()
    }
}
