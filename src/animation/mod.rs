use std::{fmt, sync::Arc, time::Duration};

use log::{error, warn};
use tokio::sync::mpsc;

use crate::{
    driver::{DriverError, LedDriver, LedId},
    state::IndicatorState,
};

pub mod dot;
pub mod level;

/// The LED the dot animation breathes on.
pub const DOT_LED: LedId = 16;

/// Every LED the level animation can light, in lighting order. Each battery
/// bucket lights a prefix of it.
pub const LEVEL_LEDS: [LedId; 9] = [16, 13, 11, 9, 12, 10, 14, 15, 8];

/// Switched off, in this order, whenever a level animation is interrupted.
pub const SAFETY_SET: [LedId; 9] = [8, 15, 14, 10, 12, 9, 11, 13, 16];

pub const CURVE_STEPS: usize = 101;

/// Dot brightness in percent, one entry per 10ms step.
pub const DOT_CURVE: [u8; CURVE_STEPS] = breathing_curve();

pub const STEP_HOLD: Duration = Duration::from_millis(10);
pub const DOT_EXTREMUM_HOLD: Duration = Duration::from_millis(190);
pub const LEVEL_LIT_HOLD: Duration = Duration::from_millis(1000);
pub const LEVEL_RETRACTED_HOLD: Duration = Duration::from_millis(730);

const fn breathing_curve() -> [u8; CURVE_STEPS] {
    let mut curve = [0; CURVE_STEPS];
    let mut i = 0;
    while i < CURVE_STEPS {
        curve[i] = i as u8;
        i += 1;
    }
    curve
}

/// Brightness fraction for one entry of [`DOT_CURVE`].
pub fn curve_brightness(percent: u8) -> f32 {
    f32::from(percent) / 100.0
}

/// The LEDs to light for a battery percentage, in lighting order.
pub fn level_leds(battery_level: u8) -> &'static [LedId] {
    let count = match battery_level {
        100.. => 9,
        88..=99 => 8,
        75..=87 => 7,
        62..=74 => 6,
        49..=61 => 5,
        36..=48 => 4,
        24..=35 => 3,
        12..=23 => 2,
        _ => 0,
    };
    &LEVEL_LEDS[..count]
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AnimationKind {
    Dot,
    Level,
}

impl fmt::Display for AnimationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnimationKind::Dot => write!(f, "charging dot"),
            AnimationKind::Level => write!(f, "charging level"),
        }
    }
}

/// Why an animation stopped before reaching the end of its sequence.
#[derive(Debug)]
pub enum Interrupt {
    /// The animation was disabled or pre-empted. Not an error.
    Cancelled,
    /// The LED device can no longer be driven.
    Device(DriverError),
}

impl From<DriverError> for Interrupt {
    fn from(err: DriverError) -> Self {
        Interrupt::Device(err)
    }
}

/// Write one LED, shrugging off failures that only affect this write.
pub(crate) fn write_best_effort(
    driver: &dyn LedDriver,
    led: LedId,
    brightness: f32,
) -> Result<(), DriverError> {
    match driver.write_led(led, brightness) {
        Err(err) if !err.is_fatal() => {
            warn!("{}", err);
            Ok(())
        }
        result => result,
    }
}

/// One animation step: check that the animation is still wanted, write, then
/// hold.
pub(crate) async fn step(
    driver: &dyn LedDriver,
    still_wanted: bool,
    led: LedId,
    brightness: f32,
    hold: Duration,
) -> Result<(), Interrupt> {
    if !still_wanted {
        return Err(Interrupt::Cancelled);
    }
    write_best_effort(driver, led, brightness)?;
    tokio::time::sleep(hold).await;
    Ok(())
}

/// Handle used to start and stop the animations.
///
/// Every call only flips flags and, when needed, queues the animation body on
/// the worker, so it is safe to call from any event handler.
#[derive(Clone)]
pub struct Animations {
    state: Arc<IndicatorState>,
    jobs: mpsc::UnboundedSender<AnimationKind>,
}

impl Animations {
    pub(crate) fn new(
        state: Arc<IndicatorState>,
        jobs: mpsc::UnboundedSender<AnimationKind>,
    ) -> Self {
        Self { state, jobs }
    }

    pub fn state(&self) -> &Arc<IndicatorState> {
        &self.state
    }

    /// Ask both animations to stop.
    pub fn disable_all(&self) {
        self.disable_level();
        self.disable_dot();
    }

    fn submit(&self, kind: AnimationKind) {
        if self.jobs.send(kind).is_err() {
            error!("Animation worker is gone, the {} animation will not run", kind);
        }
    }
}
