use log::debug;

use crate::{
    driver::{DriverError, LedDriver},
    state::IndicatorState,
};

use super::{
    curve_brightness, step, write_best_effort, AnimationKind, Animations, Interrupt, DOT_CURVE,
    DOT_EXTREMUM_HOLD, DOT_LED, STEP_HOLD,
};

impl Animations {
    /// Start breathing the charging dot. Does nothing while the level
    /// animation is running.
    pub fn enable_dot(&self) {
        if self.state.level_active.get() {
            debug!("Charging level animation is running, not enabling the dot");
            return;
        }
        debug!("Enabling charging dot animation");
        self.state.dot_enabled.set(true);
        if !self.state.dot_active.get() {
            self.submit(AnimationKind::Dot);
        }
    }

    pub fn disable_dot(&self) {
        debug!("Disabling charging dot animation");
        self.state.dot_enabled.set(false);
    }
}

/// Body of the dot animation, run on the animation worker.
///
/// Breathes until the dot is disabled. On every interruption the LED is
/// switched off, unless the all-LED mode took it over, in which case the
/// animation leaves it alone and waits for the mode to finish.
pub(crate) async fn run(
    state: &IndicatorState,
    driver: &dyn LedDriver,
) -> Result<(), DriverError> {
    state.level_active.wait_until(false).await;
    state.dot_active.set(true);
    debug!("Charging dot animation running");

    let result = breathe(state, driver).await;

    state.dot_active.set(false);
    debug!("Charging dot animation stopped");
    result
}

async fn breathe(state: &IndicatorState, driver: &dyn LedDriver) -> Result<(), DriverError> {
    while state.dot_enabled.get() {
        match breath(state, driver).await {
            // A full breath ends at zero brightness, so there is nothing to retract
            Ok(()) => {}
            Err(Interrupt::Cancelled) => {
                if state.all_led_enabled.get() {
                    debug!("Charging dot yielding to the all-LED mode");
                    state.all_led_released().await;
                } else {
                    write_best_effort(driver, DOT_LED, 0.0)?;
                }
            }
            Err(Interrupt::Device(err)) => return Err(err),
        }
    }
    Ok(())
}

/// One full breath: up the curve, hold, back down, hold.
async fn breath(state: &IndicatorState, driver: &dyn LedDriver) -> Result<(), Interrupt> {
    for &percent in DOT_CURVE.iter() {
        step(
            driver,
            still_wanted(state),
            DOT_LED,
            curve_brightness(percent),
            STEP_HOLD,
        )
        .await?;
    }
    tokio::time::sleep(DOT_EXTREMUM_HOLD).await;

    for &percent in DOT_CURVE.iter().rev() {
        step(
            driver,
            still_wanted(state),
            DOT_LED,
            curve_brightness(percent),
            STEP_HOLD,
        )
        .await?;
    }
    tokio::time::sleep(DOT_EXTREMUM_HOLD).await;

    Ok(())
}

fn still_wanted(state: &IndicatorState) -> bool {
    state.dot_enabled.get() && !state.all_led_enabled.get()
}
