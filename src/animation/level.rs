use log::{debug, info};

use crate::{
    driver::{DriverError, LedDriver},
    state::IndicatorState,
};

use super::{
    level_leds, step, write_best_effort, AnimationKind, Animations, Interrupt, LEVEL_LIT_HOLD,
    LEVEL_RETRACTED_HOLD, SAFETY_SET, STEP_HOLD,
};

impl Animations {
    /// Play the battery level once. Does nothing while either animation is
    /// running.
    pub fn enable_level(&self) {
        if self.state.dot_active.get() || self.state.level_active.get() {
            debug!("A charging animation is running, not enabling the level");
            return;
        }
        debug!("Enabling charging level animation");
        self.state.level_enabled.set(true);
        self.submit(AnimationKind::Level);
    }

    pub fn disable_level(&self) {
        debug!("Disabling charging level animation");
        self.state.level_enabled.set(false);
    }
}

/// Body of the level animation, run on the animation worker.
///
/// Lights the LEDs for the current battery level, holds, and retracts them in
/// reverse. If it is interrupted half way, it no longer knows which LEDs are
/// lit, so it switches off the whole safety set unless the all-LED mode is
/// driving them. The animation disables itself when done.
pub(crate) async fn run(
    state: &IndicatorState,
    driver: &dyn LedDriver,
) -> Result<(), DriverError> {
    state.level_active.set(true);
    debug!("Charging level animation running");

    let result = match play(state, driver).await {
        Ok(()) => Ok(()),
        Err(Interrupt::Cancelled) => {
            debug!("Charging level animation cancelled");
            if state.all_led_active.get() {
                Ok(())
            } else {
                retract_all(driver)
            }
        }
        Err(Interrupt::Device(err)) => Err(err),
    };

    state.level_active.set(false);
    state.level_enabled.set(false);
    result
}

async fn play(state: &IndicatorState, driver: &dyn LedDriver) -> Result<(), Interrupt> {
    let battery_level = driver.read_battery_level()?;
    let leds = level_leds(battery_level);
    info!("Showing battery level {}% on {} LEDs", battery_level, leds.len());

    for &led in leds {
        step(driver, still_wanted(state), led, 1.0, STEP_HOLD).await?;
    }
    tokio::time::sleep(LEVEL_LIT_HOLD).await;

    for &led in leds.iter().rev() {
        step(driver, still_wanted(state), led, 0.0, STEP_HOLD).await?;
    }
    tokio::time::sleep(LEVEL_RETRACTED_HOLD).await;

    Ok(())
}

fn retract_all(driver: &dyn LedDriver) -> Result<(), DriverError> {
    for &led in SAFETY_SET.iter() {
        write_best_effort(driver, led, 0.0)?;
    }
    Ok(())
}

fn still_wanted(state: &IndicatorState) -> bool {
    state.level_enabled.get() && !state.all_led_enabled.get()
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use tokio::time::{sleep, timeout};

    use super::*;
    use crate::{
        animation::{DOT_LED, LEVEL_LEDS},
        driver::{LedId, SimulatedDriver},
        worker::AnimationWorker,
    };

    fn setup(battery_level: u8) -> (Animations, Arc<IndicatorState>, Arc<SimulatedDriver>) {
        let state = Arc::new(IndicatorState::new());
        let driver = Arc::new(SimulatedDriver::new(battery_level));
        let (animations, worker) = AnimationWorker::new(state.clone(), driver.clone());
        tokio::spawn(worker.start());
        (animations, state, driver)
    }

    fn sequence(driver: &SimulatedDriver) -> Vec<(LedId, f32)> {
        driver
            .writes()
            .iter()
            .map(|w| (w.led, w.brightness))
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_lights_and_retracts_bucket() {
        let (animations, state, driver) = setup(55);
        animations.enable_level();
        sleep(Duration::from_millis(1)).await;
        assert!(state.level_active.get());

        timeout(Duration::from_secs(3), state.level_active.wait_until(false))
            .await
            .unwrap();

        let lit = [16, 13, 11, 9, 12];
        let mut expected: Vec<(LedId, f32)> = lit.iter().map(|&led| (led, 1.0)).collect();
        expected.extend(lit.iter().rev().map(|&led| (led, 0.0)));
        assert_eq!(sequence(&driver), expected);

        assert!(!state.level_enabled.get());
    }

    #[tokio::test(start_paused = true)]
    async fn test_holds_between_phases() {
        let (animations, state, driver) = setup(30);
        let start = tokio::time::Instant::now();
        animations.enable_level();
        state.level_active.wait_until(true).await;
        state.level_active.wait_until(false).await;
        let finished = tokio::time::Instant::now();

        let writes = driver.writes();
        assert_eq!(writes.len(), 6);

        // Last LED lit, then a one second hold before the first retraction
        let pause = writes[3].at - writes[2].at;
        assert!(pause >= STEP_HOLD + LEVEL_LIT_HOLD);
        assert!(pause < STEP_HOLD + LEVEL_LIT_HOLD + Duration::from_millis(5));

        // The animation stays active through the trailing hold
        let tail = finished - writes[5].at;
        assert!(tail >= STEP_HOLD + LEVEL_RETRACTED_HOLD);
        assert!(finished - start >= 6 * STEP_HOLD + LEVEL_LIT_HOLD + LEVEL_RETRACTED_HOLD);
    }

    #[tokio::test(start_paused = true)]
    async fn test_low_battery_lights_nothing() {
        let (animations, state, driver) = setup(11);
        animations.enable_level();
        state.level_active.wait_until(true).await;
        state.level_active.wait_until(false).await;
        assert_eq!(driver.write_count(), 0);
        assert!(!state.level_enabled.get());
    }

    #[tokio::test(start_paused = true)]
    async fn test_disable_mid_sequence_clears_safety_set() {
        let (animations, state, driver) = setup(100);
        animations.enable_level();
        sleep(Duration::from_millis(45)).await;
        animations.disable_level();

        timeout(Duration::from_millis(50), state.level_active.wait_until(false))
            .await
            .unwrap();

        let writes = sequence(&driver);
        let (lit, cleanup) = writes.split_at(writes.len() - SAFETY_SET.len());
        assert!(lit.iter().all(|&(_, brightness)| brightness == 1.0));
        assert_eq!(
            cleanup,
            SAFETY_SET
                .iter()
                .map(|&led| (led, 0.0))
                .collect::<Vec<_>>()
                .as_slice()
        );
        for led in LEVEL_LEDS {
            assert_eq!(driver.brightness(led), 0.0);
        }
        assert!(!state.level_enabled.get());
    }

    #[tokio::test(start_paused = true)]
    async fn test_all_led_mode_owns_the_leds() {
        let (animations, state, driver) = setup(100);
        animations.enable_level();
        sleep(Duration::from_millis(25)).await;
        state.claim_all_led();

        timeout(Duration::from_millis(50), state.level_active.wait_until(false))
            .await
            .unwrap();

        // Nothing is cleaned up behind the all-LED mode's back
        assert!(driver.writes().iter().all(|w| w.brightness == 1.0));
        assert_eq!(driver.brightness(DOT_LED), 1.0);
        assert!(!state.level_enabled.get());
    }

    #[tokio::test(start_paused = true)]
    async fn test_enable_is_noop_while_busy() {
        let (animations, state, driver) = setup(100);

        state.dot_active.set(true);
        animations.enable_level();
        assert!(!state.level_enabled.get());
        state.dot_active.set(false);

        animations.enable_level();
        sleep(Duration::from_millis(1)).await;
        assert!(state.level_active.get());

        // A second request while playing must not queue another run
        animations.enable_level();
        state.level_active.wait_until(false).await;
        sleep(Duration::from_secs(3)).await;
        assert_eq!(driver.write_count(), 2 * LEVEL_LEDS.len());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_led_is_skipped() {
        let (animations, state, driver) = setup(40);
        driver.fail_led(11);
        animations.enable_level();
        state.level_active.wait_until(true).await;
        state.level_active.wait_until(false).await;

        let expected: Vec<(LedId, f32)> = vec![
            (16, 1.0),
            (13, 1.0),
            (9, 1.0),
            (9, 0.0),
            (13, 0.0),
            (16, 0.0),
        ];
        assert_eq!(sequence(&driver), expected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unreadable_battery_is_fatal() {
        let state = IndicatorState::new();
        let driver = SimulatedDriver::new(80);
        driver.unplug();
        state.level_enabled.set(true);

        let result = run(&state, &driver).await;
        assert!(matches!(result, Err(DriverError::Unavailable(_))));
        assert!(!state.level_active.get());
        assert!(!state.level_enabled.get());
    }

    #[tokio::test(start_paused = true)]
    async fn test_each_run_reads_the_current_level() {
        let (animations, state, driver) = setup(30);
        animations.enable_level();
        state.level_active.wait_until(true).await;
        state.level_active.wait_until(false).await;
        assert_eq!(driver.write_count(), 6);

        driver.set_battery_level(90);
        driver.clear_writes();
        animations.enable_level();
        state.level_active.wait_until(true).await;
        state.level_active.wait_until(false).await;

        let lit = [16, 13, 11, 9, 12, 10, 14, 15];
        let mut expected: Vec<(LedId, f32)> = lit.iter().map(|&led| (led, 1.0)).collect();
        expected.extend(lit.iter().rev().map(|&led| (led, 0.0)));
        assert_eq!(sequence(&driver), expected);
    }
}
