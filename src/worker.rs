use std::sync::Arc;

use log::{debug, error};
use tokio::sync::mpsc;

use crate::{
    animation::{dot, level, AnimationKind, Animations},
    driver::LedDriver,
    state::IndicatorState,
    ChargingEvent,
};

/// Runs animation bodies one at a time, in the order they were requested.
///
/// A queued animation only starts once the one before it has returned, so the
/// two kinds never drive the LEDs at the same time.
pub struct AnimationWorker {
    jobs: mpsc::UnboundedReceiver<AnimationKind>,
    state: Arc<IndicatorState>,
    driver: Arc<dyn LedDriver>,
    fault_reports: Option<mpsc::Sender<ChargingEvent>>,
}

impl AnimationWorker {
    /// Create the worker together with the handle that feeds it.
    pub fn new(state: Arc<IndicatorState>, driver: Arc<dyn LedDriver>) -> (Animations, Self) {
        let (jobs_tx, jobs_rx) = mpsc::unbounded_channel();
        let animations = Animations::new(state.clone(), jobs_tx);
        let worker = Self {
            jobs: jobs_rx,
            state,
            driver,
            fault_reports: None,
        };
        (animations, worker)
    }

    /// Report fatal device failures as [`ChargingEvent::DeviceFault`] on
    /// `events`.
    pub fn with_fault_reports(mut self, events: mpsc::Sender<ChargingEvent>) -> Self {
        self.fault_reports = Some(events);
        self
    }

    /// Process animations until every [`Animations`] handle is dropped.
    pub async fn start(mut self) {
        while let Some(kind) = self.jobs.recv().await {
            debug!("Starting the {} animation", kind);

            let result = match kind {
                AnimationKind::Dot => dot::run(&self.state, self.driver.as_ref()).await,
                AnimationKind::Level => level::run(&self.state, self.driver.as_ref()).await,
            };

            if let Err(err) = result {
                error!("The {} animation lost the LED device: {}", kind, err);
                match &self.fault_reports {
                    Some(events) => {
                        if events
                            .send(ChargingEvent::DeviceFault(err.to_string()))
                            .await
                            .is_err()
                        {
                            error!("Nobody is listening for device faults");
                        }
                    }
                    // No coordinator to tell, stop what we can ourselves
                    None => {
                        self.state.dot_enabled.set(false);
                        self.state.level_enabled.set(false);
                    }
                }
            }
        }

        debug!("Animation worker stopped");
    }
}
