use std::sync::Arc;

use anyhow::Error;
use glyph_charging::prelude::*;
use glyph_charging::{control, ChargingEvent};
use log::{error, info, warn};
use tokio::sync::mpsc;

// Coordinator decisions and animation state changes only interleave at
// `.await` points on a single-threaded runtime.
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Error> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // Load the config file
    info!("Starting config...");
    let config = Config::load()?;
    let driver = config.build_driver();

    // Event queue
    let (events_tx, events_rx) = mpsc::channel(100);

    info!("Starting animation worker...");
    let state = Arc::new(IndicatorState::new());
    let (animations, worker) = AnimationWorker::new(state, driver.clone());
    let worker_handle = tokio::spawn(worker.with_fault_reports(events_tx.clone()).start());

    info!("Starting listener...");
    let settings = Arc::new(RonSettings::new(config.settings_path.clone()));
    let coordinator = ChargingCoordinator::new(animations, settings);
    let listener = PowerEventListener::new(coordinator, driver);
    let listener_handle = tokio::spawn(listener.start(events_rx));

    // Kept alive until the end of main
    let _settings_watcher = match watch_settings(&config.settings_path, events_tx.clone()) {
        Ok(watcher) => Some(watcher),
        Err(e) => {
            warn!("Not watching settings for changes: {}", e);
            None
        }
    };

    if let Some(path) = config.control_socket.clone() {
        info!("Starting control socket...");
        let tx_clone = events_tx.clone();
        std::thread::spawn(move || {
            if let Err(e) = control::serve(&path, tx_clone) {
                error!("Control socket failed: {}", e);
            }
        });
    }

    info!("Starting power monitor...");
    let monitor = PowerMonitor::new(config.power_supply_path.clone(), config.poll_interval());
    let monitor_handle = tokio::spawn(monitor.start(events_tx.clone()));

    tokio::signal::ctrl_c().await?;

    monitor_handle.abort();
    events_tx.send(ChargingEvent::Shutdown).await?;
    listener_handle.await?;

    // The listener owned the last animation handle, so the worker drains its
    // queue and returns
    drop(events_tx);
    if tokio::time::timeout(SHUTDOWN_GRACE, worker_handle).await.is_err() {
        warn!("Animation worker did not stop in time");
    }

    Ok(())
}
