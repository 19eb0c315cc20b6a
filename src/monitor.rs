use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::Error;
use log::{debug, warn};
use notify::{recommended_watcher, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::ChargingEvent;

/// Watches the power supply's `online` node and reports plug changes.
pub struct PowerMonitor {
    path: PathBuf,
    interval: Duration,
    online: Option<bool>,
    failing: bool,
}

impl PowerMonitor {
    pub fn new(path: PathBuf, interval: Duration) -> Self {
        Self {
            path,
            interval,
            online: None,
            failing: false,
        }
    }

    fn read_online(&self) -> Result<bool, Error> {
        let raw = std::fs::read_to_string(&self.path)?;
        match raw.trim() {
            "1" => Ok(true),
            "0" => Ok(false),
            other => Err(anyhow::anyhow!("unexpected power supply state {:?}", other)),
        }
    }

    /// Read the node once and return the event for a change of state, if any.
    /// The first successful read reports power that is already connected.
    pub fn poll(&mut self) -> Option<ChargingEvent> {
        let online = match self.read_online() {
            Ok(online) => {
                self.failing = false;
                online
            }
            Err(e) => {
                if !self.failing {
                    warn!("Could not read {}: {}", self.path.display(), e);
                    self.failing = true;
                }
                return None;
            }
        };

        let previous = self.online.replace(online);
        match (previous, online) {
            (Some(was), now) if was == now => None,
            (None, false) => None,
            (_, true) => Some(ChargingEvent::PowerConnected),
            (_, false) => Some(ChargingEvent::PowerDisconnected),
        }
    }

    pub async fn start(mut self, events: mpsc::Sender<ChargingEvent>) {
        let mut ticker = tokio::time::interval(self.interval);
        loop {
            ticker.tick().await;
            if let Some(event) = self.poll() {
                debug!("Power supply: {:?}", event);
                if events.send(event).await.is_err() {
                    break;
                }
            }
        }
    }
}

/// Send [`ChargingEvent::Refresh`] whenever the settings file changes.
///
/// The parent directory is watched rather than the file, so the watch survives
/// editors that replace the file. Keep the returned watcher alive for as long
/// as events are wanted.
pub fn watch_settings(
    path: &Path,
    events: mpsc::Sender<ChargingEvent>,
) -> Result<RecommendedWatcher, Error> {
    let file_name = path
        .file_name()
        .ok_or_else(|| anyhow::anyhow!("{} is not a file", path.display()))?
        .to_owned();
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    };

    let mut watcher = recommended_watcher(move |res: notify::Result<Event>| match res {
        Ok(event) => {
            let touches_settings = event
                .paths
                .iter()
                .any(|p| p.file_name() == Some(file_name.as_os_str()));
            if touches_settings && (event.kind.is_modify() || event.kind.is_create()) {
                if let Err(e) = events.try_send(ChargingEvent::Refresh) {
                    debug!("Dropped settings refresh: {}", e);
                }
            }
        }
        Err(e) => warn!("Settings watch failed: {}", e),
    })?;
    watcher.watch(&dir, RecursiveMode::NonRecursive)?;

    Ok(watcher)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_file(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!(
            "glyph-charging-online-{}-{}",
            name,
            std::process::id()
        ))
    }

    #[test]
    fn test_poll_reports_transitions() {
        let path = scratch_file("transitions");
        let mut monitor = PowerMonitor::new(path.clone(), Duration::from_millis(10));

        // Unreadable node reports nothing
        assert_eq!(monitor.poll(), None);

        std::fs::write(&path, "0\n").unwrap();
        assert_eq!(monitor.poll(), None);

        std::fs::write(&path, "1\n").unwrap();
        assert_eq!(monitor.poll(), Some(ChargingEvent::PowerConnected));
        assert_eq!(monitor.poll(), None);

        std::fs::write(&path, "0\n").unwrap();
        assert_eq!(monitor.poll(), Some(ChargingEvent::PowerDisconnected));
        assert_eq!(monitor.poll(), None);

        std::fs::write(&path, "maybe").unwrap();
        assert_eq!(monitor.poll(), None);

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_already_plugged_in_at_start() {
        let path = scratch_file("plugged");
        std::fs::write(&path, "1").unwrap();

        let mut monitor = PowerMonitor::new(path.clone(), Duration::from_millis(10));
        assert_eq!(monitor.poll(), Some(ChargingEvent::PowerConnected));
        assert_eq!(monitor.poll(), None);

        std::fs::remove_file(path).ok();
    }

    #[tokio::test]
    async fn test_start_sends_events() {
        let path = scratch_file("start");
        std::fs::write(&path, "1").unwrap();

        let (tx, mut rx) = mpsc::channel(4);
        let monitor = PowerMonitor::new(path.clone(), Duration::from_millis(5));
        let handle = tokio::spawn(monitor.start(tx));

        let event = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap();
        assert_eq!(event, Some(ChargingEvent::PowerConnected));

        std::fs::write(&path, "0").unwrap();
        let event = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap();
        assert_eq!(event, Some(ChargingEvent::PowerDisconnected));

        handle.abort();
        std::fs::remove_file(path).ok();
    }

    #[tokio::test]
    async fn test_settings_changes_send_refresh() {
        let dir = std::env::temp_dir().join(format!(
            "glyph-charging-watch-{}",
            std::process::id()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        let settings_path = dir.join("settings.ron");
        std::fs::write(&settings_path, "(dot: false, level: false)").unwrap();

        let (tx, mut rx) = mpsc::channel(16);
        let _watcher = watch_settings(&settings_path, tx).unwrap();

        std::fs::write(&settings_path, "(dot: true, level: false)").unwrap();
        let event = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .unwrap();
        assert_eq!(event, Some(ChargingEvent::Refresh));

        // One write can show up as several events
        tokio::time::sleep(Duration::from_millis(200)).await;
        while rx.try_recv().is_ok() {}

        // Other files in the same directory are ignored
        std::fs::write(dir.join("other.ron"), "()").unwrap();
        let event = tokio::time::timeout(Duration::from_millis(500), rx.recv()).await;
        assert!(event.is_err());

        std::fs::remove_dir_all(dir).ok();
    }
}
