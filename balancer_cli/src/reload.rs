//! Config file watcher.
//!
//! A background thread re-reads the config file every poll interval. When the
//! text changes and still validates, the differences in `[controller]` are
//! sent to the runner as `ConfigChange`s. The thread is shut down and joined
//! when the `ConfigWatcher` is dropped.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use balancer_core::{ConfigChange, ControllerCfg};
use crossbeam_channel as xch;

const SLEEP_SLICE: Duration = Duration::from_millis(50);

pub struct ConfigWatcher {
    shutdown: Arc<AtomicBool>,
    join_handle: Option<std::thread::JoinHandle<()>>,
}

fn parse_controller(text: &str) -> eyre::Result<ControllerCfg> {
    let cfg = balancer_config::load_toml(text)?;
    cfg.validate()?;
    Ok((&cfg.controller).into())
}

fn sleep_unless_shutdown(total: Duration, shutdown: &AtomicBool) {
    let mut left = total;
    while !left.is_zero() && !shutdown.load(Ordering::Relaxed) {
        let step = left.min(SLEEP_SLICE);
        std::thread::sleep(step);
        left -= step;
    }
}

impl ConfigWatcher {
    /// Watch `path`, starting from the settings in `current`.
    ///
    /// The first poll always parses the file and diffs it against `current`,
    /// so edits made after `current` was loaded are never lost.
    pub fn spawn(
        path: PathBuf,
        poll: Duration,
        current: ControllerCfg,
        tx: xch::Sender<ConfigChange>,
    ) -> Self {
        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_clone = shutdown.clone();

        let join_handle = std::thread::spawn(move || {
            let mut current = current;
            let mut read_failing = false;
            let mut last_text: Option<String> = None;
            loop {
                sleep_unless_shutdown(poll, &shutdown_clone);
                if shutdown_clone.load(Ordering::Relaxed) {
                    tracing::debug!("config watcher received shutdown signal");
                    break;
                }

                let text = match std::fs::read_to_string(&path) {
                    Ok(t) => {
                        read_failing = false;
                        t
                    }
                    Err(e) => {
                        if !read_failing {
                            tracing::warn!(path = %path.display(), error = %e, "config re-read failed");
                        }
                        read_failing = true;
                        continue;
                    }
                };
                if last_text.as_deref() == Some(text.as_str()) {
                    continue;
                }

                let next = match parse_controller(&text) {
                    Ok(c) => c,
                    Err(e) => {
                        tracing::warn!(error = %e, "changed config rejected; keeping current settings");
                        last_text = Some(text);
                        continue;
                    }
                };
                last_text = Some(text);

                let changes = ConfigChange::diff(&current, &next);
                if !changes.is_empty() {
                    tracing::info!(changes = changes.len(), "config file changed");
                }
                for change in changes {
                    if tx.send(change).is_err() {
                        tracing::debug!("config change consumer disconnected, exiting watcher");
                        return;
                    }
                }
                current = next;
            }
        });

        Self {
            shutdown,
            join_handle: Some(join_handle),
        }
    }
}

impl Drop for ConfigWatcher {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        if let Some(handle) = self.join_handle.take()
            && let Err(e) = handle.join()
        {
            tracing::warn!(?e, "config watcher thread panicked during shutdown");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const POLL: Duration = Duration::from_millis(10);
    const WAIT: Duration = Duration::from_secs(5);

    #[test]
    fn edited_controller_section_is_sent_as_changes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cfg.toml");
        fs::write(&path, "[controller]\nactive_power_offset = 0\n").unwrap();

        let (tx, rx) = xch::unbounded();
        let _w = ConfigWatcher::spawn(path.clone(), POLL, ControllerCfg::default(), tx);

        fs::write(
            &path,
            "[controller]\nactive_power_offset = 75\nreactive_power_activated = false\n",
        )
        .unwrap();

        assert_eq!(
            rx.recv_timeout(WAIT).unwrap(),
            ConfigChange::ActivePowerOffset(75)
        );
        assert_eq!(
            rx.recv_timeout(WAIT).unwrap(),
            ConfigChange::ReactivePowerActivated(false)
        );
    }

    #[test]
    fn invalid_edit_is_ignored_until_fixed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cfg.toml");
        fs::write(&path, "").unwrap();

        let (tx, rx) = xch::unbounded();
        let _w = ConfigWatcher::spawn(path.clone(), POLL, ControllerCfg::default(), tx);

        fs::write(&path, "[controller]\nactive_power_offset = 5\n[runner]\nperiod_ms = 0\n").unwrap();
        assert!(rx.recv_timeout(Duration::from_millis(300)).is_err());

        fs::write(&path, "[controller]\nactive_power_offset = 5\n").unwrap();
        assert_eq!(
            rx.recv_timeout(WAIT).unwrap(),
            ConfigChange::ActivePowerOffset(5)
        );
    }

    #[test]
    fn edit_made_before_spawn_is_sent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cfg.toml");
        // `current` reflects the file as it was loaded; it has since changed
        fs::write(&path, "[controller]\nactive_power_offset = 40\n").unwrap();

        let (tx, rx) = xch::unbounded();
        let _w = ConfigWatcher::spawn(path, POLL, ControllerCfg::default(), tx);

        assert_eq!(
            rx.recv_timeout(WAIT).unwrap(),
            ConfigChange::ActivePowerOffset(40)
        );
    }

    #[test]
    fn unchanged_file_sends_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cfg.toml");
        fs::write(&path, "[controller]\nactive_power_offset = 0\n").unwrap();

        let (tx, rx) = xch::unbounded();
        let _w = ConfigWatcher::spawn(path, POLL, ControllerCfg::default(), tx);

        assert!(rx.recv_timeout(Duration::from_millis(300)).is_err());
    }

    #[test]
    fn drop_joins_thread_promptly() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cfg.toml");
        fs::write(&path, "").unwrap();
        let (tx, _rx) = xch::unbounded();
        let w = ConfigWatcher::spawn(path, Duration::from_secs(60), ControllerCfg::default(), tx);
        let t0 = std::time::Instant::now();
        drop(w);
        assert!(t0.elapsed() < Duration::from_secs(2));
    }
}
