//! Configuration file watcher for hot reload.
//!
//! The parent directory is watched rather than the file itself, so editors
//! that save by renaming a temp file over the original are still seen.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::loader::parse_config;
use crate::config::schema::MockConfig;

/// Monitors one config file and emits each valid new version.
pub struct ConfigWatcher {
    path: PathBuf,
    update_tx: mpsc::UnboundedSender<MockConfig>,
}

impl ConfigWatcher {
    /// Returns the watcher and the receiving end for reloaded configs.
    pub fn new(path: &Path) -> (Self, mpsc::UnboundedReceiver<MockConfig>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();
        (
            Self {
                path: path.to_path_buf(),
                update_tx,
            },
            update_rx,
        )
    }

    /// Start watching. Dropping the returned handle stops it.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let tx = self.update_tx;
        let path = self.path.clone();
        let mut last = fs::read_to_string(&path).ok();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    let relevant = (event.kind.is_modify() || event.kind.is_create())
                        && event.paths.iter().any(|p| p.file_name() == path.file_name());
                    if !relevant {
                        return;
                    }
                    let Ok(content) = fs::read_to_string(&path) else {
                        return;
                    };
                    if last.as_deref() == Some(content.as_str()) {
                        return;
                    }
                    tracing::info!(path = %path.display(), "Config file changed, reloading");
                    match parse_config(&content) {
                        Ok(config) => {
                            last = Some(content);
                            if tx.send(config).is_err() {
                                tracing::debug!("Config receiver dropped");
                            }
                        }
                        Err(e) => {
                            tracing::error!(error = %e, "Config reload rejected, keeping current configuration");
                        }
                    }
                }
                Err(e) => tracing::error!(error = %e, "Config watch error"),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        let dir = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
            _ => PathBuf::from("."),
        };
        watcher.watch(&dir, RecursiveMode::NonRecursive)?;

        tracing::info!(path = %self.path.display(), "Config watcher started");
        Ok(watcher)
    }
}
