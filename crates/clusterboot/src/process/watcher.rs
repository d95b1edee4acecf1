//! Stops the run when the pool configuration file changes.
//!
//! The autoscaler reads its pool settings once at start. Rather than reload
//! them in place, the controller treats an edit as a graceful stop: the
//! supervisor is shut down normally and the surrounding service manager
//! starts a fresh run against the new file.

use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use thiserror::Error;
use tracing::{info, warn};

use crate::health::LifecycleReporter;

use super::PROCESS_TARGET;
use super::signals::ControlSignals;

/// The pool configuration file could not be watched.
#[derive(Debug, Error)]
#[error("failed to watch pool configuration {}: {source}", .path.display())]
pub struct WatchError {
    /// File that was to be watched.
    pub path: PathBuf,
    /// Underlying watcher error.
    #[source]
    pub source: notify::Error,
}

/// Keeps the pool configuration under watch for as long as it is alive.
///
/// The parent directory is watched rather than the file so that editors
/// which replace the file through a rename are still noticed.
pub struct PoolConfigWatcher {
    _watcher: RecommendedWatcher,
}

impl PoolConfigWatcher {
    /// Starts watching `path`. Any later change to it requests a stop.
    pub fn watch(
        path: &Path,
        signals: ControlSignals,
        reporter: Arc<dyn LifecycleReporter>,
    ) -> Result<Self, WatchError> {
        let failed = |source| WatchError {
            path: path.to_path_buf(),
            source,
        };
        let file_name = path
            .file_name()
            .map(OsString::from)
            .ok_or_else(|| failed(notify::Error::generic("path does not name a file")))?;
        let directory = path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));

        let changed_path = path.to_path_buf();
        let mut watcher = notify::recommended_watcher(
            move |result: notify::Result<Event>| match result {
                Ok(event) if touches(&event, &file_name) => {
                    reporter.pool_config_changed(&changed_path);
                    signals.request_stop();
                }
                Ok(_) => {}
                Err(error) => warn!(
                    target: PROCESS_TARGET,
                    error = %error,
                    "pool configuration watch reported an error"
                ),
            },
        )
        .map_err(failed)?;
        watcher
            .watch(directory, RecursiveMode::NonRecursive)
            .map_err(failed)?;

        info!(
            target: PROCESS_TARGET,
            path = %path.display(),
            "watching pool configuration"
        );
        Ok(Self { _watcher: watcher })
    }
}

fn touches(event: &Event, file_name: &OsStr) -> bool {
    matches!(
        event.kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    ) && event
        .paths
        .iter()
        .any(|changed| changed.file_name() == Some(file_name))
}
