//! Error surface for launching and supervising the controller run.

use std::io;
use std::sync::Arc;

use ortho_config::OrthoError;
use thiserror::Error;

use crate::stage::StageError;
use crate::supervisor::SupervisorError;
use crate::telemetry::TelemetryError;

use super::signals::SignalError;
use super::watcher::WatchError;

/// The supervisor executable could not be started.
#[derive(Debug, Error)]
#[error("failed to spawn supervisor '{binary}': {source}")]
pub struct SpawnError {
    /// Executable that was launched.
    pub binary: String,
    /// Underlying IO error.
    #[source]
    pub source: io::Error,
}

/// Structural failures of a controller run.
///
/// Every variant is returned only after the supervisor child, if one was
/// spawned, has been reaped.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// Spawning the supervisor failed.
    #[error(transparent)]
    Spawn(#[from] SpawnError),
    /// The supervisor never answered within the bootstrap bound.
    #[error("supervisor unreachable after {timeout_ms} ms: {source}")]
    Unreachable {
        /// Configured bound.
        timeout_ms: u128,
        /// Last connectivity failure.
        #[source]
        source: SupervisorError,
    },
    /// The reachability ping was answered with an error.
    #[error("supervisor rejected the reachability ping: {source}")]
    PingRejected {
        /// Underlying client error.
        #[source]
        source: SupervisorError,
    },
    /// The startup sequence failed.
    #[error("startup failed: {source}")]
    Startup {
        /// Underlying stage error.
        #[source]
        source: StageError,
    },
    /// Monitoring the main process failed.
    #[error("failed to monitor {process}: {source}")]
    Monitor {
        /// Main process name.
        process: String,
        /// Underlying client error.
        #[source]
        source: SupervisorError,
    },
    /// Waiting for the supervisor child failed.
    #[error("failed to reap supervisor process {pid}: {source}")]
    Reap {
        /// Supervisor process id.
        pid: u32,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

impl From<StageError> for ControllerError {
    fn from(source: StageError) -> Self {
        Self::Startup { source }
    }
}

/// Errors surfaced by the binary's entry point.
#[derive(Debug, Error)]
pub enum LaunchError {
    /// Configuration failed to load.
    #[error("failed to load configuration: {source}")]
    Config {
        /// Underlying loader error.
        #[source]
        source: Arc<OrthoError>,
    },
    /// Telemetry initialisation failed.
    #[error("failed to initialise telemetry: {source}")]
    Telemetry {
        /// Underlying telemetry error.
        #[source]
        source: TelemetryError,
    },
    /// Signal handlers could not be installed.
    #[error(transparent)]
    Signals(#[from] SignalError),
    /// The pool configuration could not be watched.
    #[error(transparent)]
    Watch(#[from] WatchError),
    /// The supervisor client could not be built.
    #[error("failed to prepare supervisor client: {source}")]
    Client {
        /// Underlying client error.
        #[source]
        source: SupervisorError,
    },
    /// The controller run failed.
    #[error(transparent)]
    Controller(#[from] ControllerError),
}

impl From<Arc<OrthoError>> for LaunchError {
    fn from(source: Arc<OrthoError>) -> Self {
        Self::Config { source }
    }
}

impl From<TelemetryError> for LaunchError {
    fn from(source: TelemetryError) -> Self {
        Self::Telemetry { source }
    }
}

impl From<SupervisorError> for LaunchError {
    fn from(source: SupervisorError) -> Self {
        Self::Client { source }
    }
}
