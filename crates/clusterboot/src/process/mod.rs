//! Supervisor process ownership, control signals and the lifecycle
//! controller.

mod controller;
mod daemon;
mod errors;
pub(crate) mod launch;
mod signals;
mod watcher;

pub use controller::{ControllerSettings, ControllerState, LifecycleController, RunOutcome};
pub use daemon::{
    CHILD_ARGUMENTS_ENV, DaemonExit, DaemonProcess, SupervisorGuard, SupervisorLauncher,
    SystemDaemon, SystemLauncher,
};
pub use errors::{ControllerError, LaunchError, SpawnError};
pub use launch::{ConfigLoader, SystemConfigLoader, run_controller};
pub use signals::{ControlSignals, SignalError, SystemControlSignals, Wake};
pub use watcher::{PoolConfigWatcher, WatchError};

pub(crate) const PROCESS_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::process");
