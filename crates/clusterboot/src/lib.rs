//! Staged startup controller for a supervisord-managed process tree.
//!
//! The controller spawns the supervision daemon, waits for it to answer
//! XML-RPC calls, and then brings the process tree up in a fixed order: the
//! fetch group runs to completion, the run group is started and waits until
//! every instance is running, and finally the main process is started. The
//! main process is then polled until it exits or the controller is asked to
//! stop.
//!
//! Whatever ends the run, the daemon child is reaped before control returns.
//! A graceful end sends `supervisor.shutdown` first. An interrupt does not,
//! because the interrupt already reached the daemon's process tree.
//!
//! Lifecycle events are surfaced through [`LifecycleReporter`];
//! [`StructuredLifecycleReporter`] records them with `tracing`.

mod health;
pub mod process;
pub mod stage;
pub mod supervisor;
mod telemetry;

pub use health::{LifecycleReporter, ShutdownSkip, StructuredLifecycleReporter};
pub use process::{ControllerError, LaunchError, RunOutcome, run_controller};
pub use telemetry::{TelemetryError, TelemetryHandle};

#[cfg(test)]
mod tests;
