//! Structured reporting of controller lifecycle events.

use std::path::Path;
use std::sync::Arc;

use crate::process::{ControllerError, ControllerState, DaemonExit};
use crate::stage::{ProcessGroupSpec, StartCommand};
use crate::supervisor::{ProcessState, SupervisorError};

const LIFECYCLE_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::lifecycle");

/// Why the controller did not send the shutdown RPC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum ShutdownSkip {
    /// The interrupt already reached the supervisor's process tree.
    Interrupted,
    /// The supervisor never answered, so it is terminated by signal instead.
    Unreachable,
    /// A stop arrived before the supervisor first answered. It is terminated
    /// by signal instead.
    StoppedBeforeReachable,
}

/// Observer for lifecycle events, passed to the controller explicitly.
pub trait LifecycleReporter: Send + Sync {
    /// The controller moved to a new state.
    fn state_entered(&self, state: ControllerState);

    /// The supervisor child process was spawned.
    fn supervisor_spawned(&self, pid: u32);

    /// The supervisor answered its first call.
    fn supervisor_reachable(&self);

    /// A call could not reach the supervisor and will be retried.
    fn connectivity_lost(&self, error: &SupervisorError);

    /// A stage wait began.
    fn stage_waiting(&self, group: &ProcessGroupSpec);

    /// Every instance of a group reached its terminal state.
    fn stage_reached(&self, group: &ProcessGroupSpec);

    /// A start command was accepted.
    fn start_issued(&self, command: &StartCommand);

    /// The main process left its running states.
    fn main_process_exited(&self, process: &str, state: ProcessState);

    /// A graceful stop was requested.
    fn stop_requested(&self);

    /// An interrupt was received.
    fn interrupted(&self);

    /// The watched pool configuration file changed.
    fn pool_config_changed(&self, path: &Path);

    /// The shutdown RPC is about to be sent.
    fn shutdown_requested(&self);

    /// The shutdown RPC was deliberately not sent.
    fn shutdown_skipped(&self, reason: ShutdownSkip);

    /// The shutdown RPC failed.
    fn shutdown_failed(&self, error: &SupervisorError);

    /// The supervisor child exited and was reaped.
    fn supervisor_exited(&self, exit: DaemonExit);

    /// The run ended with an error.
    fn run_failed(&self, error: &ControllerError);
}

impl<T> LifecycleReporter for Arc<T>
where
    T: LifecycleReporter + ?Sized,
{
    fn state_entered(&self, state: ControllerState) {
        (**self).state_entered(state);
    }

    fn supervisor_spawned(&self, pid: u32) {
        (**self).supervisor_spawned(pid);
    }

    fn supervisor_reachable(&self) {
        (**self).supervisor_reachable();
    }

    fn connectivity_lost(&self, error: &SupervisorError) {
        (**self).connectivity_lost(error);
    }

    fn stage_waiting(&self, group: &ProcessGroupSpec) {
        (**self).stage_waiting(group);
    }

    fn stage_reached(&self, group: &ProcessGroupSpec) {
        (**self).stage_reached(group);
    }

    fn start_issued(&self, command: &StartCommand) {
        (**self).start_issued(command);
    }

    fn main_process_exited(&self, process: &str, state: ProcessState) {
        (**self).main_process_exited(process, state);
    }

    fn stop_requested(&self) {
        (**self).stop_requested();
    }

    fn interrupted(&self) {
        (**self).interrupted();
    }

    fn pool_config_changed(&self, path: &Path) {
        (**self).pool_config_changed(path);
    }

    fn shutdown_requested(&self) {
        (**self).shutdown_requested();
    }

    fn shutdown_skipped(&self, reason: ShutdownSkip) {
        (**self).shutdown_skipped(reason);
    }

    fn shutdown_failed(&self, error: &SupervisorError) {
        (**self).shutdown_failed(error);
    }

    fn supervisor_exited(&self, exit: DaemonExit) {
        (**self).supervisor_exited(exit);
    }

    fn run_failed(&self, error: &ControllerError) {
        (**self).run_failed(error);
    }
}

/// Default reporter that records lifecycle events using `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredLifecycleReporter;

impl StructuredLifecycleReporter {
    /// Builds a new reporter.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl LifecycleReporter for StructuredLifecycleReporter {
    fn state_entered(&self, state: ControllerState) {
        tracing::debug!(
            target: LIFECYCLE_TARGET,
            event = "state_entered",
            state = %state,
            "controller state changed"
        );
    }

    fn supervisor_spawned(&self, pid: u32) {
        tracing::info!(
            target: LIFECYCLE_TARGET,
            event = "supervisor_spawned",
            pid,
            "supervisor process spawned"
        );
    }

    fn supervisor_reachable(&self) {
        tracing::info!(
            target: LIFECYCLE_TARGET,
            event = "supervisor_reachable",
            "supervisor is answering calls"
        );
    }

    fn connectivity_lost(&self, error: &SupervisorError) {
        tracing::warn!(
            target: LIFECYCLE_TARGET,
            event = "connectivity_lost",
            error = %error,
            "could not talk to supervisor; retrying"
        );
    }

    fn stage_waiting(&self, group: &ProcessGroupSpec) {
        tracing::info!(
            target: LIFECYCLE_TARGET,
            event = "stage_waiting",
            group = group.name(),
            instances = group.instance_count().get(),
            expected = %group.terminal_state(),
            "waiting for process group"
        );
    }

    fn stage_reached(&self, group: &ProcessGroupSpec) {
        tracing::info!(
            target: LIFECYCLE_TARGET,
            event = "stage_reached",
            group = group.name(),
            state = %group.terminal_state(),
            "process group settled"
        );
    }

    fn start_issued(&self, command: &StartCommand) {
        tracing::info!(
            target: LIFECYCLE_TARGET,
            event = "start_issued",
            command = %command,
            "start command accepted"
        );
    }

    fn main_process_exited(&self, process: &str, state: ProcessState) {
        tracing::info!(
            target: LIFECYCLE_TARGET,
            event = "main_process_exited",
            process,
            state = %state,
            "main process stopped running"
        );
    }

    fn stop_requested(&self) {
        tracing::info!(
            target: LIFECYCLE_TARGET,
            event = "stop_requested",
            "stop requested"
        );
    }

    fn interrupted(&self) {
        tracing::warn!(
            target: LIFECYCLE_TARGET,
            event = "interrupted",
            "interrupt received"
        );
    }

    fn pool_config_changed(&self, path: &Path) {
        tracing::info!(
            target: LIFECYCLE_TARGET,
            event = "pool_config_changed",
            path = %path.display(),
            "pool configuration changed; stopping"
        );
    }

    fn shutdown_requested(&self) {
        tracing::info!(
            target: LIFECYCLE_TARGET,
            event = "shutdown_requested",
            "shutting down supervisor"
        );
    }

    fn shutdown_skipped(&self, reason: ShutdownSkip) {
        tracing::info!(
            target: LIFECYCLE_TARGET,
            event = "shutdown_skipped",
            reason = %reason,
            "not sending supervisor shutdown"
        );
    }

    fn shutdown_failed(&self, error: &SupervisorError) {
        tracing::error!(
            target: LIFECYCLE_TARGET,
            event = "shutdown_failed",
            error = %error,
            "supervisor shutdown call failed"
        );
    }

    fn supervisor_exited(&self, exit: DaemonExit) {
        tracing::info!(
            target: LIFECYCLE_TARGET,
            event = "supervisor_exited",
            code = ?exit.code(),
            "supervisor process exited"
        );
    }

    fn run_failed(&self, error: &ControllerError) {
        tracing::error!(
            target: LIFECYCLE_TARGET,
            event = "run_failed",
            error = %error,
            "controller run failed"
        );
    }
}
