use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::health::{LifecycleReporter, ShutdownSkip};
use crate::process::{ControllerError, ControllerState, DaemonExit};
use crate::stage::{ProcessGroupSpec, StartCommand};
use crate::supervisor::{ProcessState, SupervisorError};

/// Lifecycle event captured by [`RecordingLifecycleReporter`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReporterEvent {
    StateEntered(ControllerState),
    SupervisorSpawned(u32),
    SupervisorReachable,
    ConnectivityLost,
    StageWaiting(String),
    StageReached(String),
    StartIssued(String),
    MainProcessExited(String, ProcessState),
    StopRequested,
    Interrupted,
    PoolConfigChanged(PathBuf),
    ShutdownRequested,
    ShutdownSkipped(ShutdownSkip),
    ShutdownFailed,
    SupervisorExited(Option<i32>),
    RunFailed(String),
}

/// Reporter that keeps every event for later assertions.
#[derive(Debug, Default)]
pub struct RecordingLifecycleReporter {
    events: Mutex<Vec<ReporterEvent>>,
}

impl RecordingLifecycleReporter {
    pub fn events(&self) -> Vec<ReporterEvent> {
        self.events
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    pub fn contains(&self, event: &ReporterEvent) -> bool {
        self.events().contains(event)
    }

    pub fn count(&self, predicate: impl Fn(&ReporterEvent) -> bool) -> usize {
        self.events().iter().filter(|event| predicate(event)).count()
    }

    /// Controller states in the order they were entered.
    pub fn states(&self) -> Vec<ControllerState> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                ReporterEvent::StateEntered(state) => Some(state),
                _ => None,
            })
            .collect()
    }

    fn push(&self, event: ReporterEvent) {
        self.events
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(event);
    }
}

impl LifecycleReporter for RecordingLifecycleReporter {
    fn state_entered(&self, state: ControllerState) {
        self.push(ReporterEvent::StateEntered(state));
    }

    fn supervisor_spawned(&self, pid: u32) {
        self.push(ReporterEvent::SupervisorSpawned(pid));
    }

    fn supervisor_reachable(&self) {
        self.push(ReporterEvent::SupervisorReachable);
    }

    fn connectivity_lost(&self, _error: &SupervisorError) {
        self.push(ReporterEvent::ConnectivityLost);
    }

    fn stage_waiting(&self, group: &ProcessGroupSpec) {
        self.push(ReporterEvent::StageWaiting(group.name().to_owned()));
    }

    fn stage_reached(&self, group: &ProcessGroupSpec) {
        self.push(ReporterEvent::StageReached(group.name().to_owned()));
    }

    fn start_issued(&self, command: &StartCommand) {
        self.push(ReporterEvent::StartIssued(command.to_string()));
    }

    fn main_process_exited(&self, process: &str, state: ProcessState) {
        self.push(ReporterEvent::MainProcessExited(process.to_owned(), state));
    }

    fn stop_requested(&self) {
        self.push(ReporterEvent::StopRequested);
    }

    fn interrupted(&self) {
        self.push(ReporterEvent::Interrupted);
    }

    fn pool_config_changed(&self, path: &Path) {
        self.push(ReporterEvent::PoolConfigChanged(path.to_path_buf()));
    }

    fn shutdown_requested(&self) {
        self.push(ReporterEvent::ShutdownRequested);
    }

    fn shutdown_skipped(&self, reason: ShutdownSkip) {
        self.push(ReporterEvent::ShutdownSkipped(reason));
    }

    fn shutdown_failed(&self, _error: &SupervisorError) {
        self.push(ReporterEvent::ShutdownFailed);
    }

    fn supervisor_exited(&self, exit: DaemonExit) {
        self.push(ReporterEvent::SupervisorExited(exit.code()));
    }

    fn run_failed(&self, error: &ControllerError) {
        self.push(ReporterEvent::RunFailed(error.to_string()));
    }
}
