//! Lifecycle state machine around the supervision daemon.

use std::sync::Arc;
use std::time::{Duration, Instant};

use strum::Display;

use clusterboot_config::Config;

use crate::health::{LifecycleReporter, ShutdownSkip};
use crate::stage::{StageError, StageWaiter, StartupPlan, StartupSequencer, WaitTiming};
use crate::supervisor::SupervisorClient;

use super::daemon::{DaemonProcess, SupervisorGuard, SupervisorLauncher};
use super::errors::ControllerError;
use super::signals::{ControlSignals, Wake};

/// Phase of a controller run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum ControllerState {
    /// Spawning the supervisor and waiting for it to answer.
    Bootstrapping,
    /// Starting the process tree and monitoring the main process.
    Running,
    /// Deciding how the supervisor is brought down.
    ShuttingDown,
    /// The supervisor child has been reaped.
    Stopped,
}

/// How a run ended when nothing went wrong.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum RunOutcome {
    /// The main process left its running states on its own.
    Completed,
    /// A graceful stop was requested.
    Stopped,
    /// An interrupt arrived; the shutdown RPC was skipped.
    Interrupted,
}

/// Pacing and naming for one controller run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerSettings {
    /// Process monitored once startup completes.
    pub main_process: String,
    /// Startup stages.
    pub plan: StartupPlan,
    /// Stage wait pacing.
    pub wait: WaitTiming,
    /// Pause between spawning the supervisor and the first ping.
    pub startup_grace: Duration,
    /// Bound on waiting for the supervisor to answer.
    pub bootstrap_timeout: Duration,
    /// Pause between main process polls.
    pub main_poll_interval: Duration,
    /// Pause after a call that could not reach the supervisor.
    pub connectivity_backoff: Duration,
}

impl ControllerSettings {
    /// Reads names, plan and pacing from configuration.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            main_process: config.main_process.clone(),
            plan: StartupPlan::from_config(config),
            wait: WaitTiming::from_config(config),
            startup_grace: config.startup_grace(),
            bootstrap_timeout: config.bootstrap_timeout(),
            main_poll_interval: config.main_poll_interval(),
            connectivity_backoff: config.connectivity_backoff(),
        }
    }
}

/// Drives one run: spawn, start up, monitor, shut down, reap.
///
/// The supervisor child is reaped on every path out of [`run`](Self::run),
/// including spawn-adjacent failures and interrupts. The shutdown RPC is sent
/// at most once and never after an interrupt.
pub struct LifecycleController<L, C> {
    launcher: L,
    client: C,
    reporter: Arc<dyn LifecycleReporter>,
    signals: ControlSignals,
    settings: ControllerSettings,
    reachable: bool,
}

impl<L, C> LifecycleController<L, C>
where
    L: SupervisorLauncher,
    C: SupervisorClient,
{
    /// Builds a controller; nothing is spawned until [`run`](Self::run).
    pub fn new(
        launcher: L,
        client: C,
        reporter: Arc<dyn LifecycleReporter>,
        signals: ControlSignals,
        settings: ControllerSettings,
    ) -> Self {
        Self {
            launcher,
            client,
            reporter,
            signals,
            settings,
            reachable: false,
        }
    }

    /// Runs to completion and returns only after the supervisor has exited.
    pub fn run(mut self) -> Result<RunOutcome, ControllerError> {
        self.enter(ControllerState::Bootstrapping);
        let process = match self.launcher.launch() {
            Ok(process) => process,
            Err(error) => {
                self.enter(ControllerState::Stopped);
                return Err(self.failed(error.into()));
            }
        };
        self.reporter.supervisor_spawned(process.id());
        let mut guard = SupervisorGuard::new(process);

        let result = self.supervise(&mut guard);
        let exit = guard.wait();
        self.enter(ControllerState::Stopped);

        if let Ok(exit) = &exit {
            self.reporter.supervisor_exited(*exit);
        }
        let outcome = result.map_err(|error| self.failed(error))?;
        exit.map_err(|error| self.failed(error))?;
        Ok(outcome)
    }

    fn supervise<P: DaemonProcess>(
        &mut self,
        guard: &mut SupervisorGuard<P>,
    ) -> Result<RunOutcome, ControllerError> {
        let result = self.bootstrap_and_drive();
        self.enter(ControllerState::ShuttingDown);
        if self.signals.interrupted() || matches!(result, Ok(RunOutcome::Interrupted)) {
            self.reporter.shutdown_skipped(ShutdownSkip::Interrupted);
        } else if !self.reachable {
            let reason = if matches!(result, Ok(RunOutcome::Stopped)) {
                ShutdownSkip::StoppedBeforeReachable
            } else {
                ShutdownSkip::Unreachable
            };
            self.reporter.shutdown_skipped(reason);
            guard.terminate();
        } else {
            self.reporter.shutdown_requested();
            if let Err(error) = self.client.shutdown() {
                self.reporter.shutdown_failed(&error);
                guard.terminate();
            }
        }
        result
    }

    fn bootstrap_and_drive(&mut self) -> Result<RunOutcome, ControllerError> {
        if let Some(outcome) = self.bootstrap()? {
            return Ok(outcome);
        }
        self.enter(ControllerState::Running);
        if let Some(outcome) = self.start_up()? {
            return Ok(outcome);
        }
        self.monitor()
    }

    fn bootstrap(&mut self) -> Result<Option<RunOutcome>, ControllerError> {
        if let Some(outcome) = self.pause(self.settings.startup_grace) {
            return Ok(Some(outcome));
        }
        let started = Instant::now();
        loop {
            match self.client.ping() {
                Ok(()) => {
                    self.reachable = true;
                    self.reporter.supervisor_reachable();
                    return Ok(None);
                }
                Err(error) if error.is_connectivity() => {
                    let remaining = self
                        .settings
                        .bootstrap_timeout
                        .saturating_sub(started.elapsed());
                    if remaining.is_zero() {
                        return Err(ControllerError::Unreachable {
                            timeout_ms: self.settings.bootstrap_timeout.as_millis(),
                            source: error,
                        });
                    }
                    self.reporter.connectivity_lost(&error);
                    if let Some(outcome) =
                        self.pause(self.settings.connectivity_backoff.min(remaining))
                    {
                        return Ok(Some(outcome));
                    }
                }
                Err(source) => return Err(ControllerError::PingRejected { source }),
            }
        }
    }

    fn start_up(&self) -> Result<Option<RunOutcome>, ControllerError> {
        let reporter = &*self.reporter;
        let waiter =
            StageWaiter::new(&self.client, reporter, &self.signals).with_timing(self.settings.wait);
        let sequencer = StartupSequencer::new(&self.client, reporter, waiter);
        match sequencer.run(&self.settings.plan) {
            Ok(()) => Ok(None),
            Err(StageError::Interrupted { .. }) => Ok(Some(self.halted(RunOutcome::Interrupted))),
            Err(StageError::StopRequested { .. }) => Ok(Some(self.halted(RunOutcome::Stopped))),
            Err(error) => Err(error.into()),
        }
    }

    fn monitor(&self) -> Result<RunOutcome, ControllerError> {
        let process = self.settings.main_process.as_str();
        loop {
            if let Some(outcome) = self.pause(Duration::ZERO) {
                return Ok(outcome);
            }
            let pause = match self.client.process_state(process) {
                Ok(state) if state.is_active() => self.settings.main_poll_interval,
                Ok(state) => {
                    self.reporter.main_process_exited(process, state);
                    return Ok(RunOutcome::Completed);
                }
                Err(error) if error.is_connectivity() => {
                    self.reporter.connectivity_lost(&error);
                    self.settings.connectivity_backoff
                }
                Err(source) => {
                    return Err(ControllerError::Monitor {
                        process: process.to_owned(),
                        source,
                    });
                }
            };
            if let Some(outcome) = self.pause(pause) {
                return Ok(outcome);
            }
        }
    }

    fn pause(&self, duration: Duration) -> Option<RunOutcome> {
        match self.signals.sleep(duration) {
            Wake::Elapsed => None,
            Wake::Stopped => Some(self.halted(RunOutcome::Stopped)),
            Wake::Interrupted => Some(self.halted(RunOutcome::Interrupted)),
        }
    }

    fn halted(&self, outcome: RunOutcome) -> RunOutcome {
        match outcome {
            RunOutcome::Stopped => self.reporter.stop_requested(),
            RunOutcome::Interrupted => self.reporter.interrupted(),
            RunOutcome::Completed => {}
        }
        outcome
    }

    fn enter(&self, state: ControllerState) {
        self.reporter.state_entered(state);
    }

    fn failed(&self, error: ControllerError) -> ControllerError {
        self.reporter.run_failed(&error);
        error
    }
}
