//! Polls a process group until it settles.

use std::time::{Duration, Instant};

use clusterboot_config::Config;
use clusterboot_config::defaults::{DEFAULT_CONNECTIVITY_BACKOFF_MS, DEFAULT_POLL_INTERVAL_MS};

use crate::health::LifecycleReporter;
use crate::process::{ControlSignals, Wake};
use crate::supervisor::{SupervisorClient, SupervisorError};

use super::errors::StageError;
use super::group::{ProcessGroupSpec, StateClass};

/// Pacing for stage waits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitTiming {
    /// Pause between polls while the group is pending.
    pub poll_interval: Duration,
    /// Pause after a poll that could not reach the supervisor.
    pub connectivity_backoff: Duration,
    /// Bound on a whole wait. `None` waits forever.
    pub timeout: Option<Duration>,
}

impl WaitTiming {
    /// Reads pacing from configuration.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            poll_interval: config.poll_interval(),
            connectivity_backoff: config.connectivity_backoff(),
            timeout: config.stage_timeout(),
        }
    }
}

impl Default for WaitTiming {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            connectivity_backoff: Duration::from_millis(DEFAULT_CONNECTIVITY_BACKOFF_MS),
            timeout: None,
        }
    }
}

enum Poll {
    Reached,
    Pending,
    Unreachable(SupervisorError),
}

/// Blocks until every instance of a group reaches the group's terminal state.
///
/// A `FATAL` instance fails the wait at once. Connectivity failures are
/// reported and retried; they never fail the wait on their own.
pub struct StageWaiter<'a> {
    client: &'a dyn SupervisorClient,
    reporter: &'a dyn LifecycleReporter,
    signals: &'a ControlSignals,
    timing: WaitTiming,
}

impl<'a> StageWaiter<'a> {
    /// Builds a waiter with default pacing and no overall bound.
    #[must_use]
    pub fn new(
        client: &'a dyn SupervisorClient,
        reporter: &'a dyn LifecycleReporter,
        signals: &'a ControlSignals,
    ) -> Self {
        Self {
            client,
            reporter,
            signals,
            timing: WaitTiming::default(),
        }
    }

    /// Replaces the pacing.
    #[must_use]
    pub fn with_timing(mut self, timing: WaitTiming) -> Self {
        self.timing = timing;
        self
    }

    /// Bounds each wait to `timeout`.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timing.timeout = Some(timeout);
        self
    }

    /// Waits for `group` to settle.
    pub fn wait_for(&self, group: &ProcessGroupSpec) -> Result<(), StageError> {
        self.reporter.stage_waiting(group);
        let started = Instant::now();
        loop {
            let pause = match self.poll(group)? {
                Poll::Reached => {
                    self.reporter.stage_reached(group);
                    return Ok(());
                }
                Poll::Pending => self.timing.poll_interval,
                Poll::Unreachable(error) => {
                    self.reporter.connectivity_lost(&error);
                    self.timing.connectivity_backoff
                }
            };
            let pause = match self.timing.timeout {
                Some(timeout) => {
                    let remaining = timeout.saturating_sub(started.elapsed());
                    if remaining.is_zero() {
                        return Err(StageError::TimedOut {
                            group: group.name().to_owned(),
                            expected: group.terminal_state(),
                            timeout_ms: timeout.as_millis(),
                        });
                    }
                    pause.min(remaining)
                }
                None => pause,
            };
            self.pause(group, pause)?;
        }
    }

    fn poll(&self, group: &ProcessGroupSpec) -> Result<Poll, StageError> {
        let mut settled = true;
        for instance in group.instance_names() {
            let state = match self.client.process_state(&instance) {
                Ok(state) => state,
                Err(error) if error.is_connectivity() => return Ok(Poll::Unreachable(error)),
                Err(source) => {
                    return Err(StageError::Supervisor {
                        group: group.name().to_owned(),
                        source,
                    });
                }
            };
            match group.classify(state) {
                StateClass::Fatal => {
                    return Err(StageError::ProcessFailed {
                        group: group.name().to_owned(),
                        instance,
                        state,
                    });
                }
                StateClass::Terminal => {}
                StateClass::Pending => settled = false,
            }
        }
        Ok(if settled { Poll::Reached } else { Poll::Pending })
    }

    fn pause(&self, group: &ProcessGroupSpec, duration: Duration) -> Result<(), StageError> {
        match self.signals.sleep(duration) {
            Wake::Elapsed => Ok(()),
            Wake::Stopped => Err(StageError::StopRequested {
                group: group.name().to_owned(),
            }),
            Wake::Interrupted => Err(StageError::Interrupted {
                group: group.name().to_owned(),
            }),
        }
    }
}
