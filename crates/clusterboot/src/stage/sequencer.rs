//! Drives the fixed startup order: fetch, run, main.

use clusterboot_config::Config;

use crate::health::LifecycleReporter;
use crate::supervisor::SupervisorClient;

use super::errors::StageError;
use super::group::{OrchestrationStage, ProcessGroupSpec, StartCommand, TerminalState};
use super::waiter::StageWaiter;

/// Ordered stages executed by [`StartupSequencer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartupPlan {
    stages: Vec<OrchestrationStage>,
}

impl StartupPlan {
    /// Builds a plan from explicit stages.
    #[must_use]
    pub fn new(stages: Vec<OrchestrationStage>) -> Self {
        Self { stages }
    }

    /// The signal stack's plan.
    ///
    /// 1. Wait for the fetch group to exit.
    /// 2. Start the run group and wait for it to run.
    /// 3. Start the main process; monitoring takes over from there.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        let fetch = ProcessGroupSpec::new(
            config.fetch_group.clone(),
            config.fetch_process_count,
            TerminalState::Exited,
        );
        let run = ProcessGroupSpec::new(
            config.run_group.clone(),
            config.run_process_count,
            TerminalState::Running,
        );
        Self::new(vec![
            OrchestrationStage::wait_for(vec![fetch]),
            OrchestrationStage::start_then_wait(
                StartCommand::Group(config.run_group.clone()),
                vec![run],
            ),
            OrchestrationStage::start_then_wait(
                StartCommand::Process(config.main_process.clone()),
                Vec::new(),
            ),
        ])
    }

    /// Stages in execution order.
    #[must_use]
    pub fn stages(&self) -> &[OrchestrationStage] {
        &self.stages
    }
}

/// Executes a [`StartupPlan`] stage by stage.
pub struct StartupSequencer<'a> {
    client: &'a dyn SupervisorClient,
    reporter: &'a dyn LifecycleReporter,
    waiter: StageWaiter<'a>,
}

impl<'a> StartupSequencer<'a> {
    /// Builds a sequencer issuing commands through `client`.
    #[must_use]
    pub fn new(
        client: &'a dyn SupervisorClient,
        reporter: &'a dyn LifecycleReporter,
        waiter: StageWaiter<'a>,
    ) -> Self {
        Self {
            client,
            reporter,
            waiter,
        }
    }

    /// Runs every stage in order; the first failure aborts the rest.
    pub fn run(&self, plan: &StartupPlan) -> Result<(), StageError> {
        for stage in plan.stages() {
            if let Some(command) = stage.start() {
                command
                    .issue(self.client)
                    .map_err(|source| StageError::Start {
                        target: command.to_string(),
                        source,
                    })?;
                self.reporter.start_issued(command);
            }
            for group in stage.groups() {
                self.waiter.wait_for(group)?;
            }
        }
        Ok(())
    }
}
