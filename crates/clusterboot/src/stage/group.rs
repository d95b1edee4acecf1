use std::fmt;
use std::num::NonZeroU32;

use strum::{Display, EnumString};

use crate::supervisor::{ProcessState, SupervisorClient, SupervisorError, instance_name};

/// Goal state marking a group's stage as complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum TerminalState {
    /// Long-lived services are done starting once they run.
    Running,
    /// Run-once preparation steps are done once they exit.
    Exited,
}

impl TerminalState {
    const fn process_state(self) -> ProcessState {
        match self {
            Self::Running => ProcessState::Running,
            Self::Exited => ProcessState::Exited,
        }
    }
}

/// Bucket a reported state falls into, relative to one group's goal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateClass {
    /// The process failed to start and will not recover.
    Fatal,
    /// The group's terminal state.
    Terminal,
    /// Anything else; keep polling.
    Pending,
}

/// A named set of identical process instances and the state they must reach.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessGroupSpec {
    name: String,
    instance_count: NonZeroU32,
    terminal_state: TerminalState,
}

impl ProcessGroupSpec {
    /// Describes a group.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        instance_count: NonZeroU32,
        terminal_state: TerminalState,
    ) -> Self {
        Self {
            name: name.into(),
            instance_count,
            terminal_state,
        }
    }

    /// Group name as registered with the supervisor.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of instances the supervisor runs.
    #[must_use]
    pub const fn instance_count(&self) -> NonZeroU32 {
        self.instance_count
    }

    /// State every instance must reach.
    #[must_use]
    pub const fn terminal_state(&self) -> TerminalState {
        self.terminal_state
    }

    /// Supervisor names of every instance, in index order.
    pub fn instance_names(&self) -> impl Iterator<Item = String> + '_ {
        (0..self.instance_count.get()).map(|index| instance_name(&self.name, index))
    }

    /// Buckets a reported state for this group.
    ///
    /// `FATAL` wins over everything; the terminal state is checked next.
    #[must_use]
    pub fn classify(&self, state: ProcessState) -> StateClass {
        if state == ProcessState::Fatal {
            StateClass::Fatal
        } else if state == self.terminal_state.process_state() {
            StateClass::Terminal
        } else {
            StateClass::Pending
        }
    }
}

/// Start command issued at the head of a stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartCommand {
    /// `supervisor.startProcessGroup`.
    Group(String),
    /// `supervisor.startProcess`.
    Process(String),
}

impl StartCommand {
    pub(crate) fn issue(&self, client: &dyn SupervisorClient) -> Result<(), SupervisorError> {
        match self {
            Self::Group(name) => client.start_group(name),
            Self::Process(name) => client.start_process(name),
        }
    }
}

impl fmt::Display for StartCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Group(name) => write!(f, "group {name}"),
            Self::Process(name) => write!(f, "process {name}"),
        }
    }
}

/// One ordered step of the startup sequence.
///
/// The start command, when present, is issued before any group is waited on.
/// Every group must reach its terminal state before the next stage begins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrchestrationStage {
    start: Option<StartCommand>,
    groups: Vec<ProcessGroupSpec>,
}

impl OrchestrationStage {
    /// A stage that only waits.
    #[must_use]
    pub fn wait_for(groups: Vec<ProcessGroupSpec>) -> Self {
        Self {
            start: None,
            groups,
        }
    }

    /// A stage that issues `command` and then waits for `groups`.
    #[must_use]
    pub fn start_then_wait(command: StartCommand, groups: Vec<ProcessGroupSpec>) -> Self {
        Self {
            start: Some(command),
            groups,
        }
    }

    /// Start command issued before the wait, if any.
    #[must_use]
    pub fn start(&self) -> Option<&StartCommand> {
        self.start.as_ref()
    }

    /// Groups waited on, in order.
    #[must_use]
    pub fn groups(&self) -> &[ProcessGroupSpec] {
        &self.groups
    }
}
