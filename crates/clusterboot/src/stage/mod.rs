//! Ordered startup of dependent process groups.
//!
//! A [`StartupPlan`] is a list of [`OrchestrationStage`]s. Each stage may issue
//! a start command and then blocks in [`StageWaiter::wait_for`] until every
//! group it names reaches its terminal state.

mod errors;
mod group;
mod sequencer;
mod waiter;

pub use errors::StageError;
pub use group::{OrchestrationStage, ProcessGroupSpec, StartCommand, StateClass, TerminalState};
pub use sequencer::{StartupPlan, StartupSequencer};
pub use waiter::{StageWaiter, WaitTiming};
