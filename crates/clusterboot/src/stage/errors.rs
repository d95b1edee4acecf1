use thiserror::Error;

use crate::supervisor::{ProcessState, SupervisorError};

use super::group::TerminalState;

/// Errors that abort the startup sequence.
#[derive(Debug, Error)]
pub enum StageError {
    /// An instance reported a state it will not recover from.
    #[error("process {instance} in group {group} could not start ({state}); aborting")]
    ProcessFailed {
        /// Group being waited on.
        group: String,
        /// Instance that failed.
        instance: String,
        /// State it reported.
        state: ProcessState,
    },
    /// The supervisor answered a state query with an error.
    #[error("querying group {group} failed: {source}")]
    Supervisor {
        /// Group being waited on.
        group: String,
        /// Underlying client error.
        #[source]
        source: SupervisorError,
    },
    /// A start command was rejected.
    #[error("failed to start {target}: {source}")]
    Start {
        /// Description of the start command.
        target: String,
        /// Underlying client error.
        #[source]
        source: SupervisorError,
    },
    /// The optional wait bound expired.
    #[error("group {group} did not reach {expected} within {timeout_ms} ms")]
    TimedOut {
        /// Group being waited on.
        group: String,
        /// State the group was expected to reach.
        expected: TerminalState,
        /// Configured bound.
        timeout_ms: u128,
    },
    /// An interrupt arrived while waiting.
    #[error("interrupted while waiting for group {group}")]
    Interrupted {
        /// Group being waited on.
        group: String,
    },
    /// A stop was requested while waiting.
    #[error("stop requested while waiting for group {group}")]
    StopRequested {
        /// Group being waited on.
        group: String,
    },
}
