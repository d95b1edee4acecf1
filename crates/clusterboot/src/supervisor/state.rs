use strum::{Display, EnumString};

/// Process state names reported by `supervisor.getProcessInfo`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, Display)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ProcessState {
    /// Stopped on request, or never started.
    Stopped,
    /// Start requested; not yet past its start window.
    Starting,
    /// Running.
    Running,
    /// Exited too quickly and is waiting to be retried.
    Backoff,
    /// Stop requested; not yet exited.
    Stopping,
    /// Exited after running.
    Exited,
    /// Gave up after exhausting its start retries.
    Fatal,
    /// Any state name this client does not recognise.
    Unknown,
}

impl ProcessState {
    /// Maps a `statename` field onto a known state; unrecognised names are
    /// treated as [`ProcessState::Unknown`].
    #[must_use]
    pub fn from_state_name(name: &str) -> Self {
        name.parse().unwrap_or(Self::Unknown)
    }

    /// Whether the process is still starting or running.
    #[must_use]
    pub const fn is_active(self) -> bool {
        matches!(self, Self::Starting | Self::Running)
    }
}
