//! Default values applied when neither a file, the environment nor the
//! command line sets a field.

use std::num::NonZeroU32;
use std::path::PathBuf;

use crate::logging::LogFormat;

/// Host of a supervisor started with the bundled configuration.
pub const DEFAULT_SUPERVISOR_HOST: &str = "localhost";

/// Port of the supervisor's inet HTTP server.
pub const DEFAULT_SUPERVISOR_PORT: u16 = 9001;

/// Path the supervisor serves XML-RPC on.
pub const DEFAULT_SUPERVISOR_PATH: &str = "/RPC2";

/// Textual form of the default endpoint.
pub const DEFAULT_SUPERVISOR_ENDPOINT: &str = "http://localhost:9001/RPC2";

/// Supervisor executable resolved through `PATH`.
pub const DEFAULT_SUPERVISOR_BINARY: &str = "supervisord";

/// Declarative supervisor configuration shipped with the signal stack.
pub const DEFAULT_SUPERVISOR_CONFIG: &str = "clusterman/supervisord/supervisord.conf";

/// Group that prepares signal artefacts and exits.
pub const DEFAULT_FETCH_GROUP: &str = "fetch_signals";

/// Group of long-lived signal processes.
pub const DEFAULT_RUN_GROUP: &str = "run_signals";

/// Main process driven to completion once the signals are up.
pub const DEFAULT_MAIN_PROCESS: &str = "autoscaler";

/// Default log filter expression used by the binary.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Pause between stage polls.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1_000;
/// Pause between main process polls.
pub const DEFAULT_MAIN_POLL_INTERVAL_MS: u64 = 5_000;
/// Pause after a call that could not reach the supervisor.
pub const DEFAULT_CONNECTIVITY_BACKOFF_MS: u64 = 1_000;
/// Pause between spawning the supervisor and the first ping.
pub const DEFAULT_STARTUP_GRACE_MS: u64 = 1_000;
/// Bound on waiting for the supervisor to answer its first call.
pub const DEFAULT_BOOTSTRAP_TIMEOUT_MS: u64 = 30_000;
/// Per-request transport timeout.
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 10_000;

/// Owned log filter value used where allocation is required (e.g. serde).
#[must_use]
pub fn default_log_filter() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default logging format for the binary.
#[must_use]
pub const fn default_log_format() -> LogFormat {
    LogFormat::Json
}

/// Owned form of [`DEFAULT_SUPERVISOR_BINARY`].
#[must_use]
pub fn default_supervisor_binary() -> String {
    DEFAULT_SUPERVISOR_BINARY.to_owned()
}

/// Owned form of [`DEFAULT_SUPERVISOR_CONFIG`].
#[must_use]
pub fn default_supervisor_config() -> PathBuf {
    PathBuf::from(DEFAULT_SUPERVISOR_CONFIG)
}

/// Owned form of [`DEFAULT_FETCH_GROUP`].
#[must_use]
pub fn default_fetch_group() -> String {
    DEFAULT_FETCH_GROUP.to_owned()
}

/// Owned form of [`DEFAULT_RUN_GROUP`].
#[must_use]
pub fn default_run_group() -> String {
    DEFAULT_RUN_GROUP.to_owned()
}

/// Owned form of [`DEFAULT_MAIN_PROCESS`].
#[must_use]
pub fn default_main_process() -> String {
    DEFAULT_MAIN_PROCESS.to_owned()
}

/// Single instance per group unless the signal environment says otherwise.
#[must_use]
pub const fn default_process_count() -> NonZeroU32 {
    NonZeroU32::MIN
}
