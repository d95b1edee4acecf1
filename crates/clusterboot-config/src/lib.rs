//! Configuration for the `clusterboot` controller.
//!
//! Values are layered by `ortho_config`: an optional TOML file (selected with
//! `--config-path` or `CLUSTERBOOT_CONFIG_PATH`), then `CLUSTERBOOT_*`
//! environment variables, then command-line flags. Cluster, pool and scheduler
//! are mandatory; everything else falls back to the defaults in [`defaults`].

use std::ffi::OsString;
use std::num::NonZeroU32;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use ortho_config::{OrthoConfig, OrthoError};
use serde::{Deserialize, Serialize};

pub mod defaults;
mod endpoint;
mod logging;

pub use defaults::{
    DEFAULT_FETCH_GROUP, DEFAULT_LOG_FILTER, DEFAULT_MAIN_PROCESS, DEFAULT_RUN_GROUP,
    DEFAULT_SUPERVISOR_ENDPOINT, default_log_filter, default_log_format,
};
pub use endpoint::{EndpointParseError, SupervisorEndpoint};
pub use logging::LogFormat;

/// Resolved controller configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq, OrthoConfig)]
#[ortho_config(prefix = "CLUSTERBOOT")]
pub struct Config {
    /// Cluster the autoscaler manages.
    pub cluster: String,
    /// Pool within the cluster.
    pub pool: String,
    /// Scheduler backing the pool (for example `mesos` or `kubernetes`).
    pub scheduler: String,
    /// Environment configuration forwarded to supervised children.
    pub env_config_path: Option<PathBuf>,
    /// Cluster configuration directory forwarded to supervised children.
    pub cluster_config_directory: Option<PathBuf>,
    /// Pool configuration file; a change to it stops the run so the next
    /// run picks up the new settings.
    pub pool_config_path: Option<PathBuf>,
    /// Supervisor executable.
    #[ortho_config(default = defaults::default_supervisor_binary())]
    pub supervisor_binary: String,
    /// Declarative supervisor configuration file passed with `-c`.
    #[ortho_config(default = defaults::default_supervisor_config())]
    pub supervisor_config: PathBuf,
    /// Supervisor XML-RPC endpoint.
    #[ortho_config(default = SupervisorEndpoint::local())]
    pub supervisor_endpoint: SupervisorEndpoint,
    /// Group that fetches signal artefacts and exits.
    #[ortho_config(default = defaults::default_fetch_group())]
    pub fetch_group: String,
    /// Number of fetch instances.
    #[ortho_config(default = defaults::default_process_count())]
    pub fetch_process_count: NonZeroU32,
    /// Group of long-lived signal processes.
    #[ortho_config(default = defaults::default_run_group())]
    pub run_group: String,
    /// Number of run instances.
    #[ortho_config(default = defaults::default_process_count())]
    pub run_process_count: NonZeroU32,
    /// Main process monitored until it exits.
    #[ortho_config(default = defaults::default_main_process())]
    pub main_process: String,
    /// Interval between stage polls.
    #[ortho_config(default = defaults::DEFAULT_POLL_INTERVAL_MS)]
    pub poll_interval_ms: u64,
    /// Interval between main process polls.
    #[ortho_config(default = defaults::DEFAULT_MAIN_POLL_INTERVAL_MS)]
    pub main_poll_interval_ms: u64,
    /// Pause after a failed RPC before retrying.
    #[ortho_config(default = defaults::DEFAULT_CONNECTIVITY_BACKOFF_MS)]
    pub connectivity_backoff_ms: u64,
    /// Grace period between spawning the supervisor and the first ping.
    #[ortho_config(default = defaults::DEFAULT_STARTUP_GRACE_MS)]
    pub startup_grace_ms: u64,
    /// Bound on waiting for the supervisor to answer its first call.
    #[ortho_config(default = defaults::DEFAULT_BOOTSTRAP_TIMEOUT_MS)]
    pub bootstrap_timeout_ms: u64,
    /// Per-request transport timeout.
    #[ortho_config(default = defaults::DEFAULT_REQUEST_TIMEOUT_MS)]
    pub request_timeout_ms: u64,
    /// Optional bound on each stage wait. Unset means wait forever.
    pub stage_timeout_ms: Option<u64>,
    /// `tracing` filter expression.
    #[ortho_config(default = defaults::default_log_filter())]
    pub log_filter: String,
    /// Log output encoding.
    #[ortho_config(default = defaults::default_log_format())]
    pub log_format: LogFormat,
}

impl Config {
    /// Loads configuration from the process arguments, environment and files.
    pub fn load() -> Result<Self, Arc<OrthoError>> {
        <Self as OrthoConfig>::load()
    }

    /// Loads configuration from an explicit argument list.
    pub fn load_from_iter<I, T>(args: I) -> Result<Self, Arc<OrthoError>>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        <Self as OrthoConfig>::load_from_iter(args)
    }

    /// Supervisor XML-RPC endpoint.
    #[must_use]
    pub const fn supervisor_endpoint(&self) -> &SupervisorEndpoint {
        &self.supervisor_endpoint
    }

    /// Supervisor configuration file.
    #[must_use]
    pub fn supervisor_config(&self) -> &Path {
        &self.supervisor_config
    }

    /// Log filter expression.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    /// Log output encoding.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Pause between stage polls.
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Pause between main process polls.
    #[must_use]
    pub const fn main_poll_interval(&self) -> Duration {
        Duration::from_millis(self.main_poll_interval_ms)
    }

    /// Pause after a call that could not reach the supervisor.
    #[must_use]
    pub const fn connectivity_backoff(&self) -> Duration {
        Duration::from_millis(self.connectivity_backoff_ms)
    }

    /// Pause between spawning the supervisor and the first ping.
    #[must_use]
    pub const fn startup_grace(&self) -> Duration {
        Duration::from_millis(self.startup_grace_ms)
    }

    /// Bound on waiting for the supervisor to answer.
    #[must_use]
    pub const fn bootstrap_timeout(&self) -> Duration {
        Duration::from_millis(self.bootstrap_timeout_ms)
    }

    /// Per-request transport timeout.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Optional bound on each stage wait.
    #[must_use]
    pub fn stage_timeout(&self) -> Option<Duration> {
        self.stage_timeout_ms.map(Duration::from_millis)
    }

    /// Pool configuration file to watch, if any.
    ///
    /// An explicit `pool_config_path` wins. Otherwise the file is
    /// `<cluster_config_directory>/<cluster>/<pool>.<scheduler>` when the
    /// directory is configured.
    #[must_use]
    pub fn pool_config_path(&self) -> Option<PathBuf> {
        self.pool_config_path.clone().or_else(|| {
            self.cluster_config_directory.as_ref().map(|directory| {
                directory
                    .join(&self.cluster)
                    .join(format!("{}.{}", self.pool, self.scheduler))
            })
        })
    }

    /// Arguments forwarded to supervised children through `CMAN_ARGS`.
    ///
    /// Configured paths are prepended so an explicit value already present in
    /// `inherited` still wins: the child's argument parser keeps the last
    /// occurrence of a repeated flag.
    #[must_use]
    pub fn child_arguments(&self, inherited: &str) -> String {
        let mut arguments = inherited.to_owned();
        if let Some(path) = &self.env_config_path {
            arguments = format!("--env-config-path \"{}\" {arguments}", path.display());
        }
        if let Some(directory) = &self.cluster_config_directory {
            arguments = format!(
                "--cluster-config-directory \"{}\" {arguments}",
                directory.display()
            );
        }
        arguments
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cluster: String::new(),
            pool: String::new(),
            scheduler: String::new(),
            env_config_path: None,
            cluster_config_directory: None,
            pool_config_path: None,
            supervisor_binary: defaults::default_supervisor_binary(),
            supervisor_config: defaults::default_supervisor_config(),
            supervisor_endpoint: SupervisorEndpoint::local(),
            fetch_group: defaults::default_fetch_group(),
            fetch_process_count: defaults::default_process_count(),
            run_group: defaults::default_run_group(),
            run_process_count: defaults::default_process_count(),
            main_process: defaults::default_main_process(),
            poll_interval_ms: defaults::DEFAULT_POLL_INTERVAL_MS,
            main_poll_interval_ms: defaults::DEFAULT_MAIN_POLL_INTERVAL_MS,
            connectivity_backoff_ms: defaults::DEFAULT_CONNECTIVITY_BACKOFF_MS,
            startup_grace_ms: defaults::DEFAULT_STARTUP_GRACE_MS,
            bootstrap_timeout_ms: defaults::DEFAULT_BOOTSTRAP_TIMEOUT_MS,
            request_timeout_ms: defaults::DEFAULT_REQUEST_TIMEOUT_MS,
            stage_timeout_ms: None,
            log_filter: defaults::default_log_filter(),
            log_format: defaults::default_log_format(),
        }
    }
}
