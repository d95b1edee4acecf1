//! Ownership of the supervision daemon child process.

use std::env;
use std::io;
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};

use nix::sys::signal::{Signal, kill};
use nix::unistd::Pid;
use tracing::{info, warn};

use clusterboot_config::Config;

use super::PROCESS_TARGET;
use super::errors::{ControllerError, SpawnError};

/// Environment variable carrying arguments for supervised children.
pub const CHILD_ARGUMENTS_ENV: &str = "CMAN_ARGS";

/// Exit status of the supervisor child.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DaemonExit {
    code: Option<i32>,
}

impl DaemonExit {
    /// Builds an exit record. `None` means the child was ended by a signal.
    #[must_use]
    pub const fn new(code: Option<i32>) -> Self {
        Self { code }
    }

    /// Exit code, or `None` when the child was ended by a signal.
    #[must_use]
    pub const fn code(self) -> Option<i32> {
        self.code
    }
}

impl From<ExitStatus> for DaemonExit {
    fn from(status: ExitStatus) -> Self {
        Self::new(status.code())
    }
}

/// A spawned supervisor process.
pub trait DaemonProcess {
    /// Operating system process id.
    fn id(&self) -> u32;

    /// Blocks until the process exits.
    fn wait(&mut self) -> io::Result<DaemonExit>;

    /// Asks the process to terminate without waiting for it.
    fn terminate(&mut self) -> io::Result<()>;
}

/// Starts the supervisor.
pub trait SupervisorLauncher {
    /// Handle type for the spawned process.
    type Process: DaemonProcess;

    /// Spawns the supervisor child.
    fn launch(&self) -> Result<Self::Process, SpawnError>;
}

/// Launches the configured supervisor executable with `-c <config>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemLauncher {
    binary: String,
    config: PathBuf,
    child_arguments: String,
}

impl SystemLauncher {
    /// Builds a launcher, merging configured paths into the inherited
    /// `CMAN_ARGS` value.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        let inherited = env::var(CHILD_ARGUMENTS_ENV).unwrap_or_default();
        Self::new(
            config.supervisor_binary.clone(),
            config.supervisor_config().to_path_buf(),
            config.child_arguments(&inherited),
        )
    }

    /// Builds a launcher from explicit parts.
    #[must_use]
    pub fn new(binary: String, config: PathBuf, child_arguments: String) -> Self {
        Self {
            binary,
            config,
            child_arguments,
        }
    }
}

impl SupervisorLauncher for SystemLauncher {
    type Process = SystemDaemon;

    fn launch(&self) -> Result<SystemDaemon, SpawnError> {
        let mut command = Command::new(&self.binary);
        command
            .arg("-c")
            .arg(&self.config)
            .env(CHILD_ARGUMENTS_ENV, &self.child_arguments)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());
        let child = command.spawn().map_err(|source| SpawnError {
            binary: self.binary.clone(),
            source,
        })?;
        info!(
            target: PROCESS_TARGET,
            binary = %self.binary,
            config = %self.config.display(),
            pid = child.id(),
            "supervisor spawned"
        );
        Ok(SystemDaemon { child })
    }
}

/// Supervisor child started by [`SystemLauncher`].
#[derive(Debug)]
pub struct SystemDaemon {
    child: Child,
}

impl DaemonProcess for SystemDaemon {
    fn id(&self) -> u32 {
        self.child.id()
    }

    fn wait(&mut self) -> io::Result<DaemonExit> {
        self.child.wait().map(DaemonExit::from)
    }

    fn terminate(&mut self) -> io::Result<()> {
        let pid = i32::try_from(self.child.id()).map_err(io::Error::other)?;
        kill(Pid::from_raw(pid), Signal::SIGTERM).map_err(io::Error::from)
    }
}

/// Owns the supervisor child and guarantees it is reaped.
///
/// Dropping a guard that has not been through [`SupervisorGuard::wait`]
/// blocks until the child exits.
#[derive(Debug)]
pub struct SupervisorGuard<P: DaemonProcess> {
    process: P,
    pid: u32,
    reaped: bool,
}

impl<P: DaemonProcess> SupervisorGuard<P> {
    /// Takes ownership of a spawned child.
    #[must_use]
    pub fn new(process: P) -> Self {
        let pid = process.id();
        Self {
            process,
            pid,
            reaped: false,
        }
    }

    /// Sends SIGTERM; failures are logged because the wait still follows.
    pub fn terminate(&mut self) {
        match self.process.terminate() {
            Ok(()) => info!(
                target: PROCESS_TARGET,
                pid = self.pid,
                "sent SIGTERM to supervisor"
            ),
            Err(error) => warn!(
                target: PROCESS_TARGET,
                pid = self.pid,
                error = %error,
                "failed to signal supervisor"
            ),
        }
    }

    /// Blocks until the child exits.
    pub fn wait(&mut self) -> Result<DaemonExit, ControllerError> {
        self.reaped = true;
        let exit = self
            .process
            .wait()
            .map_err(|source| ControllerError::Reap {
                pid: self.pid,
                source,
            })?;
        info!(
            target: PROCESS_TARGET,
            pid = self.pid,
            code = ?exit.code(),
            "supervisor reaped"
        );
        Ok(exit)
    }
}

impl<P: DaemonProcess> Drop for SupervisorGuard<P> {
    fn drop(&mut self) {
        if self.reaped {
            return;
        }
        if let Err(error) = self.wait() {
            warn!(
                target: PROCESS_TARGET,
                error = %error,
                "failed to reap supervisor on drop"
            );
        }
    }
}
