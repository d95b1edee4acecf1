//! In-memory supervisor child used by controller tests.

use std::io;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::process::{DaemonExit, DaemonProcess, SpawnError, SupervisorLauncher};

pub const FAKE_PID: u32 = 4242;

#[derive(Debug, Default)]
struct DaemonLog {
    launches: usize,
    waits: usize,
    terminations: usize,
}

/// Launcher whose children exit as soon as they are waited on.
#[derive(Debug, Clone, Default)]
pub struct FakeLauncher {
    log: Arc<Mutex<DaemonLog>>,
    fail_spawn: bool,
}

impl FakeLauncher {
    pub fn new() -> Self {
        Self::default()
    }

    /// A launcher whose spawn attempts fail.
    pub fn failing() -> Self {
        Self {
            fail_spawn: true,
            ..Self::default()
        }
    }

    pub fn launches(&self) -> usize {
        lock(&self.log).launches
    }

    pub fn waits(&self) -> usize {
        lock(&self.log).waits
    }

    pub fn terminations(&self) -> usize {
        lock(&self.log).terminations
    }
}

impl SupervisorLauncher for FakeLauncher {
    type Process = FakeDaemon;

    fn launch(&self) -> Result<FakeDaemon, SpawnError> {
        if self.fail_spawn {
            return Err(SpawnError {
                binary: "supervisord".to_owned(),
                source: io::Error::new(io::ErrorKind::NotFound, "no such file or directory"),
            });
        }
        lock(&self.log).launches += 1;
        Ok(FakeDaemon {
            log: Arc::clone(&self.log),
        })
    }
}

/// Child handle produced by [`FakeLauncher`].
#[derive(Debug)]
pub struct FakeDaemon {
    log: Arc<Mutex<DaemonLog>>,
}

impl DaemonProcess for FakeDaemon {
    fn id(&self) -> u32 {
        FAKE_PID
    }

    fn wait(&mut self) -> io::Result<DaemonExit> {
        lock(&self.log).waits += 1;
        Ok(DaemonExit::new(Some(0)))
    }

    fn terminate(&mut self) -> io::Result<()> {
        lock(&self.log).terminations += 1;
        Ok(())
    }
}

fn lock(log: &Mutex<DaemonLog>) -> MutexGuard<'_, DaemonLog> {
    log.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}
