use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use signal_hook::consts::signal::{SIGHUP, SIGINT, SIGTERM};
use thiserror::Error;
use tracing::info;

use super::PROCESS_TARGET;

/// Longest uninterrupted sleep; signal flags are checked between slices.
const SLEEP_SLICE: Duration = Duration::from_millis(25);

/// Errors reported while installing signal handlers.
#[derive(Debug, Error)]
pub enum SignalError {
    /// Registering a handler failed.
    #[error("failed to install signal handlers: {source}")]
    Install {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

/// How a [`ControlSignals::sleep`] call ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wake {
    /// The full duration passed.
    Elapsed,
    /// A graceful stop was requested.
    Stopped,
    /// An interrupt arrived.
    Interrupted,
}

/// Externally controlled run flags shared with signal handlers.
///
/// `stop` clears the keep-running condition and lets the controller shut the
/// supervisor down normally. `interrupt` additionally tells the controller the
/// process tree is already being torn down.
#[derive(Debug, Clone, Default)]
pub struct ControlSignals {
    stop: Arc<AtomicBool>,
    interrupt: Arc<AtomicBool>,
}

impl ControlSignals {
    /// Builds a fresh pair of flags with nothing requested.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Clears the keep-running flag.
    pub fn request_stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }

    /// Records an interrupt.
    pub fn interrupt(&self) {
        self.interrupt.store(true, Ordering::SeqCst);
    }

    /// Whether an interrupt has been received.
    #[must_use]
    pub fn interrupted(&self) -> bool {
        self.interrupt.load(Ordering::SeqCst)
    }

    /// Sleeps for `duration`, returning early once either flag is set.
    pub fn sleep(&self, duration: Duration) -> Wake {
        let deadline = Instant::now() + duration;
        loop {
            if let Some(wake) = self.pending() {
                return wake;
            }
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Wake::Elapsed;
            }
            thread::sleep(remaining.min(SLEEP_SLICE));
        }
    }

    fn pending(&self) -> Option<Wake> {
        if self.interrupted() {
            Some(Wake::Interrupted)
        } else if self.stop.load(Ordering::SeqCst) {
            Some(Wake::Stopped)
        } else {
            None
        }
    }
}

/// Binds [`ControlSignals`] to process signals.
#[derive(Debug)]
pub struct SystemControlSignals;

impl SystemControlSignals {
    /// Registers SIGTERM and SIGHUP as stop requests and SIGINT as an interrupt.
    pub fn install() -> Result<ControlSignals, SignalError> {
        let signals = ControlSignals::new();
        for signal in [SIGTERM, SIGHUP] {
            signal_hook::flag::register(signal, Arc::clone(&signals.stop))
                .map_err(|source| SignalError::Install { source })?;
        }
        signal_hook::flag::register(SIGINT, Arc::clone(&signals.interrupt))
            .map_err(|source| SignalError::Install { source })?;
        info!(
            target: PROCESS_TARGET,
            "signal handlers installed"
        );
        Ok(signals)
    }
}
