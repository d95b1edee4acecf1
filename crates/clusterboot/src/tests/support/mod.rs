//! Fakes and fixtures shared by the controller test suites.

mod daemon;
mod reporter;
mod supervisor;

use std::num::NonZeroU32;
use std::time::Duration;

use clusterboot_config::Config;

use crate::process::ControllerSettings;
use crate::stage::WaitTiming;
use crate::supervisor::ProcessState;

pub use daemon::{FAKE_PID, FakeLauncher};
pub use reporter::{RecordingLifecycleReporter, ReporterEvent};
pub use supervisor::{Call, ScriptedSupervisor};

/// Configuration naming two fetch instances and one run instance.
pub fn config() -> Config {
    Config {
        cluster: "norcal".to_owned(),
        pool: "batch".to_owned(),
        scheduler: "mesos".to_owned(),
        fetch_process_count: NonZeroU32::new(2).expect("non-zero"),
        ..Config::default()
    }
}

/// Controller settings with every pause shrunk to keep tests fast.
pub fn fast_settings(config: &Config) -> ControllerSettings {
    let tick = Duration::from_millis(1);
    ControllerSettings {
        wait: WaitTiming {
            poll_interval: tick,
            connectivity_backoff: tick,
            timeout: None,
        },
        startup_grace: Duration::ZERO,
        bootstrap_timeout: Duration::from_millis(50),
        main_poll_interval: tick,
        connectivity_backoff: tick,
        ..ControllerSettings::from_config(config)
    }
}

/// Scripts the fetch group to exit and the run group to run.
pub fn script_healthy_signals(supervisor: &ScriptedSupervisor) {
    supervisor.script_states("fetch_signals:fetch_signals_0", [ProcessState::Exited]);
    supervisor.script_states("fetch_signals:fetch_signals_1", [ProcessState::Exited]);
    supervisor.script_states("run_signals:run_signals_0", [ProcessState::Running]);
}
