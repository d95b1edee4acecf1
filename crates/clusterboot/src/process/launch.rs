//! Wires production collaborators into a controller run.

use std::sync::Arc;

use ortho_config::OrthoError;
use tracing::info;

use clusterboot_config::Config;

use crate::health::{LifecycleReporter, StructuredLifecycleReporter};
use crate::supervisor::{SupervisorClient, XmlRpcSupervisor};
use crate::telemetry;

use super::PROCESS_TARGET;
use super::controller::{ControllerSettings, LifecycleController, RunOutcome};
use super::daemon::{SupervisorLauncher, SystemLauncher};
use super::errors::LaunchError;
use super::signals::{ControlSignals, SystemControlSignals};
use super::watcher::PoolConfigWatcher;

/// Trait abstracting configuration loading for testability.
pub trait ConfigLoader {
    /// Loads the controller configuration.
    fn load(&self) -> Result<Config, Arc<OrthoError>>;
}

/// Loader that delegates to [`Config::load`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemConfigLoader;

impl ConfigLoader for SystemConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Config::load()
    }
}

/// Collaborators for one controller run.
pub(crate) struct LaunchPlan<L, C> {
    pub(crate) launcher: L,
    pub(crate) client: C,
    pub(crate) signals: ControlSignals,
    pub(crate) reporter: Arc<dyn LifecycleReporter>,
}

/// Runs the controller with the production collaborators.
///
/// Configuration is loaded from the command line, environment and files;
/// telemetry and signal handlers are installed before the supervisor starts.
pub fn run_controller() -> Result<RunOutcome, LaunchError> {
    let config = SystemConfigLoader.load()?;
    telemetry::initialise(&config)?;
    let signals = SystemControlSignals::install()?;
    let client = XmlRpcSupervisor::connect(
        config.supervisor_endpoint().clone(),
        config.request_timeout(),
    )?;
    let plan = LaunchPlan {
        launcher: SystemLauncher::from_config(&config),
        client,
        signals,
        reporter: Arc::new(StructuredLifecycleReporter::new()),
    };
    run_controller_with(&config, plan)
}

/// Runs the controller with injected collaborators.
///
/// When a pool configuration file is configured it is watched for the whole
/// run; a change requests a graceful stop.
pub(crate) fn run_controller_with<L, C>(
    config: &Config,
    plan: LaunchPlan<L, C>,
) -> Result<RunOutcome, LaunchError>
where
    L: SupervisorLauncher,
    C: SupervisorClient,
{
    let LaunchPlan {
        launcher,
        client,
        signals,
        reporter,
    } = plan;
    info!(
        target: PROCESS_TARGET,
        cluster = %config.cluster,
        pool = %config.pool,
        scheduler = %config.scheduler,
        endpoint = %config.supervisor_endpoint(),
        "starting controller"
    );
    let _pool_config_watch = config
        .pool_config_path()
        .map(|path| PoolConfigWatcher::watch(&path, signals.clone(), Arc::clone(&reporter)))
        .transpose()?;
    let controller = LifecycleController::new(
        launcher,
        client,
        reporter,
        signals,
        ControllerSettings::from_config(config),
    );
    let outcome = controller.run()?;
    info!(
        target: PROCESS_TARGET,
        %outcome,
        "controller finished"
    );
    Ok(outcome)
}
