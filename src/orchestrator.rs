//! Launch orchestration: probe → select → ensure engine → run inference.
//!
//! Every step runs to completion before the next. Any failure before the
//! inference step aborts the run, so inference never starts against a
//! missing or stale engine.

use thiserror::Error;
use tracing::{info, warn};

use crate::cache::builder::BuildInvoker;
use crate::cache::engine::{EngineCache, EngineError, EnsureOutcome};
use crate::config::Config;
use crate::gpu::probe::probe_devices;
use crate::gpu::selector::{select_device, Prompt, SelectionError};
use crate::gpu::Device;
use crate::inference::launcher::InferenceInvoker;
use crate::process::{ProcessRunner, RunOutcome, RunnerError};

#[derive(Error, Debug)]
pub enum LaunchError {
    #[error("GPU index {0} not found")]
    DeviceNotFound(u32),

    #[error("GPU selection failed: {0}")]
    Selection(SelectionError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("could not launch inference: {0}")]
    Inference(RunnerError),
}

impl LaunchError {
    /// Process exit code reported for this failure.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::DeviceNotFound(_) => 2,
            _ => 1,
        }
    }
}

impl From<SelectionError> for LaunchError {
    fn from(e: SelectionError) -> Self {
        match e {
            SelectionError::DeviceNotFound(index) => Self::DeviceNotFound(index),
            other => Self::Selection(other),
        }
    }
}

/// What the operator asked for.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LaunchRequest {
    /// Explicit GPU index; `None` means auto or interactive selection.
    pub gpu: Option<u32>,

    /// Arguments forwarded to the inference program.
    pub inference_args: Vec<String>,
}

/// How a run ended without error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchOutcome {
    /// The probe found nothing; no engine or inference step ran.
    NoDevices,

    /// Inference ran on `device` (or was interrupted by the operator).
    Completed {
        device: Device,
        engine: EnsureOutcome,
        inference: RunOutcome,
    },
}

/// Sequences the launch steps against one configuration and process runner.
pub struct Launcher<'a> {
    config: &'a Config,
    runner: &'a dyn ProcessRunner,
}

impl<'a> Launcher<'a> {
    pub fn new(config: &'a Config, runner: &'a dyn ProcessRunner) -> Self {
        Self { config, runner }
    }

    pub async fn launch(
        &self,
        request: LaunchRequest,
        prompt: &mut dyn Prompt,
    ) -> Result<LaunchOutcome, LaunchError> {
        let config = self.config;

        let devices = probe_devices(self.runner, &config.probe.to_spec()).await;
        if devices.is_empty() {
            warn!("No NVIDIA GPUs found (or the inventory command failed)");
            return Ok(LaunchOutcome::NoDevices);
        }

        let device = select_device(&devices, request.gpu, prompt)?;
        prompt.say(&format!("Selected: GPU {} - {}", device.index, device.name));

        let cache = EngineCache::new(&config.engine);
        let builder = BuildInvoker::new(self.runner, config.build.to_spec(), &config.device_env_var);
        let engine = cache.ensure(&device, &builder).await?;
        info!(device = device.index, outcome = ?engine, "Engine ready");

        let inference = InferenceInvoker::new(
            self.runner,
            config.inference.command.to_spec(),
            &config.device_env_var,
            &config.inference.acceleration_flag,
            &config.inference.acceleration_value,
        );
        let outcome = inference
            .launch(&device, request.inference_args)
            .await
            .map_err(LaunchError::Inference)?;

        Ok(LaunchOutcome::Completed {
            device,
            engine,
            inference: outcome,
        })
    }
}
