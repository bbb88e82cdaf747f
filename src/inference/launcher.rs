//! Inference launch.
//!
//! Forwards the caller's arguments to the inference program on the selected
//! device, appending the acceleration flag when the caller did not pass one.

use tracing::{debug, info, warn};

use crate::gpu::Device;
use crate::process::{CommandSpec, ProcessRunner, RunOutcome, RunnerError};

/// Append `flag value` unless `flag` already appears as an argument.
///
/// Matching is by whole argument, so `--acceleration=none` does not count.
pub fn with_acceleration(mut args: Vec<String>, flag: &str, value: &str) -> Vec<String> {
    if !args.iter().any(|a| a == flag) {
        args.push(flag.to_string());
        args.push(value.to_string());
    }
    args
}

/// Runs the inference program for one device.
pub struct InferenceInvoker<'a> {
    runner: &'a dyn ProcessRunner,
    command: CommandSpec,
    device_env_var: String,
    acceleration_flag: String,
    acceleration_value: String,
}

impl<'a> InferenceInvoker<'a> {
    pub fn new(
        runner: &'a dyn ProcessRunner,
        command: CommandSpec,
        device_env_var: &str,
        acceleration_flag: &str,
        acceleration_value: &str,
    ) -> Self {
        Self {
            runner,
            command,
            device_env_var: device_env_var.to_string(),
            acceleration_flag: acceleration_flag.to_string(),
            acceleration_value: acceleration_value.to_string(),
        }
    }

    /// The exact command spawned for `device` with the caller's `args`.
    pub fn command_for(&self, device: &Device, args: Vec<String>) -> CommandSpec {
        let args = with_acceleration(args, &self.acceleration_flag, &self.acceleration_value);
        self.command
            .clone()
            .args(args)
            .visible_device(&self.device_env_var, device.index)
    }

    /// Run inference until it exits or the operator interrupts.
    pub async fn launch(
        &self,
        device: &Device,
        args: Vec<String>,
    ) -> Result<RunOutcome, RunnerError> {
        let spec = self.command_for(device, args);
        info!(program = %spec.program, device = device.index, "Launching inference");

        let outcome = self.runner.status_or_interrupt(&spec).await?;
        match outcome {
            RunOutcome::Exited(report) if report.success() => {
                debug!("Inference exited cleanly");
            }
            RunOutcome::Exited(report) => {
                warn!(code = ?report.code, "Inference exited with failure");
            }
            RunOutcome::Interrupted => info!("Interrupted, shutting down"),
        }
        Ok(outcome)
    }
}
