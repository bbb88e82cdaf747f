//! Engine build invocation.
//!
//! The build program takes no arguments from the launcher; which GPU it
//! compiles for is controlled entirely by the device-restriction variable, so
//! the child's device 0 is always the operator's chosen card.

use tracing::info;

use crate::gpu::Device;
use crate::process::{CommandSpec, ExitReport, ProcessRunner, RunnerError};

/// Runs the external engine build for one device.
pub struct BuildInvoker<'a> {
    runner: &'a dyn ProcessRunner,
    command: CommandSpec,
    device_env_var: String,
}

impl<'a> BuildInvoker<'a> {
    pub fn new(runner: &'a dyn ProcessRunner, command: CommandSpec, device_env_var: &str) -> Self {
        Self {
            runner,
            command,
            device_env_var: device_env_var.to_string(),
        }
    }

    /// The exact command spawned for `device`.
    pub fn command_for(&self, device: &Device) -> CommandSpec {
        self.command
            .clone()
            .visible_device(&self.device_env_var, device.index)
    }

    /// Run the build to completion with the child's output on the operator's terminal.
    pub async fn build(&self, device: &Device) -> Result<ExitReport, RunnerError> {
        let spec = self.command_for(device);
        info!(
            program = %spec.program,
            device = device.index,
            name = %device.name,
            "Starting engine build (this may take 10-20 minutes)"
        );

        self.runner.status(&spec).await
    }
}
