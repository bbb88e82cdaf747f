//! GPU inventory probe.
//!
//! Lists devices by running the configured inventory command (nvidia-smi by
//! default) and parsing its `index, name, memory` CSV report. The launcher
//! never touches a GPU runtime itself: binding a compute context before the
//! device is chosen would pin the whole process to the default device.

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::gpu::device::Device;
use crate::process::{CommandSpec, ProcessRunner, RunnerError};

#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("inventory command unavailable: {0}")]
    Unavailable(#[from] RunnerError),

    #[error("inventory command exited with {code:?}: {stderr}")]
    Failed { code: Option<i32>, stderr: String },

    #[error("invalid device index {value:?} on line {line}")]
    BadIndex { line: usize, value: String },
}

/// Parse an inventory report: one `index, name, memory` row per line, no header.
///
/// Rows with fewer than three fields are skipped. Extra fields are ignored.
pub fn parse_inventory(report: &str) -> Result<Vec<Device>, ProbeError> {
    let mut devices = Vec::new();

    for (n, line) in report.lines().enumerate() {
        let fields: Vec<&str> = line.split(',').map(str::trim).collect();
        if fields.len() < 3 {
            if !line.trim().is_empty() {
                debug!(line = n + 1, row = line, "Skipping malformed inventory row");
            }
            continue;
        }

        let index = fields[0].parse::<u32>().map_err(|_| ProbeError::BadIndex {
            line: n + 1,
            value: fields[0].to_string(),
        })?;

        devices.push(Device::new(index, fields[1], fields[2]));
    }

    Ok(devices)
}

/// Run the inventory command and parse its report.
pub async fn try_probe(
    runner: &dyn ProcessRunner,
    command: &CommandSpec,
) -> Result<Vec<Device>, ProbeError> {
    let out = runner.output(command).await?;
    if !out.exit.success() {
        return Err(ProbeError::Failed {
            code: out.exit.code,
            stderr: out.stderr.trim().to_string(),
        });
    }
    parse_inventory(&out.stdout)
}

/// Probe devices, degrading every failure to an empty list with a warning.
pub async fn probe_devices(runner: &dyn ProcessRunner, command: &CommandSpec) -> Vec<Device> {
    match try_probe(runner, command).await {
        Ok(devices) => {
            info!(count = devices.len(), "GPU inventory probed");
            devices
        }
        Err(e) => {
            warn!(program = %command.program, error = %e, "Failed to query GPU inventory");
            Vec::new()
        }
    }
}
