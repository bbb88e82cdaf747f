//! Runtime configuration for engine-launcher.
//!
//! Configuration is loaded from a JSON file or constructed programmatically.
//! Every external program the launcher drives (probe, build, inference), the
//! engine directory layout and the device-restriction variable live here.

use std::path::{Path, PathBuf};

use clap::Parser;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::process::CommandSpec;

/// Command-line arguments.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "engine-launcher",
    about = "Multi-GPU launcher: restore or build the engine for a GPU, then run inference on it"
)]
pub struct Cli {
    /// Index of the GPU to use (skips the interactive prompt).
    #[arg(long)]
    pub gpu: Option<u32>,

    /// Path to configuration file (JSON).
    #[arg(short, long, default_value = "launcher.json")]
    pub config: PathBuf,

    /// Enable verbose logging.
    #[arg(short, long)]
    pub verbose: bool,

    /// Arguments forwarded verbatim to the inference program.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, num_args = 0..)]
    pub inference_args: Vec<String>,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{section}: program must not be empty")]
    EmptyProgram { section: &'static str },

    #[error("engine.active_name must be a plain file name, got {0:?}")]
    InvalidActiveName(String),

    #[error("device_env_var must not be empty")]
    EmptyDeviceEnvVar,
}

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Engine directory layout.
    pub engine: EngineConfig,

    /// GPU inventory command.
    pub probe: CommandConfig,

    /// Engine build command.
    pub build: CommandConfig,

    /// Inference command and acceleration flag.
    pub inference: InferenceConfig,

    /// Environment variable restricting the devices a child process can see.
    pub device_env_var: String,
}

/// Where engines live on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Directory holding the active engine and the per-device cache.
    pub engine_dir: PathBuf,

    /// File name of the engine consumed by the inference program.
    pub active_name: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            engine_dir: PathBuf::from("./pretrained_weights/tensorrt"),
            active_name: "unet_work.engine".to_string(),
        }
    }
}

/// An external program plus its fixed arguments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandConfig {
    pub program: String,

    #[serde(default)]
    pub args: Vec<String>,
}

impl CommandConfig {
    pub fn new(program: &str, args: &[&str]) -> Self {
        Self {
            program: program.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
        }
    }

    /// Build a spawnable command with no environment overrides.
    pub fn to_spec(&self) -> CommandSpec {
        CommandSpec::new(&self.program).args(self.args.iter().cloned())
    }
}

/// Inference program settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InferenceConfig {
    /// The inference program.
    pub command: CommandConfig,

    /// Flag appended when the caller did not pass one.
    pub acceleration_flag: String,

    /// Value appended after `acceleration_flag`.
    pub acceleration_value: String,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            command: CommandConfig::new("python3", &["inference_online.py"]),
            acceleration_flag: "--acceleration".to_string(),
            acceleration_value: "tensorrt".to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            engine: EngineConfig::default(),
            probe: CommandConfig::new(
                "nvidia-smi",
                &["--query-gpu=index,name,memory.total", "--format=csv,noheader"],
            ),
            build: CommandConfig::new("python3", &["torch2trt.py"]),
            inference: InferenceConfig::default(),
            device_env_var: "CUDA_VISIBLE_DEVICES".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a JSON file, falling back to defaults for missing fields.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let config = if path.exists() {
            let data = std::fs::read_to_string(path)?;
            serde_json::from_str::<Config>(&data)?
        } else {
            tracing::warn!("Config file not found at {:?}, using defaults", path);
            Config::default()
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations that cannot launch anything.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (section, command) in [
            ("probe", &self.probe),
            ("build", &self.build),
            ("inference", &self.inference.command),
        ] {
            if command.program.trim().is_empty() {
                return Err(ConfigError::EmptyProgram { section });
            }
        }

        let name = &self.engine.active_name;
        let plain = Path::new(name)
            .file_name()
            .is_some_and(|f| f.to_str() == Some(name.as_str()));
        if !plain {
            return Err(ConfigError::InvalidActiveName(name.clone()));
        }

        if self.device_env_var.trim().is_empty() {
            return Err(ConfigError::EmptyDeviceEnvVar);
        }
        Ok(())
    }
}
