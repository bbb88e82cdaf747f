//! Scripted process runner shared by the integration tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use engine_launcher::config::{CommandConfig, Config, EngineConfig};
use engine_launcher::process::{
    CapturedOutput, CommandSpec, ExitReport, ProcessRunner, RunOutcome, RunnerError,
};

/// What the inventory command does.
#[derive(Debug, Clone)]
pub enum Inventory {
    Report(String),
    Exit(i32),
    Missing,
}

/// Which runner entry point a call went through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Call {
    Output,
    Status,
    Interruptible,
}

/// Fake runner: canned inventory, canned build/inference results, and a
/// record of every spawned command.
pub struct FakeRunner {
    pub inventory: Inventory,
    pub build_exit: i32,
    /// File the fake build writes on success.
    pub build_writes: Option<(PathBuf, Vec<u8>)>,
    pub inference: RunOutcome,
    calls: Mutex<Vec<(Call, CommandSpec)>>,
}

impl FakeRunner {
    pub fn new(inventory: Inventory) -> Self {
        Self {
            inventory,
            build_exit: 0,
            build_writes: None,
            inference: RunOutcome::Exited(ExitReport::from_code(0)),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_report(report: &str) -> Self {
        Self::new(Inventory::Report(report.to_string()))
    }

    pub fn building(mut self, exit: i32, writes: Option<(PathBuf, Vec<u8>)>) -> Self {
        self.build_exit = exit;
        self.build_writes = writes;
        self
    }

    pub fn calls(&self) -> Vec<(Call, CommandSpec)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn specs(&self, kind: Call) -> Vec<CommandSpec> {
        self.calls()
            .into_iter()
            .filter(|(k, _)| *k == kind)
            .map(|(_, spec)| spec)
            .collect()
    }

    pub fn builds(&self) -> Vec<CommandSpec> {
        self.specs(Call::Status)
    }

    pub fn inferences(&self) -> Vec<CommandSpec> {
        self.specs(Call::Interruptible)
    }

    fn record(&self, kind: Call, spec: &CommandSpec) {
        self.calls.lock().unwrap().push((kind, spec.clone()));
    }
}

#[async_trait]
impl ProcessRunner for FakeRunner {
    async fn output(&self, spec: &CommandSpec) -> Result<CapturedOutput, RunnerError> {
        self.record(Call::Output, spec);
        match &self.inventory {
            Inventory::Report(report) => Ok(CapturedOutput {
                exit: ExitReport::from_code(0),
                stdout: report.clone(),
                stderr: String::new(),
            }),
            Inventory::Exit(code) => Ok(CapturedOutput {
                exit: ExitReport::from_code(*code),
                stdout: String::new(),
                stderr: "NVIDIA-SMI has failed".to_string(),
            }),
            Inventory::Missing => Err(RunnerError::Spawn {
                program: spec.program.clone(),
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            }),
        }
    }

    async fn status(&self, spec: &CommandSpec) -> Result<ExitReport, RunnerError> {
        self.record(Call::Status, spec);
        if self.build_exit == 0 {
            if let Some((path, bytes)) = &self.build_writes {
                std::fs::write(path, bytes).unwrap();
            }
        }
        Ok(ExitReport::from_code(self.build_exit))
    }

    async fn status_or_interrupt(&self, spec: &CommandSpec) -> Result<RunOutcome, RunnerError> {
        self.record(Call::Interruptible, spec);
        Ok(self.inference)
    }
}

/// Configuration pointing at `engine_dir` with recognizable program names.
pub fn test_config(engine_dir: &Path) -> Config {
    let mut config = Config::default();
    config.engine = EngineConfig {
        engine_dir: engine_dir.to_path_buf(),
        active_name: "unet_work.engine".to_string(),
    };
    config.probe = CommandConfig::new("list-gpus", &[]);
    config.build = CommandConfig::new("build-engine", &[]);
    config.inference.command = CommandConfig::new("run-inference", &["--model", "unet"]);
    config
}
