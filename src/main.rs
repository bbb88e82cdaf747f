//! engine-launcher binary.
//!
//! Usage: `engine-launcher [--gpu N] [-c launcher.json] [-v] [-- inference args...]`

use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};

use engine_launcher::config::{Cli, Config};
use engine_launcher::gpu::selector::StdioPrompt;
use engine_launcher::orchestrator::{LaunchOutcome, LaunchRequest, Launcher};
use engine_launcher::process::SystemRunner;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // Parse CLI arguments.
    let cli = Cli::parse();

    // Initialize tracing/logging.
    let filter = if cli.verbose {
        "engine_launcher=debug"
    } else {
        "engine_launcher=info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| filter.into()),
        )
        .with_target(false)
        .init();

    info!("engine-launcher v{}", env!("CARGO_PKG_VERSION"));

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let config = Config::load(&cli.config)?;
    info!(
        engine_dir = %config.engine.engine_dir.display(),
        active = %config.engine.active_name,
        "Configuration loaded"
    );

    let runner = SystemRunner;
    let launcher = Launcher::new(&config, &runner);
    let request = LaunchRequest {
        gpu: cli.gpu,
        inference_args: cli.inference_args,
    };

    match launcher.launch(request, &mut StdioPrompt).await {
        Ok(LaunchOutcome::NoDevices) => Ok(ExitCode::SUCCESS),
        Ok(LaunchOutcome::Completed { device, .. }) => {
            info!(device = device.index, "Done");
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            error!("{e}");
            Ok(ExitCode::from(e.exit_code()))
        }
    }
}
