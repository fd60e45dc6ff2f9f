//! autods - Main Entry Point

use clap::Parser;
use autods::cli::{Cli, Commands, cmd_clean, cmd_info, cmd_models, cmd_run};

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "autods=info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run { data, target, task, config, report, features_out } => {
            cmd_run(
                &data,
                target.as_deref(),
                task.as_deref(),
                config.as_deref(),
                report.as_deref(),
                features_out.as_deref(),
            )?;
        }
        Commands::Clean { data, output, config } => {
            cmd_clean(&data, &output, config.as_deref())?;
        }
        Commands::Info { data } => {
            cmd_info(&data)?;
        }
        Commands::Models => {
            cmd_models()?;
        }
    }

    Ok(())
}
