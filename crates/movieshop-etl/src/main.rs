//! Movieshop ETL - Main entry point

use clap::Parser;
use movieshop_common::logging::{init_logging, LogConfig, LogLevel, LogOutput};
use movieshop_etl::commands;
use movieshop_etl::table::LocalTableStore;
use movieshop_etl::{Cli, Commands, EtlConfig, Pipeline};
use std::process;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    if cli.markdown_help {
        println!("{}", clap_markdown::help_markdown::<Cli>());
        return;
    }

    let Some(command) = cli.command.as_ref() else {
        eprintln!("Error: A subcommand is required");
        eprintln!();
        eprintln!("For more information, try '--help'.");
        process::exit(2);
    };

    let log_config = LogConfig::builder()
        .level(if cli.verbose { LogLevel::Debug } else { LogLevel::Info })
        .output(LogOutput::Console)
        .log_file_prefix("movieshop-etl")
        .build();

    // Environment variables take precedence
    let log_config = log_config.clone().merge_env().unwrap_or(log_config);

    // The pipeline runs without logging if the subscriber cannot be installed
    let _guard = match init_logging(&log_config) {
        Ok(guard) => Some(guard),
        Err(e) => {
            eprintln!("Warning: logging disabled: {:#}", e);
            None
        },
    };

    if let Err(e) = execute_command(&cli, command).await {
        error!(error = %e, "Command failed");
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

async fn execute_command(cli: &Cli, command: &Commands) -> anyhow::Result<()> {
    let config = cli.paths.apply(EtlConfig::from_env()?);
    config.validate()?;

    let store = LocalTableStore::new();
    let pipeline = Pipeline::new(config, &store);

    match command {
        Commands::Run { entity, reset } => {
            info!(entity = ?entity, reset, "Starting pipeline run");
            commands::run::run(&pipeline, *entity, *reset).await?;
        },
        Commands::RepairQuarantine { entity } => {
            info!(entity = ?entity, "Starting quarantine repair");
            commands::repair::run(&pipeline, *entity).await?;
        },
        Commands::Show { table, limit, status } => {
            commands::show::run(&store, pipeline.catalog(), table, *limit, *status).await?;
        },
        Commands::Tables => commands::tables::run(pipeline.catalog()).await?,
    }

    Ok(())
}
