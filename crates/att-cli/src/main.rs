use std::io::Write;

use anyhow::{Context, Result};
use att_engine::LocationRegistry;
use chrono::Utc;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use att_cli::commands::util::{open_database, open_engine};
use att_cli::commands::{
    case, check_in, check_out, detect, elapsed, locations, monitor, pause, resume, schedule,
    status,
};
use att_cli::{Cli, Commands, Config};

/// Runs the commands that go through the session engine.
async fn run_engine_command<W: Write>(
    writer: &mut W,
    config: &Config,
    command: &Commands,
) -> Result<()> {
    let identity = config.identity()?;
    let now = Utc::now();

    match command {
        Commands::CheckIn(args) => {
            let engine = open_engine(config, args.position.coordinate()?)?;
            let session = check_in::run(writer, &engine, &identity, args, now).await?;
            if args.watch && engine.monitor_status(&session.id).is_some() {
                monitor::watch_until_closed(writer, &engine, &session.id).await?;
            }
        }
        Commands::Pause(args) => {
            let engine = open_engine(config, None)?;
            pause::run(writer, &engine, &identity, args, now).await?;
        }
        Commands::Resume(target) => {
            let engine = open_engine(config, None)?;
            resume::run(writer, &engine, &identity, target, now).await?;
        }
        Commands::CheckOut(args) => {
            let engine = open_engine(config, None)?;
            check_out::run(writer, &engine, &identity, args, now).await?;
        }
        Commands::Case { target, case: reported } => {
            let engine = open_engine(config, None)?;
            let reported = reported.clone().into_case();
            case::run(writer, &engine, &identity, target, reported, now).await?;
        }
        Commands::Elapsed(target) => {
            let engine = open_engine(config, None)?;
            elapsed::run(writer, &engine, &identity, target, now)?;
        }
        Commands::Detect(args) => {
            let engine = open_engine(config, None)?;
            detect::run(writer, &engine, &identity, args, now)?;
        }
        Commands::Status { json } => {
            let engine = open_engine(config, None)?;
            status::run(writer, &engine, &identity, *json, now)?;
        }
        Commands::Monitor(position) => {
            let engine = open_engine(config, position.coordinate()?)?;
            monitor::run(writer, &engine, &identity).await?;
        }
        Commands::Locations(action) => {
            let mut db = open_database(config)?;
            let registry = LocationRegistry::new(config.engine.registration_buffer_meters);
            locations::run(writer, &mut db, &registry, &identity, action, now)?;
        }
        Commands::Schedule(action) => {
            let mut db = open_database(config)?;
            schedule::run(writer, &mut db, &identity, action)?;
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing with verbose flag support
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // Use try_init to avoid panic if tracing is already initialized (e.g., in tests)
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    let Some(command) = &cli.command else {
        // No subcommand, show help
        use clap::CommandFactory;
        Cli::command().print_help()?;
        println!();
        return Ok(());
    };

    let config = Config::load_from(cli.config.as_deref()).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");

    let runtime = tokio::runtime::Runtime::new().context("failed to initialize tokio runtime")?;
    let mut stdout = std::io::stdout().lock();
    runtime.block_on(run_engine_command(&mut stdout, &config, command))
}
