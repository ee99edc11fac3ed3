use std::io::{self, Write};
use std::path::Path;

use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use basal_cli::commands::{add, ask, config, delete, list, show};
use basal_cli::{Cli, Commands, Config, default_config_file};

/// Load config, ensuring it parses.
fn load_config(config_path: Option<&Path>) -> Result<Config> {
    let config = Config::load_from(config_path).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");
    Ok(config)
}

/// Load config and open database, ensuring the parent directory exists.
fn open_database(config_path: Option<&Path>) -> Result<(basal_db::Database, Config)> {
    let config = load_config(config_path)?;

    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent).context("failed to create database directory")?;
    }

    let db = basal_db::Database::open(&config.database_path).with_context(|| {
        format!("failed to open database {}", config.database_path.display())
    })?;
    Ok((db, config))
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
        .with_writer(io::stderr)
        .try_init();

    let today = Local::now().date_naive();
    let mut stdout = io::stdout().lock();

    match &cli.command {
        Some(Commands::Add(args)) => {
            let (mut db, _config) = open_database(cli.config.as_deref())?;
            let mut stdin = io::stdin().lock();
            add::run(&mut stdout, &mut stdin, &mut db, args, today)?;
        }
        Some(Commands::Show { date, json }) => {
            let (db, _config) = open_database(cli.config.as_deref())?;
            show::run(&mut stdout, &db, date.as_deref(), *json, today)?;
        }
        Some(Commands::List { json }) => {
            let (db, _config) = open_database(cli.config.as_deref())?;
            list::run(&mut stdout, &db, *json)?;
        }
        Some(Commands::Delete { id }) => {
            let (mut db, _config) = open_database(cli.config.as_deref())?;
            delete::run(&mut stdout, &mut db, *id)?;
        }
        Some(Commands::Ask { question }) => {
            let (db, config) = open_database(cli.config.as_deref())?;
            ask::run(&mut stdout, &db, &config.llm, &question.join(" "))?;
        }
        Some(Commands::Config) => {
            let config_file = cli.config.clone().or_else(default_config_file);
            let config = load_config(cli.config.as_deref())?;
            config::run(&mut stdout, &config, config_file)?;
        }
        None => {
            // No subcommand, show help
            use clap::CommandFactory;
            Cli::command().print_help()?;
            writeln!(stdout)?;
        }
    }

    Ok(())
}
