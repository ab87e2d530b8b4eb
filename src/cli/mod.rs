use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use once_cell::sync::OnceCell;
use time::OffsetDateTime;
use tracing_subscriber::{fmt, EnvFilter};

use crate::catalog::ReportCatalog;
use crate::config::{ConfigLoader, CONFIG_ENV, DATA_ENV};
use crate::storage;

pub mod commands;

use self::commands::{ClaimArgs, ConfirmArgs, ListArgs, ReportArgs, ShowArgs};

#[derive(Parser, Debug)]
#[command(
    name = "lostfound",
    version,
    about = "Campus lost-and-found reports from the command line"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Override the config file location (takes precedence over LOSTFOUND_CONFIG)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Override the data directory (takes precedence over LOSTFOUND_DATA)
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Minimum log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List active reports, optionally filtered by text, category or tab
    List(ListArgs),
    /// Show a single report, whatever its status
    Show(ShowArgs),
    /// File a new lost or found report
    Report(ReportArgs),
    /// Claim an active report (found a lost item, or own a found one)
    Claim(ClaimArgs),
    /// Confirm that a matched item was handed back
    Confirm(ConfirmArgs),
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    if let Some(path) = &cli.config {
        env::set_var(CONFIG_ENV, path);
    }
    if let Some(path) = &cli.data_dir {
        env::set_var(DATA_ENV, path);
    }

    let loader = ConfigLoader::discover()?;
    loader.paths().ensure_directories()?;
    let paths = loader.paths().clone();
    init_tracing(&cli.log_level)
        .with_context(|| format!("initialising logging at level {}", cli.log_level))?;
    let config = loader.load_or_init()?;
    let store = storage::init(&paths, &config.storage)?;
    tracing::debug!(database = %store.database_path().display(), "report store ready");
    let catalog = ReportCatalog::new(store);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("starting async runtime")?;

    let output = runtime.block_on(async {
        let now = OffsetDateTime::now_utc();
        match cli.command {
            Commands::List(args) => commands::run_list(&catalog, &config, &args, now).await,
            Commands::Show(args) => commands::run_show(&catalog, &config, &args, now).await,
            Commands::Report(args) => commands::run_report(&catalog, args).await,
            Commands::Claim(args) => commands::run_claim(&catalog, &args).await,
            Commands::Confirm(args) => commands::run_confirm(&catalog, &args).await,
        }
    })?;
    print!("{output}");
    Ok(())
}

fn init_tracing(level: &str) -> Result<()> {
    static INIT: OnceCell<()> = OnceCell::new();
    INIT.get_or_try_init(|| {
        let env_filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"));
        fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init();
        Ok(())
    })
    .map(|_| ())
}
