//! VariantSync CLI.
//!
//! # Responsibility
//! - Wire node store, configuration, translator and logging for one run.
//! - Report progress on stdout and failures on stderr.
//! - Exit non-zero when the run did not fully succeed.

mod cli;

use clap::Parser;
use cli::{Cli, Commands, SyncArgs};
use log::error;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use variantsync_core::db::{open_db, DbError};
use variantsync_core::{
    default_log_level, init_logging, site_root_path, ConfigError, GlossaryTranslator,
    LoggingError, NodeRepoError, SqliteNodeRepository, SyncConfig, SyncError, SyncProgress,
    SyncReport, SyncRunOptions, SyncRunner,
};

#[derive(Debug)]
enum CliError {
    Logging(LoggingError),
    Db(DbError),
    Config(ConfigError),
    Repo(NodeRepoError),
    Sync(SyncError),
    Io(std::io::Error),
}

impl Display for CliError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Logging(err) => write!(f, "logging: {err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::Config(err) => write!(f, "configuration: {err}"),
            Self::Repo(err) => write!(f, "{err}"),
            Self::Sync(err) => write!(f, "{err}"),
            Self::Io(err) => write!(f, "{err}"),
        }
    }
}

impl Error for CliError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Logging(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::Config(err) => Some(err),
            Self::Repo(err) => Some(err),
            Self::Sync(err) => Some(err),
            Self::Io(err) => Some(err),
        }
    }
}

impl From<LoggingError> for CliError {
    fn from(value: LoggingError) -> Self {
        Self::Logging(value)
    }
}

impl From<DbError> for CliError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<ConfigError> for CliError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<NodeRepoError> for CliError {
    fn from(value: NodeRepoError) -> Self {
        Self::Repo(value)
    }
}

impl From<SyncError> for CliError {
    fn from(value: SyncError) -> Self {
        Self::Sync(value)
    }
}

impl From<std::io::Error> for CliError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Sync(args) => cmd_sync(&args),
    };

    match result {
        Ok(report) if report.is_success() => ExitCode::SUCCESS,
        Ok(report) => {
            for failure in &report.failures {
                eprintln!("failed: {} ({})", failure.path, failure.message);
            }
            ExitCode::FAILURE
        }
        Err(err) => {
            error!("event=cli_run module=cli status=error error={err}");
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn cmd_sync(args: &SyncArgs) -> Result<SyncReport, CliError> {
    let log_dir = resolve_log_dir(args)?;
    let level = args
        .log_level
        .clone()
        .unwrap_or_else(|| default_log_level().to_string());
    init_logging(&level, &log_dir.to_string_lossy())?;

    let config = SyncConfig::load(&args.config)?;
    let translator = match &args.glossary {
        Some(path) => GlossaryTranslator::load(path)?.strict(args.strict_glossary),
        None => GlossaryTranslator::default(),
    };
    let conn = open_db(&args.db)?;
    let repo = SqliteNodeRepository::try_new(&conn)?;
    let runner = SyncRunner::new(&repo, &config, &translator)?;

    let options = SyncRunOptions {
        translate: args.translate,
        fail_fast: args.fail_fast,
    };
    let mut total = 0;
    let report = runner.run_with_progress(
        &site_root_path(&args.site),
        options,
        &mut |event| match event {
            SyncProgress::Started { roots_total } => {
                total = roots_total;
                println!("Found {roots_total} document nodes");
            }
            SyncProgress::RootFinished {
                index,
                path,
                nodes_visited: Some(visited),
            } => println!("[{}/{total}] {path}: {visited} nodes", index + 1),
            SyncProgress::RootFinished {
                index,
                path,
                nodes_visited: None,
            } => println!("[{}/{total}] {path}: failed", index + 1),
        },
    )?;

    println!(
        "Synced {}/{} documents ({} nodes), {} failed",
        report.roots_synced,
        report.roots_total,
        report.nodes_visited,
        report.failures.len()
    );
    Ok(report)
}

/// Absolute log directory; defaults to `logs/` beside the node store.
fn resolve_log_dir(args: &SyncArgs) -> Result<PathBuf, CliError> {
    let dir = match &args.log_dir {
        Some(dir) => dir.clone(),
        None => args
            .db
            .parent()
            .unwrap_or_else(|| Path::new(""))
            .join("logs"),
    };
    if dir.is_absolute() {
        return Ok(dir);
    }
    Ok(std::env::current_dir()?.join(dir))
}
