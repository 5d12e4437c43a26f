//! CLI argument parsing using clap derive.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Propagates content from the default language variant into derived variants.
#[derive(Parser, Debug)]
#[command(name = "variantsync")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Synchronize every document of a site into its sync variants
    ///
    /// Examples:
    ///   variantsync sync --db content.db --config sync.json demo
    ///   variantsync sync --db content.db --config sync.json demo --translate --glossary de.json
    Sync(SyncArgs),
}

#[derive(clap::Args, Debug, Clone, PartialEq, Eq)]
pub struct SyncArgs {
    /// Site node name; the walk starts at /sites/<site>
    pub site: String,

    /// Node store (SQLite file)
    #[arg(long)]
    pub db: PathBuf,

    /// Variant and node type configuration (JSON)
    #[arg(long)]
    pub config: PathBuf,

    /// Translate translatable properties instead of only filling missing ones
    #[arg(long)]
    pub translate: bool,

    /// Glossary used as translator (JSON)
    #[arg(long)]
    pub glossary: Option<PathBuf>,

    /// Fail on glossary misses instead of keeping the source text
    #[arg(long, requires = "glossary")]
    pub strict_glossary: bool,

    /// Stop at the first failing document
    #[arg(long)]
    pub fail_fast: bool,

    /// trace|debug|info|warn|error
    #[arg(long)]
    pub log_level: Option<String>,

    /// Directory for rolling log files [default: logs next to the node store]
    #[arg(long)]
    pub log_dir: Option<PathBuf>,
}
