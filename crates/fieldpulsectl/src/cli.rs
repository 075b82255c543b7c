//! Command-line surface.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};

// Version is embedded at build time
pub const VERSION: &str = env!("FIELDPULSE_VERSION");

#[derive(Parser, Debug)]
#[command(name = "fieldpulsectl")]
#[command(about = "Field-sales performance metrics and hierarchy rollups", long_about = None)]
#[command(version = VERSION)]
pub struct Cli {
    /// Config file (default /etc/fieldpulse/config.toml, or $FIELDPULSE_CONFIG)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Compute as of this date instead of the local calendar date (YYYY-MM-DD)
    #[arg(long, global = true)]
    pub today: Option<NaiveDate>,

    /// Visit database, overriding [storage] db_path
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Emit JSON instead of text
    #[arg(long, global = true)]
    pub json: bool,

    /// Debug logging on stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Pooled visit and sales rollup for a node (every root when --node is omitted)
    Report {
        /// Dataset JSON exported by the catalog
        #[arg(long)]
        data: PathBuf,

        #[arg(long)]
        node: Option<u64>,
    },

    /// Visit metrics for one visit assignment
    Assignment {
        #[arg(long)]
        data: PathBuf,

        #[arg(long)]
        id: u64,
    },

    /// Recruitment Rhythm and ramp for one sales assignment
    Sales {
        #[arg(long)]
        data: PathBuf,

        #[arg(long)]
        id: u64,
    },

    /// Visit assignments under a node that have gone quiet
    Attention {
        #[arg(long)]
        data: PathBuf,

        #[arg(long)]
        node: u64,
    },

    /// Record a visit on behalf of a delegate
    Record {
        #[arg(long)]
        data: PathBuf,

        #[arg(long)]
        assignment: u64,

        /// Acting delegate; must own the assignment
        #[arg(long)]
        delegate: u64,

        /// Visit date (defaults to today)
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Print the effective configuration as TOML
    Config,
}
