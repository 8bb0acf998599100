//! Command-line and environment configuration

use std::path::PathBuf;

use clap::Parser;

use crate::btree::{BTreeError, BTreeResult, DEFAULT_ORDER};

/// Raw command-line arguments
#[derive(Debug, Clone, Parser)]
#[command(name = "btindex", version, about = "In-memory B-tree index shell")]
pub struct Args {
    /// Tree order (maximum children per node, at least 2)
    #[arg(short, long, env = "BTINDEX_ORDER", default_value_t = DEFAULT_ORDER)]
    pub order: usize,

    /// Verify tree invariants after every mutating command
    #[arg(long)]
    pub verify: bool,

    /// Log filter, in tracing EnvFilter syntax
    #[arg(long, env = "BTINDEX_LOG", default_value = "warn")]
    pub log: String,

    /// Insert every key from a CSV file before running commands
    #[arg(long, value_name = "CSV")]
    pub load: Option<PathBuf>,

    /// Run a command line and exit instead of starting the shell (repeatable)
    #[arg(short = 'c', long = "command", value_name = "COMMANDS")]
    pub commands: Vec<String>,
}

/// Validated shell configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub order: usize,
    pub verify: bool,
    pub log_filter: String,
    pub preload: Option<PathBuf>,
    pub commands: Vec<String>,
}

impl Config {
    pub fn from_args(args: Args) -> BTreeResult<Self> {
        if args.order < 2 {
            return Err(BTreeError::InvalidOrder(args.order));
        }

        Ok(Self {
            order: args.order,
            verify: args.verify,
            log_filter: args.log,
            preload: args.load,
            commands: args.commands,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            order: DEFAULT_ORDER,
            verify: false,
            log_filter: "warn".to_string(),
            preload: None,
            commands: Vec::new(),
        }
    }
}
