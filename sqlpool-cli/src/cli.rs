//! CLI argument definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::config::Config;
use crate::error::CliResult;

/// sqlpool - MySQL connection pool toolkit
#[derive(Parser, Debug)]
#[command(name = "sqlpool")]
#[command(version)]
#[command(about = "sqlpool - MySQL connection pool toolkit", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the configuration file (defaults to ./sqlpool.toml if present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Load the configuration file named on the command line, or the default
    /// one if it exists.
    pub fn load_config(&self) -> CliResult<Config> {
        Config::discover(self.config.as_deref())
    }
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Time a query loop with and without the pool
    Bench(BenchArgs),

    /// Connect through the pool and print its status
    Status(StatusArgs),

    /// Display version information
    Version,
}

/// How the benchmark obtains connections
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BenchMode {
    /// Check a connection out of the pool per query
    Pool,
    /// Reuse one connection for every query
    OneConn,
    /// Open and close a connection per query
    NewConn,
}

impl BenchMode {
    /// Name as accepted on the command line.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pool => "pool",
            Self::OneConn => "one-conn",
            Self::NewConn => "new-conn",
        }
    }
}

/// Arguments for the `bench` command
#[derive(Args, Debug)]
pub struct BenchArgs {
    /// Connection strategy to measure
    #[arg(short, long, value_enum, default_value = "pool")]
    pub mode: BenchMode,

    /// Number of queries to run
    #[arg(short = 'n', long, default_value_t = 1000)]
    pub count: u64,

    /// Concurrent tasks sharing the pool (pool mode only)
    #[arg(short, long, default_value_t = 1)]
    pub tasks: usize,

    /// Pool size; sets normal size, max size and pre-created connections
    #[arg(short, long)]
    pub size: Option<usize>,

    /// Query to run on each iteration
    #[arg(short, long, default_value = "SELECT 1+1")]
    pub query: String,

    /// Database connection URL
    #[arg(short, long, env = "DATABASE_URL")]
    pub url: Option<String>,
}

/// Arguments for the `status` command
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Database connection URL
    #[arg(short, long, env = "DATABASE_URL")]
    pub url: Option<String>,

    /// Ping the connection before reporting
    #[arg(long)]
    pub ping: bool,
}
