//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "balancer", version, about = "Balancing-offset storage controller")]
pub struct Cli {
    /// Path to config TOML (typed)
    #[arg(long, value_name = "FILE", default_value = "etc/balancer.toml")]
    pub config: PathBuf,

    /// Load profile CSV for the simulated site (headers: active,reactive); overrides sim.profile_csv
    #[arg(long, value_name = "FILE")]
    pub profile: Option<PathBuf>,

    /// Emit tick reports and errors as JSON lines
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace); falls back to logging.level
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the control loop against the simulated site
    Run {
        /// Stop after this many ticks (default: run until Ctrl-C)
        #[arg(long, value_name = "N")]
        ticks: Option<u64>,
        /// Override runner.period_ms
        #[arg(long = "period-ms", value_name = "MS")]
        period_ms: Option<u64>,
    },
    /// Read every measurement and bound once and report them
    SelfCheck,
}
