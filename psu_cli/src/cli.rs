//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "psu", version, about = "PSU monitor and MAX17055 fuel-gauge tool")]
pub struct Cli {
    /// Path to config TOML; built-in defaults when omitted
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Print results and errors as JSON, log as JSON lines
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace); overrides [logging] level
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Poll the PSU and shut the host down on standby or low battery
    Monitor {
        /// Do not shut down when the operator switch is off
        #[arg(long, action = ArgAction::SetTrue)]
        ignore_standby: bool,
        /// Do not shut down on low battery
        #[arg(long, action = ArgAction::SetTrue)]
        ignore_threshold: bool,
        /// Stop after this many milliseconds instead of waiting for Ctrl-C
        #[arg(long, value_name = "MS")]
        run_for_ms: Option<u64>,
    },
    /// Configure the fuel gauge and restore learned parameters
    Init {
        /// Reconfigure even without a power-on reset
        #[arg(long, action = ArgAction::SetTrue)]
        force: bool,
    },
    /// Read one battery sample
    Sample,
    /// Inspect or move learned gauge parameters
    Params {
        #[command(subcommand)]
        action: ParamsAction,
    },
    /// Quick health check (board and gauge reachable)
    SelfCheck,
}

#[derive(Subcommand, Debug, Clone, Copy)]
pub enum ParamsAction {
    /// Show the gauge's current parameters and the saved record
    Show,
    /// Save the gauge's current parameters
    Save,
    /// Write the saved parameters back into the gauge
    Restore,
}
