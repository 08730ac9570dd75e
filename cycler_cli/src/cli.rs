//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "cycler", version, about = "NiMH cell cycling rig")]
pub struct Cli {
    /// Path to config TOML (typed)
    #[arg(long, value_name = "FILE", default_value = "etc/cycler.toml")]
    pub config: PathBuf,

    /// Log as JSON lines instead of pretty
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace)
    #[arg(long = "log-level", value_name = "LEVEL", default_value = "info")]
    pub log_level: String,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Cycle the inserted cell until it is removed
    Cycle {
        /// Override cell capacity in amp-hours (takes precedence over config)
        #[arg(long, value_name = "AH")]
        capacity_ah: Option<f32>,
        /// Override the charge ceiling voltage
        #[arg(long, value_name = "VOLTS")]
        v_max: Option<f32>,
        /// Override the serial device path
        #[arg(long, value_name = "DEV")]
        port: Option<String>,
        /// Drive the simulated supply instead of real hardware
        #[arg(long, action = ArgAction::SetTrue)]
        simulate: bool,
    },
    /// Quick health check (instrument identity / sim ok)
    SelfCheck {
        /// Check against the simulated supply
        #[arg(long, action = ArgAction::SetTrue)]
        simulate: bool,
    },
}
