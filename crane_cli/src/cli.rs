//! CLI argument definitions and shared statics.

use clap::{ArgAction, ArgGroup, Parser};
use crane_sinks::Destination;
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();
/// Whether the user asked for JSON output (controls structured error output).
pub static JSON_MODE: OnceLock<bool> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(
    name = "crane-telemetry",
    version,
    about = "Read crane hook telemetry from a serial link and store it"
)]
#[command(group(
    ArgGroup::new("destination")
        .required(true)
        .args(["database", "spreadsheet", "topic"])
))]
pub struct Cli {
    /// Serial baud rate [default: 38400, or serial.baud from the config]
    #[arg(short = 'b', long, value_name = "RATE")]
    pub baud: Option<u32>,

    /// Serial device, capture file, or `sim` for the built-in simulator [default: serial.port from the config]
    #[arg(short = 'p', long, value_name = "PORT")]
    pub port: Option<String>,

    /// Store records in this SQLite database (one table per crane)
    #[arg(short = 'd', long, value_name = "FILE")]
    pub database: Option<PathBuf>,

    /// Store records in this workbook directory (one CSV sheet per crane)
    #[arg(short = 'e', long, value_name = "DIR")]
    pub spreadsheet: Option<PathBuf>,

    /// Publish batches to this topic (JSON lines on stdout)
    #[arg(short = 't', long, value_name = "TOPIC")]
    pub topic: Option<String>,

    /// Path to config TOML (typed)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Calibration CSV with `adc,mass` headers
    #[arg(long, value_name = "FILE")]
    pub calibration: Option<PathBuf>,

    /// Log as JSON lines instead of pretty
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace)
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Persist from the read loop instead of a sink thread
    #[arg(long, action = ArgAction::SetTrue)]
    pub direct: bool,

    /// Only accept these crane ids (repeatable)
    #[arg(long = "crane", value_name = "ID")]
    pub cranes: Vec<u32>,

    /// Stop after this many records
    #[arg(long, value_name = "N")]
    pub max_records: Option<u64>,
}

impl Cli {
    pub fn destination(&self) -> Option<Destination> {
        if let Some(p) = &self.database {
            Some(Destination::Database(p.clone()))
        } else if let Some(p) = &self.spreadsheet {
            Some(Destination::Spreadsheet(p.clone()))
        } else {
            self.topic.clone().map(Destination::Topic)
        }
    }
}
