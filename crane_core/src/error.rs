use thiserror::Error;

/// Fatal or run-level failures of the ingest pipeline.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TelemetryError {
    #[error("connection error: {0}")]
    Connection(String),
    #[error("calibration fit error: {0}")]
    CalibrationFit(#[from] CalibrationError),
    #[error("sink write error ({sink}): {message}")]
    SinkWrite { sink: &'static str, message: String },
    #[error("configuration error: {0}")]
    Config(String),
    #[error("invalid state: {0}")]
    State(String),
}

/// Why a single line did not produce a record. Always recoverable.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LineError {
    #[error("incomplete frame: {0}")]
    IncompleteFrame(&'static str),
    #[error("malformed field '{tag}': {value:?}")]
    MalformedField { tag: char, value: String },
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum CalibrationError {
    #[error("calibration table is empty")]
    Empty,
    #[error("calibration needs at least two distinct ADC values, got {0}")]
    NotEnoughDistinct(usize),
    #[error("calibration row {0} has a non-finite mass")]
    NonFinite(usize),
    #[error("calibration produced non-finite coefficients")]
    Degenerate,
    #[error("calibration table unreadable: {0}")]
    Table(String),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
