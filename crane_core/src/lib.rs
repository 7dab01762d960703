#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Core telemetry ingest (device- and destination-agnostic).
//!
//! Bytes from any `crane_traits::ByteSource` become `crane_traits::Record`s
//! handed to any `crane_traits::Sink`.
//!
//! ## Architecture
//!
//! - **Framing**: terminator-delimited ASCII lines (`frame` module)
//! - **Parsing**: tagged tokens `i m x y k` into `ParsedFields` (`parser` module)
//! - **Calibration**: least-squares ADC -> mass line (`calibration` module)
//! - **Smoothing**: bounded rolling mean per crane (`smoothing` module)
//! - **Assembly**: fields + mass + timestamp into a record (`record` module)
//! - **Context**: the owned per-run state (`pipeline` module)
//! - **Delivery**: inline or through a bounded sink thread (`runner`, `worker`)

// Module declarations
pub mod calibration;
pub mod config;
pub mod conversions;
pub mod error;
pub mod frame;
pub mod mocks;
pub mod parser;
pub mod pipeline;
pub mod record;
pub mod runner;
pub mod smoothing;
pub mod source_error;
pub mod status;
pub mod worker;

pub use calibration::{CalibrationModel, DEFAULT_TABLE};
pub use config::{DispatchMode, PipelineCfg, SourceCfg};
pub use error::{CalibrationError, LineError, TelemetryError};
pub use frame::{FrameAssembler, FrameState};
pub use parser::{ParsedFields, Token, parse};
pub use pipeline::Pipeline;
pub use record::RecordAssembler;
pub use runner::{RunParams, run, run_with_clock};
pub use smoothing::{SmoothingBank, SmoothingBuffer};
pub use status::{DropReason, LineOutcome, RunSummary};
