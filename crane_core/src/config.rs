//! Runtime configuration types for the ingest pipeline.
//!
//! These are separate from the TOML-deserialized config in `crane_config`;
//! see `conversions` for the mapping.

use crate::frame::DEFAULT_MAX_LINE_LEN;
use crate::smoothing::DEFAULT_WINDOW;

/// Framing, smoothing and filtering knobs of the pipeline context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineCfg {
    /// Longest accepted line in bytes.
    pub max_line_len: usize,
    /// Smoothing window per crane.
    pub window: usize,
    /// Crane allow-list; empty accepts every crane.
    pub cranes: Vec<u32>,
}

impl Default for PipelineCfg {
    fn default() -> Self {
        Self {
            max_line_len: DEFAULT_MAX_LINE_LEN,
            window: DEFAULT_WINDOW,
            cranes: Vec::new(),
        }
    }
}

/// How the read loop talks to the byte source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceCfg {
    /// Timeout handed to each `ByteSource::read`.
    pub read_timeout_ms: u64,
    /// Consecutive failed reads tolerated before the link counts as lost (0 = unlimited).
    pub max_consecutive_errors: u32,
}

impl Default for SourceCfg {
    fn default() -> Self {
        Self {
            read_timeout_ms: 1000,
            max_consecutive_errors: 50,
        }
    }
}

/// How records reach the sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchMode {
    /// Call the sink inline from the read loop.
    Direct,
    /// Hand records to a sink thread through a bounded queue of `depth` records.
    Queued { depth: usize },
}

impl Default for DispatchMode {
    fn default() -> Self {
        DispatchMode::Queued { depth: 64 }
    }
}
