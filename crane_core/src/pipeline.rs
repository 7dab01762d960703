//! The ingest context: bytes in, records out.
//!
//! A `Pipeline` owns every piece of mutable state the loop needs (line
//! buffer, per-crane smoothing windows, heartbeat ADC memory, counters). It is
//! created once the calibration is known and consumed by [`Pipeline::close`].
//! It is deliberately not shared between threads; the calibration model it
//! holds is `Copy` and can be handed to other readers freely.

use crane_traits::Clock;
use crane_traits::clock::SystemClock;

use crate::calibration::CalibrationModel;
use crate::config::PipelineCfg;
use crate::frame::{FrameAssembler, FrameState, Framed};
use crate::parser;
use crate::record::RecordAssembler;
use crate::status::{DropReason, LineOutcome, RunSummary};

#[derive(Debug)]
pub struct Pipeline<C: Clock = SystemClock> {
    frames: FrameAssembler,
    records: RecordAssembler,
    cranes: Vec<u32>,
    clock: C,
    summary: RunSummary,
}

impl Pipeline<SystemClock> {
    pub fn open(model: CalibrationModel, cfg: &PipelineCfg) -> Self {
        Self::with_clock(model, cfg, SystemClock::new())
    }
}

impl<C: Clock> Pipeline<C> {
    pub fn with_clock(model: CalibrationModel, cfg: &PipelineCfg, clock: C) -> Self {
        Self {
            frames: FrameAssembler::new(cfg.max_line_len),
            records: RecordAssembler::new(model, cfg.window),
            cranes: cfg.cranes.clone(),
            clock,
            summary: RunSummary::default(),
        }
    }

    pub fn model(&self) -> &CalibrationModel {
        self.records.model()
    }

    pub fn records(&self) -> &RecordAssembler {
        &self.records
    }

    pub fn frame_state(&self) -> FrameState {
        self.frames.state()
    }

    pub fn summary(&self) -> &RunSummary {
        &self.summary
    }

    pub(crate) fn summary_mut(&mut self) -> &mut RunSummary {
        &mut self.summary
    }

    /// Feed one byte. Returns an outcome whenever a terminator completes a line.
    pub fn push_byte(&mut self, byte: u8) -> Option<LineOutcome> {
        self.summary.bytes += 1;
        let outcome = match self.frames.push(byte) {
            Framed::Pending => return None,
            Framed::Undecodable(b) => {
                self.summary.undecodable += 1;
                tracing::trace!(byte = b, "dropping undecodable byte");
                return None;
            }
            Framed::Overflowed { len } => LineOutcome::Dropped(DropReason::Overflow { len }),
            Framed::Line(line) => self.process_line(&line),
        };
        self.summary.count(&outcome);
        if let LineOutcome::Dropped(reason) = &outcome {
            tracing::debug!(?reason, "line dropped");
        }
        Some(outcome)
    }

    /// Feed a chunk, collecting every finished line.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<LineOutcome> {
        bytes.iter().filter_map(|&b| self.push_byte(b)).collect()
    }

    /// Parse, filter and assemble one complete line. Does not touch counters.
    pub fn process_line(&mut self, line: &str) -> LineOutcome {
        let fields = match parser::parse(line) {
            Ok(f) => f,
            Err(e) => return LineOutcome::Dropped(DropReason::Invalid(e)),
        };
        if let Some(id) = fields.crane_id
            && !self.cranes.is_empty()
            && !self.cranes.contains(&id)
        {
            return LineOutcome::Dropped(DropReason::Ignored { crane_id: id });
        }
        match self.records.assemble(&fields, self.clock.now()) {
            Ok(record) => LineOutcome::Emitted(record),
            Err(e) => LineOutcome::Dropped(DropReason::Invalid(e)),
        }
    }

    /// End of the context's life. Unterminated bytes are never parsed.
    pub fn close(self) -> RunSummary {
        let pending = self.frames.pending().len();
        if pending > 0 {
            tracing::debug!(pending, "discarding unterminated line at close");
        }
        self.summary
    }
}
