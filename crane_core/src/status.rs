//! Per-line outcome of the framing/parsing state machine.

use crate::error::LineError;
use crane_traits::Record;

/// Why a finished line produced no record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropReason {
    /// Incomplete or malformed frame.
    Invalid(LineError),
    /// Line exceeded the configured maximum length.
    Overflow { len: usize },
    /// Crane not in the allow-list.
    Ignored { crane_id: u32 },
}

/// Result of a terminator: `PARSE -> EMIT | DROP`.
#[derive(Debug, Clone, PartialEq)]
pub enum LineOutcome {
    Emitted(Record),
    Dropped(DropReason),
}

impl LineOutcome {
    pub fn record(&self) -> Option<&Record> {
        match self {
            LineOutcome::Emitted(r) => Some(r),
            LineOutcome::Dropped(_) => None,
        }
    }
}

/// Counters reported at the end of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub bytes: u64,
    pub lines: u64,
    pub emitted: u64,
    pub incomplete: u64,
    pub malformed: u64,
    pub overflowed: u64,
    pub ignored: u64,
    pub undecodable: u64,
    /// Records rejected by the sink under a log-and-continue policy.
    pub sink_failures: u64,
    /// Records dropped because the sink queue was full.
    pub queue_overflows: u64,
}

impl RunSummary {
    pub fn dropped(&self) -> u64 {
        self.incomplete + self.malformed + self.overflowed + self.ignored
    }

    pub(crate) fn count(&mut self, outcome: &LineOutcome) {
        self.lines += 1;
        match outcome {
            LineOutcome::Emitted(_) => self.emitted += 1,
            LineOutcome::Dropped(DropReason::Invalid(LineError::IncompleteFrame(_))) => {
                self.incomplete += 1;
            }
            LineOutcome::Dropped(DropReason::Invalid(LineError::MalformedField { .. })) => {
                self.malformed += 1;
            }
            LineOutcome::Dropped(DropReason::Overflow { .. }) => self.overflowed += 1,
            LineOutcome::Dropped(DropReason::Ignored { .. }) => self.ignored += 1,
        }
    }
}
