use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crane_traits::clock::SystemClock;
use crane_traits::{ByteSource, Clock, FailurePolicy, Record, Sink};

use crate::calibration::CalibrationModel;
use crate::config::{DispatchMode, PipelineCfg, SourceCfg};
use crate::error::{Result as CoreResult, TelemetryError};
use crate::pipeline::Pipeline;
use crate::source_error::{ReadFault, classify_read_error, map_sink_error};
use crate::status::{LineOutcome, RunSummary};
use crate::worker::{Rejected, SinkWorker};

/// Bytes requested from the source per read.
const READ_CHUNK: usize = 256;

/// Records held back while the sink queue is full. Past this the newest
/// record is dropped and counted as a queue overflow.
pub const BACKLOG_LIMIT: usize = 65_536;

/// Everything the read loop needs besides the source, sink and calibration.
#[derive(Debug, Clone, Default)]
pub struct RunParams {
    pub pipeline: PipelineCfg,
    pub source: SourceCfg,
    pub dispatch: DispatchMode,
    /// Stop after this many emitted records.
    pub max_records: Option<u64>,
}

/// Where emitted records go: inline, or through the sink thread.
enum Delivery<S: Sink + Send + 'static> {
    Direct(S),
    Queued {
        worker: SinkWorker,
        /// Records waiting for room in the queue, oldest first.
        backlog: VecDeque<Record>,
    },
}

impl<S: Sink + Send + 'static> Delivery<S> {
    fn new(sink: S, mode: DispatchMode) -> Self {
        match mode {
            DispatchMode::Direct => Delivery::Direct(sink),
            DispatchMode::Queued { depth } => Delivery::Queued {
                worker: SinkWorker::spawn(sink, depth),
                backlog: VecDeque::new(),
            },
        }
    }

    /// `false` means the sink side is gone.
    fn pump(&mut self) -> bool {
        match self {
            Delivery::Direct(_) => true,
            Delivery::Queued { worker, backlog } => pump_backlog(worker, backlog),
        }
    }

    /// Hand one record to the sink. `Ok(false)` means the sink side is gone
    /// and the loop should stop; `finish` reports why.
    fn deliver(&mut self, record: Record, summary: &mut RunSummary) -> Result<bool, TelemetryError> {
        match self {
            Delivery::Direct(sink) => match sink.persist(&record) {
                Ok(()) => Ok(true),
                Err(e) => match sink.failure_policy() {
                    FailurePolicy::LogAndContinue => {
                        summary.sink_failures += 1;
                        tracing::warn!(sink = sink.name(), error = %e, "record not persisted");
                        Ok(true)
                    }
                    FailurePolicy::Fatal => Err(map_sink_error(sink.name(), &*e)),
                },
            },
            Delivery::Queued { worker, backlog } => {
                if !pump_backlog(worker, backlog) {
                    return Ok(false);
                }
                if backlog.is_empty() {
                    match worker.submit(record) {
                        Ok(()) => return Ok(true),
                        Err(Rejected::Full(rec)) => {
                            tracing::debug!(sink = worker.sink_name(), "sink queue full, holding records back");
                            backlog.push_back(rec);
                        }
                        Err(Rejected::Stopped) => return Ok(false),
                    }
                } else if backlog.len() >= BACKLOG_LIMIT {
                    summary.queue_overflows += 1;
                    tracing::warn!(
                        sink = worker.sink_name(),
                        crane_id = record.crane_id,
                        backlog = backlog.len(),
                        "sink backlog full, record dropped"
                    );
                } else {
                    backlog.push_back(record);
                }
                Ok(true)
            }
        }
    }

    fn is_faulted(&self) -> bool {
        match self {
            Delivery::Direct(_) => false,
            Delivery::Queued { worker, .. } => worker.is_faulted(),
        }
    }

    /// Flush the backlog, then drain, close and release the sink.
    fn finish(self, summary: &mut RunSummary) -> Result<(), TelemetryError> {
        match self {
            Delivery::Direct(mut sink) => sink.close().map_err(|e| map_sink_error(sink.name(), &*e)),
            Delivery::Queued { worker, mut backlog } => {
                while let Some(record) = backlog.pop_front() {
                    if worker.send(record).is_err() {
                        tracing::warn!(
                            sink = worker.sink_name(),
                            lost = backlog.len() + 1,
                            "sink stopped before the backlog was flushed"
                        );
                        break;
                    }
                }
                let failures = worker.finish()?;
                summary.sink_failures += failures;
                Ok(())
            }
        }
    }
}

/// Move backlogged records into the queue while it has room. Never blocks.
fn pump_backlog(worker: &SinkWorker, backlog: &mut VecDeque<Record>) -> bool {
    while let Some(record) = backlog.pop_front() {
        match worker.submit(record) {
            Ok(()) => {}
            Err(Rejected::Full(rec)) => {
                backlog.push_front(rec);
                return true;
            }
            Err(Rejected::Stopped) => return false,
        }
    }
    true
}

/// Run the ingest loop until end of stream, `shutdown`, `max_records`, or a
/// fatal error. The sink is always drained and closed before returning.
pub fn run<B, S>(
    source: B,
    sink: S,
    model: CalibrationModel,
    params: RunParams,
    shutdown: &AtomicBool,
) -> CoreResult<RunSummary>
where
    B: ByteSource,
    S: Sink + Send + 'static,
{
    run_with_clock(source, sink, model, params, shutdown, SystemClock::new())
}

pub fn run_with_clock<B, S, C>(
    mut source: B,
    sink: S,
    model: CalibrationModel,
    params: RunParams,
    shutdown: &AtomicBool,
    clock: C,
) -> CoreResult<RunSummary>
where
    B: ByteSource,
    S: Sink + Send + 'static,
    C: Clock,
{
    let mut pipeline = Pipeline::with_clock(model, &params.pipeline, clock);
    let mut delivery = Delivery::new(sink, params.dispatch);
    tracing::info!(
        mode = ?params.dispatch,
        window = params.pipeline.window,
        cranes = ?params.pipeline.cranes,
        "ingest start"
    );

    let looped = read_loop(&mut source, &mut pipeline, &mut delivery, &params, shutdown);

    let mut summary = pipeline.close();
    let finished = delivery.finish(&mut summary);
    tracing::info!(
        bytes = summary.bytes,
        lines = summary.lines,
        emitted = summary.emitted,
        dropped = summary.dropped(),
        undecodable = summary.undecodable,
        sink_failures = summary.sink_failures,
        queue_overflows = summary.queue_overflows,
        "ingest stopped"
    );

    // A loop error is the root cause; a sink error surfaces otherwise
    looped?;
    finished?;
    Ok(summary)
}

fn read_loop<B, S, C>(
    source: &mut B,
    pipeline: &mut Pipeline<C>,
    delivery: &mut Delivery<S>,
    params: &RunParams,
    shutdown: &AtomicBool,
) -> std::result::Result<(), TelemetryError>
where
    B: ByteSource,
    S: Sink + Send + 'static,
    C: Clock,
{
    let timeout = Duration::from_millis(params.source.read_timeout_ms.max(1));
    let max_errors = params.source.max_consecutive_errors;
    let mut consecutive_errors: u32 = 0;
    let mut buf = [0u8; READ_CHUNK];

    loop {
        if shutdown.load(Ordering::Relaxed) {
            tracing::info!("shutdown requested");
            return Ok(());
        }
        if delivery.is_faulted() || !delivery.pump() {
            return Ok(());
        }

        let n = match source.read(&mut buf, timeout) {
            Ok(0) => {
                tracing::info!("byte source reached end of stream");
                return Ok(());
            }
            Ok(n) => {
                consecutive_errors = 0;
                n
            }
            Err(e) => match classify_read_error(&*e) {
                ReadFault::Idle => {
                    consecutive_errors = 0;
                    continue;
                }
                ReadFault::Transient(msg) => {
                    consecutive_errors = consecutive_errors.saturating_add(1);
                    tracing::warn!(error = %msg, consecutive_errors, "byte source read failed");
                    if max_errors > 0 && consecutive_errors >= max_errors {
                        return Err(TelemetryError::Connection(format!(
                            "{consecutive_errors} consecutive read failures, last: {msg}"
                        )));
                    }
                    continue;
                }
            },
        };

        for &byte in &buf[..n] {
            let Some(LineOutcome::Emitted(record)) = pipeline.push_byte(byte) else {
                continue;
            };
            if !delivery.deliver(record, pipeline.summary_mut())? {
                return Ok(());
            }
            if let Some(max) = params.max_records
                && pipeline.summary().emitted >= max
            {
                tracing::info!(max, "record limit reached");
                return Ok(());
            }
        }
    }
}
