//! Background sink delivery.
//!
//! Spawns a thread that owns the `Sink` and drains records from a bounded
//! channel, so a slow database or file never stalls byte consumption. The
//! producer side never blocks: a full queue rejects the record.
//!
//! Each `SinkWorker` spawns exactly one thread. Dropping the worker (or
//! calling [`SinkWorker::finish`]) disconnects the queue; the thread persists
//! whatever is still queued, closes the sink and exits.
use crossbeam_channel as xch;
use crane_traits::{FailurePolicy, Record, Sink};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use crate::error::TelemetryError;
use crate::source_error::map_sink_error;

/// Why a record could not be queued.
#[derive(Debug)]
pub enum Rejected {
    /// Queue at capacity; the record is handed back.
    Full(Record),
    /// Worker thread is gone (fatal sink error).
    Stopped,
}

pub struct SinkWorker {
    tx: Option<xch::Sender<Record>>,
    /// Set once the sink reported a fatal failure.
    faulted: Arc<AtomicBool>,
    /// Records rejected under a log-and-continue policy.
    failures: Arc<AtomicU64>,
    sink_name: &'static str,
    join_handle: Option<std::thread::JoinHandle<Result<(), TelemetryError>>>,
}

impl SinkWorker {
    pub fn spawn<S: Sink + Send + 'static>(mut sink: S, depth: usize) -> Self {
        let (tx, rx) = xch::bounded::<Record>(depth.max(2));
        let faulted = Arc::new(AtomicBool::new(false));
        let faulted_clone = faulted.clone();
        let failures = Arc::new(AtomicU64::new(0));
        let failures_clone = failures.clone();
        let sink_name = sink.name();
        let policy = sink.failure_policy();

        let join_handle = std::thread::spawn(move || {
            let mut result = Ok(());
            // Ends when every sender is dropped and the queue is empty
            for record in rx.iter() {
                if let Err(e) = sink.persist(&record) {
                    match policy {
                        FailurePolicy::LogAndContinue => {
                            failures_clone.fetch_add(1, Ordering::Relaxed);
                            tracing::warn!(sink = sink_name, error = %e, "record not persisted");
                        }
                        FailurePolicy::Fatal => {
                            tracing::error!(sink = sink_name, error = %e, "sink failed, stopping");
                            faulted_clone.store(true, Ordering::Relaxed);
                            result = Err(map_sink_error(sink_name, &*e));
                            break;
                        }
                    }
                }
            }
            drop(rx);
            if let Err(e) = sink.close() {
                tracing::error!(sink = sink_name, error = %e, "sink close failed");
                if result.is_ok() {
                    result = Err(map_sink_error(sink_name, &*e));
                }
            }
            tracing::trace!(sink = sink_name, "sink thread exiting cleanly");
            result
        });

        Self {
            tx: Some(tx),
            faulted,
            failures,
            sink_name,
            join_handle: Some(join_handle),
        }
    }

    /// Queue a record without blocking.
    pub fn submit(&self, record: Record) -> Result<(), Rejected> {
        let Some(tx) = self.tx.as_ref() else {
            return Err(Rejected::Stopped);
        };
        tx.try_send(record).map_err(|e| match e {
            xch::TrySendError::Full(r) => Rejected::Full(r),
            xch::TrySendError::Disconnected(_) => Rejected::Stopped,
        })
    }

    /// Queue a record, waiting for room. Only for shutdown paths; the read
    /// loop uses [`SinkWorker::submit`].
    pub fn send(&self, record: Record) -> Result<(), Rejected> {
        let Some(tx) = self.tx.as_ref() else {
            return Err(Rejected::Stopped);
        };
        tx.send(record).map_err(|_| Rejected::Stopped)
    }

    pub fn is_faulted(&self) -> bool {
        self.faulted.load(Ordering::Relaxed)
    }

    /// Records currently waiting in the queue.
    pub fn queued(&self) -> usize {
        self.tx.as_ref().map_or(0, |tx| tx.len())
    }

    pub fn sink_name(&self) -> &'static str {
        self.sink_name
    }

    /// Disconnect, wait for the queue to drain and the sink to close.
    /// Returns the number of records the sink rejected along the way.
    pub fn finish(mut self) -> Result<u64, TelemetryError> {
        self.tx.take();
        let joined = match self.join_handle.take() {
            Some(handle) => handle
                .join()
                .map_err(|_| TelemetryError::State("sink thread panicked".into()))?,
            None => Ok(()),
        };
        joined.map(|()| self.failures.load(Ordering::Relaxed))
    }
}

impl Drop for SinkWorker {
    fn drop(&mut self) {
        // Disconnect first so the thread sees end-of-queue after draining
        self.tx.take();
        if let Some(handle) = self.join_handle.take() {
            match handle.join() {
                Ok(Ok(())) => {
                    tracing::trace!("sink thread joined successfully");
                }
                Ok(Err(e)) => {
                    tracing::warn!(error = %e, "sink thread ended with an error");
                }
                Err(e) => {
                    // Thread panicked; log but don't propagate (we're in Drop)
                    tracing::warn!(?e, "sink thread panicked during shutdown");
                }
            }
        }
    }
}
