//! Test and helper mocks for crane_core

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crane_traits::{BoxError, ByteSource, FailurePolicy, Record, Sink, SinkError};

/// Sink that keeps every record; clones share the same storage so a test can
/// keep a handle while the sink itself moves into a worker thread.
#[derive(Debug, Clone, Default)]
pub struct CapturingSink {
    records: Arc<Mutex<Vec<Record>>>,
    closed: Arc<Mutex<bool>>,
}

impl CapturingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<Record> {
        self.records.lock().map(|r| r.clone()).unwrap_or_default()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.lock().map(|c| *c).unwrap_or(false)
    }
}

impl Sink for CapturingSink {
    fn persist(&mut self, record: &Record) -> Result<(), SinkError> {
        self.records
            .lock()
            .map_err(|_| "capture poisoned")?
            .push(record.clone());
        Ok(())
    }

    fn close(&mut self) -> Result<(), SinkError> {
        *self.closed.lock().map_err(|_| "capture poisoned")? = true;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "capture"
    }
}

/// Sink that rejects every record with the given policy.
#[derive(Debug, Clone, Copy)]
pub struct FailingSink(pub FailurePolicy);

impl Sink for FailingSink {
    fn persist(&mut self, _record: &Record) -> Result<(), SinkError> {
        Err("disk full".into())
    }

    fn failure_policy(&self) -> FailurePolicy {
        self.0
    }

    fn name(&self) -> &'static str {
        "failing"
    }
}

/// One scripted read result.
#[derive(Debug, Clone)]
pub enum Chunk {
    Data(Vec<u8>),
    Error(std::io::ErrorKind),
}

/// Byte source replaying scripted chunks, then reporting end of stream.
#[derive(Debug, Default)]
pub struct ScriptedSource {
    chunks: VecDeque<Chunk>,
}

impl ScriptedSource {
    pub fn new(chunks: impl IntoIterator<Item = Chunk>) -> Self {
        Self {
            chunks: chunks.into_iter().collect(),
        }
    }

    /// Whole byte string delivered in one read.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self::new([Chunk::Data(bytes.to_vec())])
    }
}

impl ByteSource for ScriptedSource {
    fn read(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize, BoxError> {
        match self.chunks.pop_front() {
            None => Ok(0),
            Some(Chunk::Data(data)) if data.is_empty() => self.read(buf, timeout),
            Some(Chunk::Error(kind)) => Err(Box::new(std::io::Error::from(kind))),
            Some(Chunk::Data(mut data)) => {
                let n = data.len().min(buf.len());
                buf[..n].copy_from_slice(&data[..n]);
                if n < data.len() {
                    self.chunks.push_front(Chunk::Data(data.split_off(n)));
                }
                Ok(n)
            }
        }
    }
}
