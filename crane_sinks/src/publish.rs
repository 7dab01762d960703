//! Batched publishing to a message topic.
//!
//! Records are grouped per crane and sent as one JSON document per batch:
//! `{"id": 3, "updates": [{"a": adc, "m": avg_mass, "x": .., "y": .., "t": iso}]}`.
use std::collections::BTreeMap;
use std::io::Write;

use crane_traits::{BoxError, FailurePolicy, Record, Sink, SinkError};
use serde::Serialize;
use serde_json::value::RawValue;

use crate::error::{Result, SinkFailure};

pub const DEFAULT_BATCH_SIZE: usize = 10;

/// Narrow capability over a message bus client.
pub trait Publisher {
    fn publish(&mut self, topic: &str, payload: &[u8]) -> std::result::Result<(), BoxError>;

    fn flush(&mut self) -> std::result::Result<(), BoxError> {
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Update {
    pub a: i64,
    pub m: f64,
    pub x: i32,
    pub y: i32,
    pub t: String,
}

impl From<&Record> for Update {
    fn from(r: &Record) -> Self {
        Self {
            a: r.raw_adc,
            m: r.average_mass,
            x: r.x,
            y: r.y,
            t: r.iso_time(),
        }
    }
}

#[derive(Serialize)]
struct Batch<'a> {
    id: u32,
    updates: &'a [Update],
}

pub fn encode_batch(crane_id: u32, updates: &[Update]) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec(&Batch {
        id: crane_id,
        updates,
    })?)
}

pub struct BatchPublishSink<P> {
    publisher: P,
    topic: String,
    batch_size: usize,
    batches: BTreeMap<u32, Vec<Update>>,
    published: u64,
}

impl<P: Publisher> BatchPublishSink<P> {
    pub fn new(publisher: P, topic: impl Into<String>, batch_size: usize) -> Self {
        Self {
            publisher,
            topic: topic.into(),
            batch_size: batch_size.max(1),
            batches: BTreeMap::new(),
            published: 0,
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Batches handed to the publisher so far.
    pub fn published(&self) -> u64 {
        self.published
    }

    pub fn pending(&self, crane_id: u32) -> usize {
        self.batches.get(&crane_id).map_or(0, Vec::len)
    }

    pub fn into_publisher(self) -> P {
        self.publisher
    }

    // The batch is cleared before sending; a failed publish loses it.
    fn send(&mut self, crane_id: u32) -> Result<()> {
        let updates = self.batches.remove(&crane_id).unwrap_or_default();
        if updates.is_empty() {
            return Ok(());
        }
        let payload = encode_batch(crane_id, &updates)?;
        self.publisher
            .publish(&self.topic, &payload)
            .map_err(|e| SinkFailure::Publish {
                topic: self.topic.clone(),
                message: e.to_string(),
            })?;
        self.published += 1;
        tracing::debug!(topic = %self.topic, crane_id, updates = updates.len(), "batch published");
        Ok(())
    }
}

impl<P: Publisher> Sink for BatchPublishSink<P> {
    fn persist(&mut self, record: &Record) -> std::result::Result<(), SinkError> {
        let batch = self.batches.entry(record.crane_id).or_default();
        batch.push(Update::from(record));
        if batch.len() >= self.batch_size {
            self.send(record.crane_id)?;
        }
        Ok(())
    }

    fn close(&mut self) -> std::result::Result<(), SinkError> {
        let cranes: Vec<u32> = self.batches.keys().copied().collect();
        let mut first_err = None;
        for id in cranes {
            if let Err(e) = self.send(id) {
                tracing::warn!(crane_id = id, error = %e, "partial batch not published");
                first_err.get_or_insert(e);
            }
        }
        self.publisher.flush()?;
        match first_err {
            Some(e) => Err(e.into()),
            None => Ok(()),
        }
    }

    fn failure_policy(&self) -> FailurePolicy {
        FailurePolicy::LogAndContinue
    }

    fn name(&self) -> &'static str {
        "publish"
    }
}

#[derive(Serialize)]
struct Envelope<'a> {
    topic: &'a str,
    payload: &'a RawValue,
}

/// Writes each message as one JSON line: `{"topic": .., "payload": {..}}`.
#[derive(Debug)]
pub struct JsonLinesPublisher<W> {
    out: W,
}

impl JsonLinesPublisher<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write> JsonLinesPublisher<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Publisher for JsonLinesPublisher<W> {
    fn publish(&mut self, topic: &str, payload: &[u8]) -> std::result::Result<(), BoxError> {
        // Payload bytes are checked, never rebuilt
        let payload: &RawValue = serde_json::from_slice(payload)?;
        let line = Envelope { topic, payload };
        serde_json::to_writer(&mut self.out, &line)?;
        self.out.write_all(b"\n")?;
        Ok(())
    }

    fn flush(&mut self) -> std::result::Result<(), BoxError> {
        Ok(self.out.flush()?)
    }
}
