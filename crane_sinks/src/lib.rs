//! Record destinations.
//!
//! Each sink implements [`crane_traits::Sink`] and declares its own failure
//! policy: the database logs and continues, the spreadsheet is fatal (a
//! workbook with holes is worse than a stopped run), the publisher drops the
//! failed batch and continues.
pub mod database;
pub mod error;
pub mod publish;
pub mod spreadsheet;

use std::path::PathBuf;

use crane_traits::Sink;

pub use database::DatabaseSink;
pub use error::SinkFailure;
pub use publish::{BatchPublishSink, JsonLinesPublisher, Publisher};
pub use spreadsheet::SpreadsheetSink;

/// Where records go. Exactly one per run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    Database(PathBuf),
    Spreadsheet(PathBuf),
    Topic(String),
}

impl Destination {
    /// Matches the `name()` of the sink it opens.
    pub fn label(&self) -> &'static str {
        match self {
            Destination::Database(_) => "database",
            Destination::Spreadsheet(_) => "spreadsheet",
            Destination::Topic(_) => "publish",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SinkOptions {
    pub commit_every: usize,
    pub batch_size: usize,
}

impl Default for SinkOptions {
    fn default() -> Self {
        Self {
            commit_every: 1,
            batch_size: publish::DEFAULT_BATCH_SIZE,
        }
    }
}

/// Open the sink for `dest`. Topics are published as JSON lines on stdout.
pub fn open_sink(dest: &Destination, opts: SinkOptions) -> error::Result<Box<dyn Sink + Send>> {
    Ok(match dest {
        Destination::Database(path) => Box::new(DatabaseSink::open(path)?),
        Destination::Spreadsheet(dir) => Box::new(SpreadsheetSink::open(dir, opts.commit_every)?),
        Destination::Topic(topic) => Box::new(BatchPublishSink::new(
            JsonLinesPublisher::stdout(),
            topic.clone(),
            opts.batch_size,
        )),
    })
}
