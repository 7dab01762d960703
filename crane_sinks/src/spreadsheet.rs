//! File-backed workbook: a directory holding one CSV sheet per crane.
//!
//! A commit opens the sheet in append mode, writes the header if the sheet
//! is new, appends the staged rows, fsyncs and closes it again. With
//! `commit_every = 1` every record is durable before `persist` returns.
use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use crane_traits::{FailurePolicy, Record, Sink, SinkError};

use crate::error::Result;

pub const HEADER: [&str; 5] = ["Time", "Raw ADC", "Mass", "X Position", "Y Position"];

pub fn sheet_name(crane_id: u32) -> String {
    format!("Crane {crane_id}.csv")
}

#[derive(Debug)]
pub struct SpreadsheetSink {
    dir: PathBuf,
    commit_every: usize,
    staged: BTreeMap<u32, Vec<[String; 5]>>,
    staged_rows: usize,
}

impl SpreadsheetSink {
    pub fn open(dir: impl AsRef<Path>, commit_every: usize) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;
        tracing::info!(dir = %dir.display(), commit_every, "workbook opened");
        Ok(Self {
            dir,
            commit_every: commit_every.max(1),
            staged: BTreeMap::new(),
            staged_rows: 0,
        })
    }

    pub fn sheet_path(&self, crane_id: u32) -> PathBuf {
        self.dir.join(sheet_name(crane_id))
    }

    /// Rows waiting for the next commit.
    pub fn staged(&self) -> usize {
        self.staged_rows
    }

    fn row(record: &Record) -> [String; 5] {
        [
            record.iso_time(),
            record.raw_adc.to_string(),
            record.instant_mass.to_string(),
            record.x.to_string(),
            record.y.to_string(),
        ]
    }

    /// Write every staged row to its sheet.
    pub fn commit(&mut self) -> Result<()> {
        let staged = std::mem::take(&mut self.staged);
        self.staged_rows = 0;
        for (crane_id, rows) in staged {
            let path = self.sheet_path(crane_id);
            let file = OpenOptions::new().create(true).append(true).open(&path)?;
            let is_new = file.metadata()?.len() == 0;
            let mut w = csv::WriterBuilder::new()
                .has_headers(false)
                .from_writer(file);
            if is_new {
                w.write_record(HEADER)?;
            }
            for row in &rows {
                w.write_record(row)?;
            }
            let file = w.into_inner().map_err(|e| e.into_error())?;
            file.sync_all()?;
            tracing::trace!(sheet = %path.display(), rows = rows.len(), "sheet committed");
        }
        Ok(())
    }
}

impl Sink for SpreadsheetSink {
    fn persist(&mut self, record: &Record) -> std::result::Result<(), SinkError> {
        self.staged
            .entry(record.crane_id)
            .or_default()
            .push(Self::row(record));
        self.staged_rows += 1;
        if self.staged_rows >= self.commit_every {
            self.commit()?;
        }
        Ok(())
    }

    fn close(&mut self) -> std::result::Result<(), SinkError> {
        if self.staged_rows > 0 {
            self.commit()?;
        }
        Ok(())
    }

    fn failure_policy(&self) -> FailurePolicy {
        FailurePolicy::Fatal
    }

    fn name(&self) -> &'static str {
        "spreadsheet"
    }
}
