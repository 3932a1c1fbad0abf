//! CSV export of batch results
//!
//! One row per submitted item, written in submission order. Simple I/O
//! wrapper over the ordered results collection; no coordination logic here.

use crate::output::OutputError;
use crate::{ItemOutcome, WorkItem};
use std::path::Path;

const HEADER: &[&str] = &[
    "index",
    "input",
    "status",
    "error_kind",
    "error",
    "channel_id",
    "title",
    "custom_url",
    "subscribers",
    "videos",
    "views",
    "published_at",
    "country",
    "from_cache",
];

/// CSV writer for batch results
pub struct CsvResultsWriter {
    writer: csv::Writer<std::fs::File>,
    rows_written: u64,
}

impl CsvResultsWriter {
    /// Create a writer at `path`, writing the header row immediately
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, OutputError> {
        let file = std::fs::File::create(path.as_ref())
            .map_err(|e| OutputError::IoError(e.to_string()))?;
        let mut writer = csv::Writer::from_writer(file);
        writer
            .write_record(HEADER)
            .map_err(|e| OutputError::CsvError(e.to_string()))?;
        Ok(Self {
            writer,
            rows_written: 0,
        })
    }

    /// Write one item's outcome
    pub fn write_row(&mut self, item: &WorkItem, outcome: &ItemOutcome) -> Result<(), OutputError> {
        let record: Vec<String> = match outcome {
            ItemOutcome::Success { info, from_cache } => vec![
                item.index.to_string(),
                item.identity.clone(),
                "ok".to_string(),
                String::new(),
                String::new(),
                info.channel_id.clone(),
                info.title.clone(),
                info.custom_url.clone().unwrap_or_default(),
                info.subscriber_count
                    .map(|n| n.to_string())
                    .unwrap_or_else(|| "hidden".to_string()),
                info.video_count.to_string(),
                info.view_count.to_string(),
                info.published_at.clone().unwrap_or_default(),
                info.country.clone().unwrap_or_default(),
                from_cache.to_string(),
            ],
            ItemOutcome::Error { kind, message } => vec![
                item.index.to_string(),
                item.identity.clone(),
                "error".to_string(),
                kind.to_string(),
                message.clone(),
                String::new(),
                String::new(),
                String::new(),
                String::new(),
                String::new(),
                String::new(),
                String::new(),
                String::new(),
                String::new(),
            ],
        };

        self.writer
            .write_record(&record)
            .map_err(|e| OutputError::CsvError(e.to_string()))?;
        self.rows_written += 1;
        Ok(())
    }

    /// Number of data rows written so far
    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }

    /// Flush and close the writer
    pub fn close(mut self) -> Result<(), OutputError> {
        self.writer
            .flush()
            .map_err(|e| OutputError::IoError(e.to_string()))
    }
}

/// Write a full batch to `path` in submission order
///
/// `items` and `outcomes` must be index-aligned, which `BatchDispatcher::run`
/// guarantees.
pub fn write_results<P: AsRef<Path>>(
    path: P,
    items: &[WorkItem],
    outcomes: &[ItemOutcome],
) -> Result<u64, OutputError> {
    let mut writer = CsvResultsWriter::new(path)?;
    for (item, outcome) in items.iter().zip(outcomes) {
        writer.write_row(item, outcome)?;
    }
    let rows = writer.rows_written();
    writer.close()?;
    Ok(rows)
}
