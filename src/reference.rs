//! Tabular stores: the per-scenario reference file and the baseline run log.
//!
//! The reference file holds one row per conversational turn (`user,
//! assistant`, later enriched with `mean, stdDev, threshold, iterations`
//! by calibration). The run log accumulates `id, result` similarity scores
//! across baseline repetitions: header written once, rows appended.

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
}

/// One reference row. Statistics columns are absent until calibration.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ReferenceRecord {
    pub user: String,
    pub assistant: String,
    #[serde(default)]
    pub mean: Option<f64>,
    #[serde(default, rename = "stdDev")]
    pub std_dev: Option<f64>,
    #[serde(default)]
    pub threshold: Option<f64>,
    #[serde(default)]
    pub iterations: Option<u32>,
}

/// A reference row enriched by calibration. Serialized with the full
/// six-column header on rewrite.
#[derive(Debug, Clone, Serialize)]
pub struct CalibratedRecord {
    pub user: String,
    pub assistant: String,
    pub mean: f64,
    #[serde(rename = "stdDev")]
    pub std_dev: f64,
    pub threshold: f64,
    pub iterations: u32,
}

/// One similarity score for one turn in one baseline run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct RunScore {
    /// Turn ordinal within the scenario (cursor position).
    pub id: u32,
    /// Similarity score for that turn.
    pub result: f64,
}

// =============================================================================
// REFERENCE STORE
// =============================================================================

/// CSV-backed reference store for one scenario.
#[derive(Debug, Clone)]
pub struct ReferenceStore {
    path: PathBuf,
}

impl ReferenceStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write a header-only file if none exists. Idempotent.
    pub fn create_if_missing(&self) -> Result<(), StoreError> {
        if self.path.exists() {
            return Ok(());
        }
        let mut writer = csv::Writer::from_path(&self.path)?;
        writer.write_record(["user", "assistant"])?;
        writer.flush()?;
        Ok(())
    }

    /// Load all records into memory.
    pub fn load(&self) -> Result<Vec<ReferenceRecord>, StoreError> {
        let mut reader = csv::Reader::from_path(&self.path)?;
        let mut records = Vec::new();
        for row in reader.deserialize() {
            records.push(row?);
        }
        Ok(records)
    }

    /// Append one text-only row, writing the header first when the file is
    /// missing or empty. Newlines are flattened so each turn stays on one
    /// CSV row.
    pub fn append_text_row(&self, user: &str, assistant: &str) -> Result<(), StoreError> {
        let needs_header = match fs::metadata(&self.path) {
            Ok(meta) => meta.len() == 0,
            Err(_) => true,
        };

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);

        if needs_header {
            writer.write_record(["user", "assistant"])?;
        }
        writer.write_record([flatten(user), flatten(assistant)])?;
        writer.flush()?;
        Ok(())
    }

    /// Fully overwrite the file with calibrated records, order preserved.
    pub fn rewrite_calibrated(&self, records: &[CalibratedRecord]) -> Result<(), StoreError> {
        let mut writer = csv::Writer::from_path(&self.path)?;
        if records.is_empty() {
            writer.write_record([
                "user",
                "assistant",
                "mean",
                "stdDev",
                "threshold",
                "iterations",
            ])?;
        }
        for record in records {
            writer.serialize(record)?;
        }
        writer.flush()?;
        Ok(())
    }
}

fn flatten(text: &str) -> String {
    text.replace('\n', " ")
}

// =============================================================================
// RUN LOG
// =============================================================================

/// Append-only per-scenario score log used during baseline runs.
#[derive(Debug, Clone)]
pub struct RunLog {
    path: PathBuf,
}

impl RunLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Derive the run-log path for a reference file:
    /// `<output_dir>/<reference stem>-baseline.csv`.
    pub fn for_reference(reference_path: &Path, output_dir: &Path) -> Self {
        let stem = reference_path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("scenario");
        Self::new(output_dir.join(format!("{stem}-baseline.csv")))
    }

    /// Reference file name this run log belongs to, if the log follows the
    /// `<stem>-baseline.csv` convention.
    pub fn reference_file_name(&self) -> Option<String> {
        self.path
            .file_name()?
            .to_str()?
            .strip_suffix("-baseline.csv")
            .map(|stem| format!("{stem}.csv"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one score row; the header goes in with the first row only.
    pub fn append(&self, score: RunScore) -> Result<(), StoreError> {
        let needs_header = match fs::metadata(&self.path) {
            Ok(meta) => meta.len() == 0,
            Err(_) => true,
        };

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(needs_header)
            .from_writer(file);
        writer.serialize(score)?;
        writer.flush()?;
        Ok(())
    }

    /// Load all accumulated scores.
    pub fn load(&self) -> Result<Vec<RunScore>, StoreError> {
        let mut reader = csv::Reader::from_path(&self.path)?;
        let mut scores = Vec::new();
        for row in reader.deserialize() {
            scores.push(row?);
        }
        Ok(scores)
    }
}
