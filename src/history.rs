use std::fs::OpenOptions;
use std::io;
use std::path::{Path, PathBuf};

use chrono::Local;
use serde::{Deserialize, Serialize};

use crate::scoring::ListKey;
use crate::session::{GameSummary, TestKind};

/// One row of `history.csv`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub date: String,
    pub test: TestKind,
    pub mode: ListKey,
    pub completed: bool,
    pub best_level: u8,
    pub pause_ms: u64,
    pub weighted_score: f64,
}

impl From<&GameSummary> for HistoryRecord {
    fn from(summary: &GameSummary) -> Self {
        Self {
            date: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            test: summary.kind,
            mode: summary.list,
            completed: summary.completed,
            best_level: summary.best_level,
            pause_ms: summary.pause_ms,
            weighted_score: summary.weighted_score,
        }
    }
}

/// Append-only CSV log of every finished game
#[derive(Debug, Clone)]
pub struct HistoryLog {
    path: PathBuf,
}

impl HistoryLog {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, summary: &GameSummary) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        // If the log doesn't exist yet, we need to emit a header
        let needs_header = !self.path.exists();

        let file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(&self.path)?;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(needs_header)
            .from_writer(file);
        writer
            .serialize(HistoryRecord::from(summary))
            .map_err(io::Error::other)?;
        writer.flush()
    }

    pub fn records(&self) -> io::Result<Vec<HistoryRecord>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let mut reader = csv::Reader::from_path(&self.path).map_err(io::Error::other)?;
        reader
            .deserialize()
            .collect::<Result<Vec<HistoryRecord>, _>>()
            .map_err(io::Error::other)
    }
}
