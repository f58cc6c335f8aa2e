// One CSV row per finished episode, columns in `EpisodeSummary` field order.
// Rows are buffered and flushed by `finish`, or on drop as a fallback.

use super::EpisodeSummary;
use anyhow::{Context, Result};
use csv::Writer;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::warn;

pub struct SummaryLogger {
    writer: Writer<File>,
    path: PathBuf,
    rows: usize,
}

impl SummaryLogger {
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let writer = Writer::from_path(&path).with_context(|| format!("creating {}", path.display()))?;
        Ok(Self { writer, path, rows: 0 })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn log(&mut self, summary: &EpisodeSummary) -> Result<()> {
        self.writer.serialize(summary)?;
        self.rows += 1;
        Ok(())
    }

    /// Summaries are written in episode order whatever order they arrive in.
    pub fn log_batch(&mut self, summaries: &[EpisodeSummary]) -> Result<()> {
        let mut ordered: Vec<&EpisodeSummary> = summaries.iter().collect();
        ordered.sort_by_key(|s| s.episode);
        for summary in ordered {
            self.log(summary)?;
        }
        Ok(())
    }

    /// Flushes and returns the number of rows written.
    pub fn finish(mut self) -> Result<usize> {
        self.writer.flush().with_context(|| format!("flushing {}", self.path.display()))?;
        Ok(self.rows)
    }
}

impl Drop for SummaryLogger {
    fn drop(&mut self) {
        if let Err(e) = self.writer.flush() {
            warn!("Could not flush {}: {}", self.path.display(), e);
        }
    }
}
