//! Outcome of one reconciliation run.

use super::RangeMode;
use chrono::{DateTime, Utc};
use std::fmt;

/// An input line that was dropped instead of producing a [`Record`](super::Record).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedLine {
    /// 1-based line number in the input file.
    pub line: usize,
    pub reason: String,
}

impl fmt::Display for SkippedLine {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "line {}: {}", self.line, self.reason)
    }
}

/// Summary of what a run did to the directory.
///
/// Each list keeps the order in which the operations were performed.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub created: Vec<String>,
    pub updated: Vec<String>,
    pub unchanged: Vec<String>,
    pub deleted: Vec<String>,
    /// File records left alone because of the manual prefix.
    pub excluded: Vec<String>,
    pub skipped: Vec<SkippedLine>,
    /// How the input expressed range ends, once it has been parsed.
    pub mode: Option<RangeMode>,
    pub started: DateTime<Utc>,
    pub finished: Option<DateTime<Utc>>,
}

impl Default for RunReport {
    fn default() -> Self {
        RunReport {
            created: vec![],
            updated: vec![],
            unchanged: vec![],
            deleted: vec![],
            excluded: vec![],
            skipped: vec![],
            mode: None,
            started: Utc::now(),
            finished: None,
        }
    }
}

impl RunReport {
    /// True when the run wrote nothing to the directory.
    pub fn is_noop(&self) -> bool {
        self.created.is_empty() && self.updated.is_empty() && self.deleted.is_empty()
    }

    pub fn write_count(&self) -> usize {
        self.created.len() + self.updated.len() + self.deleted.len()
    }

    pub fn finish(&mut self) {
        self.finished = Some(Utc::now());
    }

    /// Wall-clock duration, once the run has finished.
    pub fn elapsed(&self) -> Option<chrono::Duration> {
        self.finished.map(|f| f - self.started)
    }
}
