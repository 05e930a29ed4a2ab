//! Bulk commit results and per-item failures
//!
//! Bulk commit is best-effort: a failing item is recorded here and the
//! remaining items still run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One item that could not be committed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportFailure {
    /// Singer name from the source row
    pub singer_name: String,

    /// Song name from the source row (empty for singer-level failures)
    pub song_name: String,

    /// Human-readable error message
    pub message: String,

    /// When the failure occurred
    pub occurred_at: DateTime<Utc>,
}

impl ImportFailure {
    pub fn new(singer_name: String, song_name: String, message: String) -> Self {
        Self {
            singer_name,
            song_name,
            message,
            occurred_at: Utc::now(),
        }
    }
}

/// Bulk commit completion summary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportSummary {
    /// Singers created by this import (existing ones are not counted)
    pub singers_created: usize,

    /// Pitch records newly created
    pub pitches_created: usize,

    /// Pitch records whose value changed
    pub pitches_updated: usize,

    /// Pitch records already holding the same value
    pub pitches_unchanged: usize,

    /// Failures, in the order they occurred
    pub failures: Vec<ImportFailure>,

    /// When the commit started
    pub started_at: DateTime<Utc>,

    /// Wall-clock duration in milliseconds
    pub duration_ms: u64,
}

impl ImportSummary {
    /// Create new empty summary starting now
    pub fn new() -> Self {
        Self {
            singers_created: 0,
            pitches_created: 0,
            pitches_updated: 0,
            pitches_unchanged: 0,
            failures: Vec::new(),
            started_at: Utc::now(),
            duration_ms: 0,
        }
    }

    /// Record a failure
    pub fn record_failure(&mut self, singer_name: &str, song_name: &str, message: impl Into<String>) {
        self.failures.push(ImportFailure::new(
            singer_name.to_string(),
            song_name.to_string(),
            message.into(),
        ));
    }

    /// Number of pitch submissions that succeeded (including no-ops)
    pub fn succeeded(&self) -> usize {
        self.pitches_created + self.pitches_updated + self.pitches_unchanged
    }

    /// Number of failures
    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    /// Stamp the duration from `started_at` to now
    pub fn finish(&mut self) {
        let elapsed = Utc::now() - self.started_at;
        self.duration_ms = elapsed.num_milliseconds().max(0) as u64;
    }
}

impl Default for ImportSummary {
    fn default() -> Self {
        Self::new()
    }
}
