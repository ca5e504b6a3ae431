//! Type definitions for history entries and change notifications

use crate::agent::AnalysisResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One committed analysis, as persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Capture time in Unix milliseconds, strictly increasing within a store
    pub id: i64,
    /// Capture wall-clock time (RFC 3339, millisecond precision)
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub result: AnalysisResult,
}

/// Change delivered to subscribers after every mutating store call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryChange {
    /// A new entry was prepended
    Appended(LogEntry),
    /// The history was emptied
    Cleared,
}

/// Handle returned by `LogStore::subscribe`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub(crate) u64);
