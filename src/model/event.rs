use chrono::{DateTime, Utc};

use super::labels::LabelSet;

/// One log line bound for Loki
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LokiEvent {
    pub labels: LabelSet,
    pub timestamp: DateTime<Utc>,
    pub line: String,
}

impl LokiEvent {
    pub fn new(labels: LabelSet, timestamp: DateTime<Utc>, line: impl Into<String>) -> Self {
        Self {
            labels,
            timestamp,
            line: line.into(),
        }
    }
}
