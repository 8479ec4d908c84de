//! Grouping of events into Loki streams
//!
//! Streams come out in the order their label set was first seen. With `order_writes`
//! each stream's entries are sorted by timestamp; the sort is stable so entries sharing
//! a timestamp keep their input order.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;

use crate::model::{LabelSet, LokiEvent};

/// A single `(timestamp, line)` value within a stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub timestamp: DateTime<Utc>,
    pub line: String,
}

/// All entries sharing one label set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stream {
    pub labels: LabelSet,
    pub entries: Vec<Entry>,
}

impl Stream {
    /// One-entry stream for a lone event, skipping the grouping map
    pub fn single(event: LokiEvent) -> Self {
        Self {
            labels: event.labels,
            entries: vec![Entry {
                timestamp: event.timestamp,
                line: event.line,
            }],
        }
    }
}

/// Group events by label set, preserving first-seen stream order
pub fn group_streams<I>(events: I, order_writes: bool) -> Vec<Stream>
where
    I: IntoIterator<Item = LokiEvent>,
{
    let mut groups: IndexMap<LabelSet, Vec<Entry>> = IndexMap::new();

    for event in events {
        groups.entry(event.labels).or_default().push(Entry {
            timestamp: event.timestamp,
            line: event.line,
        });
    }

    groups
        .into_iter()
        .map(|(labels, mut entries)| {
            if order_writes {
                entries.sort_by_key(|entry| entry.timestamp);
            }
            Stream { labels, entries }
        })
        .collect()
}
