//! Log records as handed over by the host

use chrono::{DateTime, Utc};
use indexmap::IndexMap;

/// A log record before it is rendered into a Loki event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    pub timestamp: DateTime<Utc>,
    pub level: log::Level,
    pub logger: String,
    pub message: String,
    pub exception: Option<String>,
    pub properties: IndexMap<String, String>,
}

impl LogRecord {
    pub fn new(level: log::Level, logger: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            level,
            logger: logger.into(),
            message: message.into(),
            exception: None,
            properties: IndexMap::new(),
        }
    }

    /// Record with no content, used to render connection settings
    pub fn empty() -> Self {
        Self {
            timestamp: DateTime::<Utc>::UNIX_EPOCH,
            level: log::Level::Trace,
            logger: String::new(),
            message: String::new(),
            exception: None,
            properties: IndexMap::new(),
        }
    }

    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn with_exception(mut self, exception: impl Into<String>) -> Self {
        self.exception = Some(exception.into());
        self
    }
}
