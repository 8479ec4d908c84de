//! A single Loki label

use thiserror::Error;

/// Errors raised while building a label
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LabelError {
    #[error("Invalid label: {0}")]
    InvalidArgument(String),
}

/// An immutable key/value pair identifying part of a stream
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Label {
    key: String,
    value: String,
}

impl Label {
    /// Create a label. The key must not be empty; the value may be.
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Result<Self, LabelError> {
        let key = key.into();
        if key.is_empty() {
            return Err(LabelError::InvalidArgument("label key is absent".to_string()));
        }

        Ok(Self {
            key,
            value: value.into(),
        })
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn value(&self) -> &str {
        &self.value
    }
}
