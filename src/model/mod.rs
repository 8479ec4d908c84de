//! Value types describing what gets pushed to Loki
//!
//! A [`LokiEvent`] carries the [`LabelSet`] identifying its stream, the instant it
//! was logged, and the rendered line.

pub mod event;
pub mod label;
pub mod labels;

pub use event::LokiEvent;
pub use label::{Label, LabelError};
pub use labels::LabelSet;
