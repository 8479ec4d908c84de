//! # lokiship
//!
//! Ships structured log records to Grafana Loki's push API.
//!
//! Events are grouped into streams by label set, optionally ordered by timestamp,
//! rendered as Loki push JSON with nanosecond timestamps, optionally gzipped, and POSTed
//! to `<endpoint>/loki/api/v1/push`.
//!
//! ```rust,ignore
//! use lokiship::{LokiConfig, LokiTarget, LogRecord};
//! use tokio_util::sync::CancellationToken;
//!
//! let config = LokiConfig {
//!     endpoint: Some("http://localhost:3100".to_string()),
//!     ..LokiConfig::default()
//! };
//! let target = LokiTarget::new(config)?;
//! let record = LogRecord::new(log::Level::Info, "app", "hello");
//! target.write(&record, &CancellationToken::new()).await?;
//! ```

pub mod compression;
pub mod config;
pub mod endpoint;
pub mod layout;
pub mod model;
pub mod payload;
pub mod record;
pub mod stream;
pub mod target;
pub mod transport;

pub use compression::CompressionLevel;
pub use config::{Config, LokiConfig, TargetLabel};
pub use endpoint::{EndpointError, resolve_transport};
pub use layout::{Layout, LayoutError};
pub use model::{Label, LabelError, LabelSet, LokiEvent};
pub use record::LogRecord;
pub use target::LokiTarget;
pub use transport::{DeliveryError, LokiError, LokiTransport, TransportError};
