//! Delivery of push payloads to Loki
//!
//! A [`LokiTransport`] is either a real HTTP transport or a null transport that accepts
//! everything and sends nothing. The choice is made once when the endpoint is resolved.

pub mod client;
pub mod http;
#[cfg(test)]
pub(crate) mod testing;
mod tunnel;

use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::model::LokiEvent;

pub use client::{ClientSettings, LokiHttpClient, ProxyCredentials, ProxySettings, PushBody, PushResponse, UreqLokiClient};
pub use http::{HttpLokiTransport, PUSH_PATH};

/// Header carrying the tenant id
pub const TENANT_HEADER: &str = "X-Scope-OrgID";

/// Loki answered with a non-2xx status
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Failed pushing logs to Loki.")]
pub struct DeliveryError {
    pub status: u16,
    /// Standard reason phrase for `status`, not the text Loki put on its status line
    pub reason: Option<String>,
    pub body: Option<String>,
}

/// No response was obtained (connection refused, DNS failure, broken pipe...)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct TransportError {
    pub message: String,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<ureq::Error> for TransportError {
    fn from(err: ureq::Error) -> Self {
        Self::new(err.to_string())
    }
}

/// Everything a push can fail with
#[derive(Debug, Error)]
pub enum LokiError {
    #[error(transparent)]
    Delivery(#[from] DeliveryError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The caller stopped waiting. A request already handed to the connection is not
    /// aborted and may still be delivered; its outcome is only logged.
    #[error("Push to Loki was cancelled")]
    Cancelled,

    #[error("Failed to encode push payload: {0}")]
    Encode(#[from] std::io::Error),
}

impl LokiError {
    /// HTTP status, when Loki answered
    pub fn status(&self) -> Option<u16> {
        match self {
            LokiError::Delivery(err) => Some(err.status),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for LokiError {
    fn from(err: serde_json::Error) -> Self {
        LokiError::Encode(err.into())
    }
}

/// Transport selected for a target
pub enum LokiTransport {
    Http(HttpLokiTransport),
    /// Used when no usable endpoint is configured; every write succeeds without sending
    Null,
}

impl LokiTransport {
    pub async fn write_event(&self, event: LokiEvent, cancel: &CancellationToken) -> Result<(), LokiError> {
        match self {
            LokiTransport::Http(http) => http.write_event(event, cancel).await,
            LokiTransport::Null => Ok(()),
        }
    }

    pub async fn write_events<I>(&self, events: I, cancel: &CancellationToken) -> Result<(), LokiError>
    where
        I: IntoIterator<Item = LokiEvent>,
    {
        match self {
            LokiTransport::Http(http) => http.write_events(events, cancel).await,
            LokiTransport::Null => Ok(()),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, LokiTransport::Null)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            LokiTransport::Http(_) => "http",
            LokiTransport::Null => "null",
        }
    }
}
