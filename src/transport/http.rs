//! Loki push over HTTP
//!
//! See <https://grafana.com/docs/loki/latest/reference/loki-http-api/#ingest-logs>

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use super::client::{LokiHttpClient, PushBody, PushResponse};
use super::{DeliveryError, LokiError, TransportError};
use crate::compression::{CompressionLevel, PayloadWriter};
use crate::model::LokiEvent;
use crate::payload::{CONTENT_TYPE, PushPayload};
use crate::stream::{Stream, group_streams};

/// Push path, relative to the configured endpoint
pub const PUSH_PATH: &str = "loki/api/v1/push";

pub struct HttpLokiTransport {
    client: Arc<dyn LokiHttpClient>,
    order_writes: bool,
    compression: CompressionLevel,
}

impl HttpLokiTransport {
    pub fn new(client: Arc<dyn LokiHttpClient>, order_writes: bool, compression: CompressionLevel) -> Self {
        Self {
            client,
            order_writes,
            compression,
        }
    }

    pub async fn write_event(&self, event: LokiEvent, cancel: &CancellationToken) -> Result<(), LokiError> {
        let body = self.create_body(&[Stream::single(event)])?;
        self.push(body, cancel).await
    }

    pub async fn write_events<I>(&self, events: I, cancel: &CancellationToken) -> Result<(), LokiError>
    where
        I: IntoIterator<Item = LokiEvent>,
    {
        let streams = group_streams(events, self.order_writes);
        if streams.is_empty() {
            return Ok(());
        }
        let body = self.create_body(&streams)?;
        self.push(body, cancel).await
    }

    /// Serialize streams into a request body, gzipping on the fly if enabled
    pub fn create_body(&self, streams: &[Stream]) -> Result<PushBody, LokiError> {
        let mut writer = PayloadWriter::new(self.compression);
        PushPayload::new(streams).write_to(&mut writer)?;

        Ok(PushBody {
            bytes: writer.finish()?,
            content_type: CONTENT_TYPE,
            content_encoding: self.compression.content_encoding(),
        })
    }

    async fn push(&self, body: PushBody, cancel: &CancellationToken) -> Result<(), LokiError> {
        log::debug!(
            "Pushing {} bytes to Loki (encoding: {})",
            body.bytes.len(),
            body.content_encoding.unwrap_or("identity")
        );

        if cancel.is_cancelled() {
            return Err(LokiError::Cancelled);
        }

        let client = Arc::clone(&self.client);
        let mut call = tokio::task::spawn_blocking(move || client.post(PUSH_PATH, body));

        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                // A blocking request cannot be interrupted; it ends on its own or at the timeout
                tokio::spawn(async move { log_late_outcome(call.await) });
                return Err(LokiError::Cancelled);
            }
            joined = &mut call => joined.map_err(|e| TransportError::new(format!("Push task failed: {}", e)))??,
        };

        check_response(response)
    }
}

fn log_late_outcome(joined: Result<Result<PushResponse, TransportError>, tokio::task::JoinError>) {
    match joined {
        Ok(Ok(response)) if response.is_success() => {
            log::warn!("Cancelled push was delivered to Loki anyway (status {})", response.status)
        }
        Ok(Ok(response)) => log::debug!("Cancelled push was rejected by Loki (status {})", response.status),
        Ok(Err(e)) => log::debug!("Cancelled push failed: {}", e),
        Err(e) => log::debug!("Cancelled push task failed: {}", e),
    }
}

fn check_response(response: PushResponse) -> Result<(), LokiError> {
    if response.is_success() {
        return Ok(());
    }

    log::error!(
        "Failed pushing logs to Loki. Code: {}. Reason: {}. Message: {}.",
        response.status,
        response.reason.as_deref().unwrap_or_default(),
        response.body.as_deref().unwrap_or_default()
    );

    Err(DeliveryError {
        status: response.status,
        reason: response.reason,
        body: response.body,
    }
    .into())
}
