//! Loki log target
//!
//! The entry point a host hands its records to. Labels and the line are rendered from
//! layouts; the transport is resolved on first use and shared by every later write.

use once_cell::sync::OnceCell;
use tokio_util::sync::CancellationToken;

use crate::config::LokiConfig;
use crate::endpoint::resolve_transport;
use crate::layout::{Layout, LayoutError};
use crate::model::{Label, LabelSet, LokiEvent};
use crate::record::LogRecord;
use crate::transport::{LokiError, LokiTransport};

pub struct LokiTarget {
    config: LokiConfig,
    labels: Vec<(String, Layout)>,
    layout: Layout,
    transport: OnceCell<LokiTransport>,
}

impl LokiTarget {
    /// Parse the configured layouts. The transport is not created yet.
    pub fn new(config: LokiConfig) -> Result<Self, LayoutError> {
        let labels = config
            .labels
            .iter()
            .map(|label| Ok((label.name.clone(), label.layout.parse::<Layout>()?)))
            .collect::<Result<Vec<_>, LayoutError>>()?;
        let layout: Layout = config.layout.parse()?;

        Ok(Self {
            config,
            labels,
            layout,
            transport: OnceCell::new(),
        })
    }

    /// Use an already built transport instead of resolving one from the endpoint
    pub fn with_transport(config: LokiConfig, transport: LokiTransport) -> Result<Self, LayoutError> {
        let target = Self::new(config)?;
        let _ = target.transport.set(transport);
        Ok(target)
    }

    pub fn config(&self) -> &LokiConfig {
        &self.config
    }

    /// The shared transport, created exactly once even under concurrent first use
    pub fn transport(&self) -> &LokiTransport {
        self.transport.get_or_init(|| resolve_transport(&self.rendered_config()))
    }

    /// Connection settings with their layouts rendered against an empty record
    pub fn rendered_config(&self) -> LokiConfig {
        let empty = LogRecord::empty();
        let render = |value: &Option<String>| -> Option<String> {
            let raw = value.as_deref()?;
            match raw.parse::<Layout>() {
                Ok(layout) => Some(layout.render(&empty)),
                Err(e) => {
                    log::warn!("Cannot render Loki setting '{}': {}", raw, e);
                    None
                }
            }
        };

        LokiConfig {
            endpoint: render(&self.config.endpoint),
            tenant: render(&self.config.tenant),
            username: render(&self.config.username),
            password: render(&self.config.password),
            proxy_url: render(&self.config.proxy_url),
            proxy_user: render(&self.config.proxy_user),
            proxy_password: render(&self.config.proxy_password),
            ..self.config.clone()
        }
    }

    pub fn loki_event(&self, record: &LogRecord) -> LokiEvent {
        LokiEvent::new(self.render_labels(record), record.timestamp, self.layout.render(record))
    }

    fn render_labels(&self, record: &LogRecord) -> LabelSet {
        let with_properties = self.config.event_properties_as_labels && !record.properties.is_empty();
        if self.labels.is_empty() && !with_properties {
            return LabelSet::empty();
        }

        let mut labels = Vec::with_capacity(self.labels.len() + record.properties.len());
        for (name, layout) in &self.labels {
            push_label(&mut labels, name, layout.render(record));
        }
        if with_properties {
            for (key, value) in &record.properties {
                push_label(&mut labels, key, value.clone());
            }
        }

        LabelSet::new(labels)
    }

    pub async fn write(&self, record: &LogRecord, cancel: &CancellationToken) -> Result<(), LokiError> {
        let event = self.loki_event(record);
        self.transport().write_event(event, cancel).await
    }

    pub async fn write_batch(&self, records: &[LogRecord], cancel: &CancellationToken) -> Result<(), LokiError> {
        match records {
            [] => Ok(()),
            [record] => self.write(record, cancel).await,
            _ => {
                let events = records.iter().map(|record| self.loki_event(record));
                self.transport().write_events(events, cancel).await
            }
        }
    }
}

fn push_label(labels: &mut Vec<Label>, name: &str, value: String) {
    match Label::new(name, value) {
        Ok(label) => labels.push(label),
        Err(e) => log::warn!("Skipping Loki label: {}", e),
    }
}
