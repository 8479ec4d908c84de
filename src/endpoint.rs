//! Endpoint resolution
//!
//! Picks the HTTP transport for a usable `http`/`https` endpoint and falls back to the
//! null transport otherwise, so a bad endpoint never takes the host application down.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use url::Url;

use crate::config::LokiConfig;
use crate::transport::{ClientSettings, HttpLokiTransport, LokiTransport, ProxyCredentials, ProxySettings, TransportError, UreqLokiClient};

#[derive(Debug, Error)]
pub enum EndpointError {
    #[error("No Loki endpoint configured")]
    Missing,

    #[error("'{endpoint}' is not an absolute URI: {source}")]
    Invalid {
        endpoint: String,
        #[source]
        source: url::ParseError,
    },

    #[error("Unsupported scheme '{0}', expected http or https")]
    UnsupportedScheme(String),

    #[error("Cannot build HTTP client: {0}")]
    Client(#[from] TransportError),
}

/// Parse an endpoint as an absolute http(s) URI
pub fn parse_endpoint(endpoint: Option<&str>) -> Result<Url, EndpointError> {
    let endpoint = endpoint.map(str::trim).filter(|e| !e.is_empty()).ok_or(EndpointError::Missing)?;

    let url = Url::parse(endpoint).map_err(|source| EndpointError::Invalid {
        endpoint: endpoint.to_string(),
        source,
    })?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(EndpointError::UnsupportedScheme(other.to_string())),
    }
}

/// Connection settings for an already rendered config
pub fn client_settings(config: &LokiConfig, base: Url) -> ClientSettings {
    let proxy = config
        .proxy_url
        .as_deref()
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .and_then(|raw| match Url::parse(raw) {
            Ok(url) if url.scheme() == "http" => Some(url),
            Ok(url) => {
                log::warn!("Ignoring Loki proxy '{}': only http:// proxies are supported, not {}", raw, url.scheme());
                None
            }
            Err(e) => {
                log::warn!("Ignoring invalid Loki proxy URL '{}': {}", raw, e);
                None
            }
        })
        .map(|url| ProxySettings {
            url,
            credentials: ProxyCredentials::parse(config.proxy_user.as_deref(), config.proxy_password.as_deref()),
        });

    ClientSettings {
        base,
        tenant: config.tenant.clone(),
        username: config.username.clone(),
        password: config.password.clone(),
        proxy,
        timeout: Duration::from_secs(config.timeout_secs.max(1)),
    }
}

/// Build the HTTP transport, or report why it cannot be built
pub fn http_transport(config: &LokiConfig) -> Result<HttpLokiTransport, EndpointError> {
    let base = parse_endpoint(config.endpoint.as_deref())?;
    let client = UreqLokiClient::new(&client_settings(config, base))?;
    Ok(HttpLokiTransport::new(Arc::new(client), config.order_writes, config.compression))
}

/// Select the transport for a rendered config
pub fn resolve_transport(config: &LokiConfig) -> LokiTransport {
    match http_transport(config) {
        Ok(transport) => LokiTransport::Http(transport),
        Err(e) => {
            log::warn!(
                "Unable to create a valid Loki endpoint URI from '{}': {}",
                config.endpoint.as_deref().unwrap_or_default(),
                e
            );
            LokiTransport::Null
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(endpoint: Option<&str>) -> LokiConfig {
        LokiConfig {
            endpoint: endpoint.map(str::to_string),
            tenant: Some("1".to_string()),
            proxy_url: Some("http://myproxy.com".to_string()),
            proxy_user: Some("proxyDomain\\proxyUserA".to_string()),
            proxy_password: Some("proxyPasswordA".to_string()),
            ..LokiConfig::default()
        }
    }

    #[test]
    fn test_parse_http_and_https() {
        assert_eq!(parse_endpoint(Some("http://localhost:3100")).unwrap().host_str(), Some("localhost"));
        assert_eq!(parse_endpoint(Some("https://loki.lvh.me:3100/")).unwrap().port(), Some(3100));
    }

    #[test]
    fn test_parse_rejects_unusable_endpoints() {
        assert!(matches!(parse_endpoint(None), Err(EndpointError::Missing)));
        assert!(matches!(parse_endpoint(Some("")), Err(EndpointError::Missing)));
        assert!(matches!(parse_endpoint(Some("   ")), Err(EndpointError::Missing)));
        assert!(matches!(parse_endpoint(Some("loki:3100/push")), Err(EndpointError::UnsupportedScheme(_))));
        assert!(matches!(parse_endpoint(Some("/relative/path")), Err(EndpointError::Invalid { .. })));
        assert!(matches!(
            parse_endpoint(Some("udp://loki.lvh.me:3100/")),
            Err(EndpointError::UnsupportedScheme(s)) if s == "udp"
        ));
    }

    #[test]
    fn test_resolve_http_endpoint() {
        let transport = resolve_transport(&config(Some("https://loki.lvh.me:3100/")));
        assert_eq!(transport.kind(), "http");
    }

    #[test]
    fn test_resolve_falls_back_to_null() {
        assert!(resolve_transport(&config(Some("udp://loki.lvh.me:3100/"))).is_null());
        assert!(resolve_transport(&config(Some(""))).is_null());
        assert!(resolve_transport(&config(None)).is_null());
    }

    #[test]
    fn test_client_settings_carry_proxy_and_auth() {
        let mut cfg = config(Some("http://localhost:3100"));
        cfg.username = Some("user".to_string());
        cfg.password = Some("pass".to_string());
        let base = parse_endpoint(cfg.endpoint.as_deref()).unwrap();

        let settings = client_settings(&cfg, base);
        assert_eq!(settings.tenant.as_deref(), Some("1"));
        assert!(settings.basic_auth_header().is_some());

        let proxy = settings.proxy.unwrap();
        assert_eq!(proxy.url.host_str(), Some("myproxy.com"));
        let creds = proxy.credentials.unwrap();
        assert_eq!(creds.domain.as_deref(), Some("proxyDomain"));
        assert_eq!(creds.user, "proxyUserA");
    }

    #[test]
    fn test_invalid_proxy_is_ignored() {
        let mut cfg = config(Some("http://localhost:3100"));
        cfg.proxy_url = Some("not a url".to_string());
        let base = parse_endpoint(cfg.endpoint.as_deref()).unwrap();

        assert!(client_settings(&cfg, base).proxy.is_none());
        assert_eq!(resolve_transport(&cfg).kind(), "http");
    }

    #[test]
    fn test_non_http_proxy_is_ignored() {
        let mut cfg = config(Some("http://localhost:3100"));
        cfg.proxy_url = Some("https://myproxy.com".to_string());
        let base = parse_endpoint(cfg.endpoint.as_deref()).unwrap();

        assert!(client_settings(&cfg, base).proxy.is_none());
        assert_eq!(resolve_transport(&cfg).kind(), "http");
    }

    #[test]
    fn test_client_settings_timeout() {
        let mut cfg = config(Some("http://localhost:3100"));
        let base = parse_endpoint(cfg.endpoint.as_deref()).unwrap();
        assert_eq!(client_settings(&cfg, base.clone()).timeout, Duration::from_secs(30));

        cfg.timeout_secs = 0;
        assert_eq!(client_settings(&cfg, base).timeout, Duration::from_secs(1));
    }

    #[test]
    fn test_push_url_join() {
        for base in ["http://localhost:3100", "http://localhost:3100/"] {
            let url = parse_endpoint(Some(base)).unwrap().join(crate::transport::PUSH_PATH).unwrap();
            assert_eq!(url.as_str(), "http://localhost:3100/loki/api/v1/push");
        }
    }
}
