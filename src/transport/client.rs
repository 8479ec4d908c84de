//! HTTP client seam
//!
//! [`LokiHttpClient`] is the request/response contract the transport depends on.
//! [`UreqLokiClient`] implements it with a single `ureq::Agent` built once from
//! [`ClientSettings`]; auth, tenant, proxy and timeout never change after construction.

use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use ureq::unversioned::resolver::DefaultResolver;
use ureq::unversioned::transport::{Connector, RustlsConnector, TcpConnector};
use url::Url;

use super::tunnel::ProxyTunnel;
use super::{TENANT_HEADER, TransportError};

/// Encoded request body plus the headers describing it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushBody {
    pub bytes: Vec<u8>,
    pub content_type: &'static str,
    pub content_encoding: Option<&'static str>,
}

/// What came back from Loki
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushResponse {
    pub status: u16,
    /// Standard reason phrase for `status`; the phrase on the server's status line is not kept
    pub reason: Option<String>,
    pub body: Option<String>,
}

impl PushResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// POSTs a body to a path relative to the configured base endpoint
pub trait LokiHttpClient: Send + Sync {
    fn post(&self, path: &str, body: PushBody) -> Result<PushResponse, TransportError>;
}

/// Proxy credentials, optionally qualified with a `domain\user` prefix
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyCredentials {
    pub domain: Option<String>,
    pub user: String,
    pub password: String,
}

impl ProxyCredentials {
    /// Returns `None` when no user is given (the proxy is used without credentials)
    pub fn parse(user: Option<&str>, password: Option<&str>) -> Option<Self> {
        let user = user.filter(|u| !u.trim().is_empty())?;
        let password = password.unwrap_or_default().to_string();

        Some(match user.split_once('\\') {
            Some((domain, user)) => Self {
                domain: Some(domain.to_string()),
                user: user.to_string(),
                password,
            },
            None => Self {
                domain: None,
                user: user.to_string(),
                password,
            },
        })
    }

    /// User name as presented to the proxy
    pub fn qualified_user(&self) -> String {
        match &self.domain {
            Some(domain) => format!("{}\\{}", domain, self.user),
            None => self.user.clone(),
        }
    }
}

/// Plain `http://` proxy reached with CONNECT
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxySettings {
    pub url: Url,
    pub credentials: Option<ProxyCredentials>,
}

/// Connection configuration for a Loki endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSettings {
    pub base: Url,
    pub tenant: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub proxy: Option<ProxySettings>,
    /// Whole-request timeout, from connecting to reading the response body
    pub timeout: Duration,
}

impl ClientSettings {
    pub fn new(base: Url) -> Self {
        Self {
            base,
            tenant: None,
            username: None,
            password: None,
            proxy: None,
            timeout: Duration::from_secs(crate::config::DEFAULT_TIMEOUT_SECS),
        }
    }

    /// `Authorization` value; only set when both user and password are present
    pub fn basic_auth_header(&self) -> Option<String> {
        let username = self.username.as_deref().filter(|u| !u.is_empty())?;
        let password = self.password.as_deref().filter(|p| !p.is_empty())?;
        Some(format!("Basic {}", STANDARD.encode(format!("{}:{}", username, password))))
    }

    /// Tenant header value, if a tenant is configured
    pub fn tenant_header(&self) -> Option<&str> {
        self.tenant.as_deref().filter(|t| !t.is_empty())
    }

    /// Headers sent with every request
    pub fn default_headers(&self) -> Vec<(&'static str, String)> {
        let mut headers = Vec::new();
        if let Some(auth) = self.basic_auth_header() {
            headers.push(("Authorization", auth));
        }
        if let Some(tenant) = self.tenant_header() {
            headers.push((TENANT_HEADER, tenant.to_string()));
        }
        headers
    }

    /// Proxy address handed to ureq. Credentials travel in the tunnel's own
    /// `Proxy-Authorization` header, never in the URI.
    fn proxy_uri(&self) -> Result<Option<String>, TransportError> {
        let Some(proxy) = &self.proxy else {
            return Ok(None);
        };
        if proxy.url.scheme() != "http" {
            return Err(TransportError::new(format!(
                "Unsupported proxy scheme '{}', expected http",
                proxy.url.scheme()
            )));
        }

        let mut url = proxy.url.clone();
        url.set_username("")
            .and_then(|_| url.set_password(None))
            .map_err(|_| TransportError::new(format!("Cannot use proxy URL {}", proxy.url)))?;
        Ok(Some(url.to_string()))
    }
}

/// `LokiHttpClient` backed by ureq
pub struct UreqLokiClient {
    agent: ureq::Agent,
    base: Url,
    headers: Vec<(&'static str, String)>,
}

impl UreqLokiClient {
    pub fn new(settings: &ClientSettings) -> Result<Self, TransportError> {
        let proxy = match settings.proxy_uri()? {
            Some(uri) => Some(ureq::Proxy::new(&uri)?),
            None => None,
        };

        // Statuses are classified by the transport, not turned into errors here.
        // An explicit `None` proxy also keeps ureq from picking one up from the environment.
        let config = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(settings.timeout))
            .proxy(proxy)
            .build();

        let credentials = settings.proxy.as_ref().and_then(|p| p.credentials.as_ref());
        let connector = ()
            .chain(ProxyTunnel::new(credentials, settings.timeout))
            .chain(TcpConnector::default())
            .chain(RustlsConnector::default());

        Ok(Self {
            agent: ureq::Agent::with_parts(config, connector, DefaultResolver::default()),
            base: settings.base.clone(),
            headers: settings.default_headers(),
        })
    }

    pub fn base(&self) -> &Url {
        &self.base
    }
}

impl LokiHttpClient for UreqLokiClient {
    fn post(&self, path: &str, body: PushBody) -> Result<PushResponse, TransportError> {
        let url = self
            .base
            .join(path)
            .map_err(|e| TransportError::new(format!("Invalid push URL: {}", e)))?;

        let mut request = self.agent.post(url.as_str()).header("Content-Type", body.content_type);
        if let Some(encoding) = body.content_encoding {
            request = request.header("Content-Encoding", encoding);
        }
        for (name, value) in &self.headers {
            request = request.header(*name, value.as_str());
        }

        let mut response = request.send(&body.bytes[..])?;
        let status = response.status();

        let body = if status.is_success() {
            None
        } else {
            match response.body_mut().read_to_string() {
                Ok(text) if !text.is_empty() => Some(text),
                Ok(_) => None,
                Err(e) => {
                    log::debug!("Could not read Loki error response body: {}", e);
                    None
                }
            }
        };

        Ok(PushResponse {
            status: status.as_u16(),
            reason: status.canonical_reason().map(str::to_string),
            body,
        })
    }
}
