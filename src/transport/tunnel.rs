//! CONNECT tunnel through an HTTP proxy
//!
//! ureq reads proxy credentials from the proxy URI's userinfo, where a `domain\user` name or a
//! password with reserved characters can only appear percent-encoded, and it forwards them
//! without decoding. [`ProxyTunnel`] opens the tunnel itself so `Proxy-Authorization` carries
//! the configured user and password as given. It sits first in the agent's connector chain
//! and yields to the plain TCP connector when no proxy is configured.

use std::fmt;
use std::io::{self, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use ureq::unversioned::transport::{Buffers, ConnectionDetails, Connector, LazyBuffers, NextTimeout, Transport};
use ureq::{Error, ProxyProtocol};

use super::client::ProxyCredentials;

/// Upper bound on the proxy's answer to CONNECT
const MAX_RESPONSE_HEAD: usize = 8 * 1024;

pub(crate) struct ProxyTunnel {
    authorization: Option<String>,
    timeout: Duration,
}

impl ProxyTunnel {
    pub(crate) fn new(credentials: Option<&ProxyCredentials>, timeout: Duration) -> Self {
        Self {
            authorization: credentials.map(proxy_authorization),
            timeout,
        }
    }
}

/// `Proxy-Authorization` value for the credentials, exactly as configured
pub(crate) fn proxy_authorization(credentials: &ProxyCredentials) -> String {
    let pair = format!("{}:{}", credentials.qualified_user(), credentials.password);
    format!("Basic {}", STANDARD.encode(pair))
}

impl fmt::Debug for ProxyTunnel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyTunnel")
            .field("authorization", &self.authorization.as_ref().map(|_| "********"))
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl Connector<()> for ProxyTunnel {
    type Out = TunnelTransport;

    fn connect(&self, details: &ConnectionDetails, _chained: Option<()>) -> Result<Option<Self::Out>, Error> {
        let Some(proxy) = details.config.proxy() else {
            return Ok(None);
        };
        if !matches!(proxy.protocol(), ProxyProtocol::Http) || proxy.is_no_proxy(details.uri) {
            return Ok(None);
        }

        let host = details
            .uri
            .host()
            .ok_or_else(|| Error::ConnectProxyFailed(format!("no host in {}", details.uri)))?;
        let port = details
            .uri
            .port_u16()
            .unwrap_or(if details.needs_tls() { 443 } else { 80 });

        // What remains of the request's global timeout, else the configured one
        let timeout = details.timeout.not_zero().map(|t| *t).unwrap_or(self.timeout);
        let mut stream = connect_any(proxy.host(), proxy.port(), timeout)?;
        stream.set_read_timeout(Some(timeout))?;
        stream.set_write_timeout(Some(timeout))?;

        let mut request = format!("CONNECT {host}:{port} HTTP/1.1\r\nHost: {host}:{port}\r\n");
        if let Some(authorization) = &self.authorization {
            request.push_str(&format!("Proxy-Authorization: {}\r\n", authorization));
        }
        request.push_str("\r\n");
        stream.write_all(request.as_bytes())?;
        stream.flush()?;

        let head = read_response_head(&mut stream)?;
        match parse_status(&head) {
            Some(200) => log::debug!("Tunnel to {}:{} open via proxy {}", host, port, proxy.host()),
            Some(status) => {
                return Err(Error::ConnectProxyFailed(format!("proxy answered {}", status)));
            }
            None => return Err(Error::ConnectProxyFailed("malformed proxy response".to_string())),
        }

        stream.set_read_timeout(None)?;
        stream.set_write_timeout(None)?;

        let buffers = LazyBuffers::new(details.config.input_buffer_size(), details.config.output_buffer_size());
        Ok(Some(TunnelTransport {
            stream,
            buffers,
            timeout_read: None,
            timeout_write: None,
        }))
    }
}

fn connect_any(host: &str, port: u16, timeout: Duration) -> io::Result<TcpStream> {
    let mut last = None;
    for addr in (host, port).to_socket_addrs()? {
        match TcpStream::connect_timeout(&addr, timeout) {
            Ok(stream) => return Ok(stream),
            Err(e) => last = Some(e),
        }
    }
    Err(last.unwrap_or_else(|| io::Error::new(io::ErrorKind::NotFound, format!("no address for proxy {}", host))))
}

/// Read up to and including the blank line; nothing past it is consumed
fn read_response_head(stream: &mut TcpStream) -> io::Result<Vec<u8>> {
    let mut head = Vec::with_capacity(256);
    let mut byte = [0u8; 1];
    while !head.ends_with(b"\r\n\r\n") {
        if head.len() >= MAX_RESPONSE_HEAD {
            return Err(io::Error::new(io::ErrorKind::InvalidData, "proxy response head too large"));
        }
        if stream.read(&mut byte)? == 0 {
            return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "proxy closed the connection"));
        }
        head.push(byte[0]);
    }
    Ok(head)
}

fn parse_status(head: &[u8]) -> Option<u16> {
    let line = std::str::from_utf8(head).ok()?.lines().next()?;
    let mut parts = line.split_whitespace();
    if !parts.next()?.starts_with("HTTP/") {
        return None;
    }
    parts.next()?.parse().ok()
}

/// Socket carrying the tunnelled connection
pub(crate) struct TunnelTransport {
    stream: TcpStream,
    buffers: LazyBuffers,
    timeout_read: Option<Duration>,
    timeout_write: Option<Duration>,
}

fn timeout_error(e: io::Error, timeout: NextTimeout) -> Error {
    match e.kind() {
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => Error::Timeout(timeout.reason),
        _ => e.into(),
    }
}

impl Transport for TunnelTransport {
    fn buffers(&mut self) -> &mut dyn Buffers {
        &mut self.buffers
    }

    fn transmit_output(&mut self, amount: usize, timeout: NextTimeout) -> Result<(), Error> {
        let wanted = timeout.not_zero().map(|t| *t);
        if wanted != self.timeout_write {
            self.stream.set_write_timeout(wanted)?;
            self.timeout_write = wanted;
        }

        let output = &self.buffers.output()[..amount];
        self.stream.write_all(output).map_err(|e| timeout_error(e, timeout))
    }

    fn await_input(&mut self, timeout: NextTimeout) -> Result<bool, Error> {
        let wanted = timeout.not_zero().map(|t| *t);
        if wanted != self.timeout_read {
            self.stream.set_read_timeout(wanted)?;
            self.timeout_read = wanted;
        }

        let input = self.buffers.input_append_buf();
        let amount = self.stream.read(input).map_err(|e| timeout_error(e, timeout))?;
        self.buffers.input_appended(amount);

        Ok(amount > 0)
    }

    fn is_open(&mut self) -> bool {
        still_open(&mut self.stream).unwrap_or(false)
    }
}

/// A pooled socket is reusable only if the peer has sent nothing and not closed it
fn still_open(stream: &mut TcpStream) -> io::Result<bool> {
    stream.set_nonblocking(true)?;
    let mut buf = [0u8; 1];
    let open = match stream.read(&mut buf) {
        Err(e) if e.kind() == io::ErrorKind::WouldBlock => true,
        _ => false,
    };
    stream.set_nonblocking(false)?;
    Ok(open)
}

impl fmt::Debug for TunnelTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TunnelTransport")
            .field("peer", &self.stream.peer_addr().ok())
            .finish()
    }
}
