//! Proxy engine boundary.
//!
//! The pipeline consumes three capabilities from an engine: validate an
//! outbound descriptor, obtain a network-capable dialer for it, and execute
//! a single URL latency probe through a dialer. Protocol wire behavior lives
//! entirely behind this boundary.

use std::io;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use pr_link::model::OutboundDescriptor;
use tokio::net::TcpStream;

use crate::error::{EngineError, ProbeError};

pub trait AsyncReadWrite: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin + Send {}
impl<T> AsyncReadWrite for T where T: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin + Send {}

/// Boxed byte stream returned by a dialer.
pub type IoStream = Box<dyn AsyncReadWrite + 'static>;

/// Network-connecting capability bound to one outbound descriptor. A
/// tunneling engine's dialer carries traffic to `(host, port)` through the
/// proxy; the built-in engine reaches the proxy endpoint itself.
#[async_trait]
pub trait Dialer: Send + Sync {
    async fn connect(&self, host: &str, port: u16) -> io::Result<IoStream>;
}

/// The external proxy engine, seen from the pipeline.
#[async_trait]
pub trait ProxyEngine: Send + Sync {
    /// Structural gate: confirm the descriptor is constructible. No I/O.
    fn validate(&self, descriptor: &OutboundDescriptor) -> Result<(), EngineError>;

    /// Obtain a dialer for a validated descriptor. Read-only afterwards;
    /// probe tasks share it through the returned `Arc`.
    fn dialer(&self, descriptor: &OutboundDescriptor) -> Result<Arc<dyn Dialer>, EngineError>;

    /// Execute one latency probe against `url` through `dialer`, returning
    /// elapsed milliseconds on success.
    async fn url_probe(&self, dialer: &dyn Dialer, url: &str) -> Result<u64, ProbeError>;
}

/// Built-in reachability engine.
///
/// Validation checks the structural invariants each protocol needs; the
/// dialer opens a TCP connection to the proxy endpoint and the probe
/// measures that connection's establishment round-trip. It deliberately
/// speaks no proxy protocol, so it cannot tunnel to the test URL; richer
/// engines implement [`ProxyEngine`] with full HTTP probing.
#[derive(Debug, Default)]
pub struct TcpProbeEngine;

struct EndpointDialer {
    server: String,
    port: u16,
}

#[async_trait]
impl Dialer for EndpointDialer {
    async fn connect(&self, _host: &str, _port: u16) -> io::Result<IoStream> {
        let stream = TcpStream::connect((self.server.as_str(), self.port)).await?;
        Ok(Box::new(stream))
    }
}

#[async_trait]
impl ProxyEngine for TcpProbeEngine {
    fn validate(&self, descriptor: &OutboundDescriptor) -> Result<(), EngineError> {
        let (server, port) = descriptor.server();
        if server.is_empty() {
            return Err(EngineError::MissingServer);
        }
        if port == 0 {
            return Err(EngineError::InvalidPort);
        }

        match descriptor {
            OutboundDescriptor::Vless(o) => check_uuid(&o.uuid)?,
            OutboundDescriptor::Vmess(o) => check_uuid(&o.uuid)?,
            OutboundDescriptor::Trojan(o) => {
                if o.password.is_empty() {
                    return Err(EngineError::MissingCredentials);
                }
            }
            OutboundDescriptor::Hysteria2(o) => {
                if o.password.is_empty() {
                    return Err(EngineError::MissingCredentials);
                }
            }
            OutboundDescriptor::Shadowsocks(o) => {
                if o.method.is_empty() {
                    return Err(EngineError::MissingCredentials);
                }
            }
        }
        Ok(())
    }

    fn dialer(&self, descriptor: &OutboundDescriptor) -> Result<Arc<dyn Dialer>, EngineError> {
        let (server, port) = descriptor.server();
        if server.is_empty() || port == 0 {
            return Err(EngineError::MissingServer);
        }
        Ok(Arc::new(EndpointDialer {
            server: server.to_string(),
            port,
        }))
    }

    async fn url_probe(&self, dialer: &dyn Dialer, url: &str) -> Result<u64, ProbeError> {
        let (host, port) = parse_test_url(url).map_err(|e| ProbeError::Io(e.to_string()))?;
        let start = Instant::now();
        let stream = dialer
            .connect(&host, port)
            .await
            .map_err(|e| ProbeError::Io(e.to_string()))?;
        drop(stream);
        Ok(start.elapsed().as_millis() as u64)
    }
}

/// Extract host and port from a test URL.
fn parse_test_url(url: &str) -> io::Result<(String, u16)> {
    let (rest, default_port) = if let Some(rest) = url.strip_prefix("https://") {
        (rest, 443)
    } else if let Some(rest) = url.strip_prefix("http://") {
        (rest, 80)
    } else {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "invalid test url scheme",
        ));
    };

    let authority = rest.split('/').next().unwrap_or("");
    // Bracketed IPv6 hosts carry colons of their own; split on the closing
    // bracket before looking for a port.
    let (host, port) = if let Some(v6) = authority.strip_prefix('[') {
        let (host, tail) = v6.split_once(']').ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidInput, "unclosed ipv6 bracket")
        })?;
        let port = tail
            .strip_prefix(':')
            .and_then(|p| p.parse().ok())
            .unwrap_or(default_port);
        (host, port)
    } else {
        match authority.rsplit_once(':') {
            Some((h, p)) => (h, p.parse().unwrap_or(default_port)),
            None => (authority, default_port),
        }
    };
    Ok((host.to_string(), port))
}

fn check_uuid(uuid: &str) -> Result<(), EngineError> {
    uuid::Uuid::parse_str(uuid)
        .map(|_| ())
        .map_err(|_| EngineError::MalformedUuid(uuid.to_string()))
}
