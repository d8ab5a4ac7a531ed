//! Channel Transport: one UDP datagram out, at most one datagram back.
//!
//! Every request opens its own ephemeral socket and drops it on return, so
//! nothing is shared between requests and a lost reply can never be read by
//! the next exchange.

use crate::channels::{MAX_REPLY_BYTES, MAX_REQUEST_BYTES};
use crate::error::{Result, TelemetryError};
use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;
use tokio::net::{lookup_host, UdpSocket};
use tokio::time::timeout;
use tracing::debug;

/// Address and reply budget of one instrument server.
#[derive(Debug, Clone, PartialEq)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
    pub timeout: Duration,
}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: u16, timeout: Duration) -> Self {
        Self {
            host: host.into(),
            port,
            timeout,
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone)]
pub struct ChannelTransport {
    endpoint: Endpoint,
}

impl ChannelTransport {
    pub fn new(endpoint: Endpoint) -> Self {
        Self { endpoint }
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Sends `request` (a channel name or command keyword) and returns the
    /// trimmed reply.
    ///
    /// The socket is connected to the server, so datagrams from any other
    /// peer are dropped by the kernel and never taken as the reply.
    pub async fn request(&self, request: &str) -> Result<String> {
        validate_request(request)?;

        let target = self.resolve().await?;
        let local = if target.is_ipv6() {
            SocketAddr::from((Ipv6Addr::UNSPECIFIED, 0))
        } else {
            SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0))
        };

        let socket = UdpSocket::bind(local).await?;
        socket.connect(target).await?;
        socket.send(request.as_bytes()).await?;

        let mut buf = [0u8; MAX_REPLY_BYTES];
        let len = match timeout(self.endpoint.timeout, socket.recv(&mut buf)).await {
            Ok(received) => received?,
            Err(_) => {
                debug!(
                    "{} timed out after {:?} waiting on {}",
                    request, self.endpoint.timeout, self.endpoint
                );
                return Err(TelemetryError::Timeout(self.endpoint.timeout));
            }
        };

        let reply = std::str::from_utf8(&buf[..len]).map_err(|e| {
            TelemetryError::Transport(format!("reply from {target} is not valid UTF-8: {e}"))
        })?;

        Ok(reply.trim().to_string())
    }

    async fn resolve(&self) -> Result<SocketAddr> {
        let mut addrs = lookup_host((self.endpoint.host.as_str(), self.endpoint.port))
            .await
            .map_err(|e| {
                TelemetryError::Transport(format!("cannot resolve {}: {e}", self.endpoint))
            })?;

        addrs
            .next()
            .ok_or_else(|| TelemetryError::Transport(format!("no address for {}", self.endpoint)))
    }
}

/// A request must fit in one datagram the server is willing to read.
pub fn validate_request(request: &str) -> Result<()> {
    if request.is_empty() {
        return Err(TelemetryError::InvalidRequest("empty request".into()));
    }
    if request.len() > MAX_REQUEST_BYTES {
        return Err(TelemetryError::InvalidRequest(format!(
            "request is {} bytes, limit is {}",
            request.len(),
            MAX_REQUEST_BYTES
        )));
    }
    Ok(())
}
