//! Endpoint resolution and the connection factory.
//!
//! An [`Endpoint`] is an immutable value describing where the `adb` server
//! listens. [`Endpoint::connect`] opens a fresh TCP connection per call —
//! there is no pooling, matching the "fresh connection per request" model
//! in the protocol spec.

use std::net::{IpAddr, Ipv4Addr};

use tokio::net::TcpStream;
use tracing::debug;

use crate::error::{AdbError, AdbResult};

/// The address family an [`Endpoint`] was constructed from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AddressFamily {
    V4,
    V6,
    Dns,
    /// A local-socket literal (`unix:<path>`, `vsock:<cid>:<port>`) — valid
    /// adb server address syntax, but this client only ever speaks TCP to
    /// the host server. Rejected at connect time.
    Unsupported,
}

/// A TCP endpoint for an `adb` server.
///
/// Immutable after construction; cloning is cheap.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Endpoint {
    host: String,
    port: u16,
    family: AddressFamily,
}

impl Endpoint {
    /// The default loopback endpoint, `127.0.0.1:5037`.
    pub fn default_local() -> Self {
        Endpoint {
            host: Ipv4Addr::LOCALHOST.to_string(),
            port: 5037,
            family: AddressFamily::V4,
        }
    }

    /// Constructs an endpoint from a host and port, inferring the address
    /// family from the syntax of `host`.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        let host = host.into();
        let family = if host.starts_with("unix:") || host.starts_with("vsock:") {
            AddressFamily::Unsupported
        } else {
            match host.parse::<IpAddr>() {
                Ok(IpAddr::V4(_)) => AddressFamily::V4,
                Ok(IpAddr::V6(_)) => AddressFamily::V6,
                Err(_) => AddressFamily::Dns,
            }
        };
        Endpoint { host, port, family }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn family(&self) -> AddressFamily {
        self.family
    }

    /// Opens a fresh TCP connection to this endpoint.
    ///
    /// Only IPv4, IPv6, and resolvable DNS names are supported; a
    /// `unix:`/`vsock:` literal fails with [`AdbError::NotSupported`]
    /// before any socket is touched (there is none to construct for a
    /// non-TCP endpoint here).
    pub async fn connect(&self) -> AdbResult<TcpStream> {
        match self.family {
            AddressFamily::Unsupported => Err(AdbError::NotSupported(format!(
                "local-socket endpoint {:?} is not supported by this client; only TCP is",
                self.host
            ))),
            AddressFamily::V4 | AddressFamily::V6 | AddressFamily::Dns => {
                let addr = format!("{}:{}", self.host, self.port);
                debug!(target = "adbhost::endpoint", %addr, "connecting to adb server");
                let stream = TcpStream::connect(&addr).await.map_err(|err| {
                    if err.kind() == std::io::ErrorKind::ConnectionRefused {
                        AdbError::ServerFail(format!(
                            "connection refused by {} (is the adb server running?)",
                            addr
                        ))
                    } else {
                        AdbError::Io(err)
                    }
                })?;
                stream.set_nodelay(true).ok();
                Ok(stream)
            }
        }
    }
}

impl Default for Endpoint {
    fn default() -> Self {
        Endpoint::default_local()
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infers_v4_from_dotted_quad() {
        let ep = Endpoint::new("127.0.0.1", 5037);
        assert_eq!(ep.family(), AddressFamily::V4);
    }

    #[test]
    fn infers_v6_from_bracket_free_literal() {
        let ep = Endpoint::new("::1", 5037);
        assert_eq!(ep.family(), AddressFamily::V6);
    }

    #[test]
    fn infers_dns_for_hostnames() {
        let ep = Endpoint::new("localhost", 5037);
        assert_eq!(ep.family(), AddressFamily::Dns);
    }

    #[test]
    fn default_is_loopback_5037() {
        let ep = Endpoint::default();
        assert_eq!(ep.to_string(), "127.0.0.1:5037");
    }

    #[tokio::test]
    async fn connect_failure_is_not_a_panic() {
        // Port 1 is a reserved, normally-unbound port; connecting should
        // fail cleanly rather than hang or panic.
        let ep = Endpoint::new("127.0.0.1", 1);
        let result = tokio::time::timeout(std::time::Duration::from_secs(2), ep.connect()).await;
        assert!(result.is_ok(), "connect attempt should not hang");
        assert!(result.unwrap().is_err());
    }

    #[test]
    fn infers_unsupported_for_unix_socket_literal() {
        let ep = Endpoint::new("unix:/tmp/adb.sock", 5037);
        assert_eq!(ep.family(), AddressFamily::Unsupported);
    }

    #[test]
    fn infers_unsupported_for_vsock_literal() {
        let ep = Endpoint::new("vsock:3:5555", 5037);
        assert_eq!(ep.family(), AddressFamily::Unsupported);
    }

    #[tokio::test]
    async fn connect_rejects_unsupported_family_without_touching_a_socket() {
        let ep = Endpoint::new("unix:/tmp/adb.sock", 5037);
        let err = ep.connect().await.unwrap_err();
        assert!(matches!(err, AdbError::NotSupported(_)));
    }
}
