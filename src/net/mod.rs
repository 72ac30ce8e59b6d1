/// Network primitives for SvcProbe
///
/// Shared socket constants, the host state model, and the TCP/TLS/HTTP
/// probing clients.

pub mod client;
pub mod http;
pub mod tls;

pub use client::TcpClient;
pub use http::{HttpRequest, HttpResponse};
pub use tls::{TlsClient, TlsInfo};

use serde::{Deserialize, Serialize};

/// Default connect timeout in milliseconds
pub const CONN_TIMEOUT_MS: u64 = 3500;

/// Default receive timeout in milliseconds
pub const RECV_TIMEOUT_MS: u64 = 1000;

/// Default send timeout in milliseconds
pub const SEND_TIMEOUT_MS: u64 = 500;

/// Receive buffer size in bytes
pub const BUFFER_SIZE: usize = 1024;

/// Transport protocol name
pub const PROTO: &str = "tcp";

/// HTTP URI root path
pub const URI_ROOT: &str = "/";

/// Remote host state derived from connect and probe outcomes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HostState {
    Unknown,
    Open,
    Closed,
}

impl std::fmt::Display for HostState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HostState::Unknown => write!(f, "unknown"),
            HostState::Open => write!(f, "open"),
            HostState::Closed => write!(f, "closed"),
        }
    }
}

/// `port/tcp` notation used in messages and the report table
pub fn port_notation(port: u16) -> String {
    format!("{}/{}", port, PROTO)
}
