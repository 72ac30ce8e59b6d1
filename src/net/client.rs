/// IPv4 TCP socket client
///
/// Resolves the scan target, establishes deadline-bounded connections, and
/// performs the passive banner read. Every blocking operation is wrapped in
/// a timeout; the derived host state tracks the most recent outcome.

use crate::config::ScanConfig;
use crate::error::{IoErrorKind, ScanError, ScanResult};
use crate::net::{self, HostState, BUFFER_SIZE};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, info};

/// Extra DNS resolution attempts after the first failure
const RESOLVE_RETRIES: u32 = 1;

/// TCP client owning one port's connection and state
pub struct TcpClient {
    target: String,
    port: u16,
    connect_timeout: Duration,
    recv_timeout: Duration,
    send_timeout: Duration,
    verbose: bool,
    stream: Option<TcpStream>,
    state: HostState,
}

impl TcpClient {
    /// Create a disconnected client for one port of the configured target
    pub fn new(config: &ScanConfig, port: u16) -> Self {
        Self {
            target: config.target.clone(),
            port,
            connect_timeout: config.connect_timeout,
            recv_timeout: config.recv_timeout,
            send_timeout: config.send_timeout,
            verbose: config.verbose,
            stream: None,
            state: HostState::Unknown,
        }
    }

    /// Resolve the target to an IPv4 endpoint, retrying transient failures
    pub async fn resolve(&self) -> ScanResult<SocketAddr> {
        let query = (self.target.as_str(), self.port);

        for attempt in 0..=RESOLVE_RETRIES {
            match tokio::net::lookup_host(query).await {
                Ok(addrs) => {
                    if let Some(addr) = addrs.filter(SocketAddr::is_ipv4).next() {
                        return Ok(addr);
                    }
                    debug!("No IPv4 results for '{}'", self.target);
                }
                Err(e) => {
                    debug!(
                        "Resolution attempt {} for '{}' failed: {}",
                        attempt + 1,
                        self.target,
                        e
                    );
                }
            }
        }

        Err(ScanError::resolve(&self.target))
    }

    /// Establish a connection to the target port, bounded by the connect
    /// deadline
    pub async fn connect(&mut self) -> ScanResult<()> {
        let endpoint = net::port_notation(self.port);

        let addr = match self.resolve().await {
            Ok(addr) => addr,
            Err(e) => {
                self.state = HostState::Unknown;
                return Err(e);
            }
        };

        match timeout(self.connect_timeout, TcpStream::connect(addr)).await {
            Ok(Ok(stream)) => {
                self.stream = Some(stream);
                self.state = HostState::Open;

                if self.verbose {
                    info!("Connection established: {}", endpoint);
                }
                Ok(())
            }
            Ok(Err(e)) => {
                self.state = match IoErrorKind::from_io(&e) {
                    IoErrorKind::Refused | IoErrorKind::Reset => HostState::Closed,
                    _ => HostState::Unknown,
                };
                Err(ScanError::io(endpoint, &e))
            }
            Err(_) => {
                self.state = HostState::Unknown;
                Err(ScanError::io_timeout(endpoint))
            }
        }
    }

    /// Whether the underlying socket is connected
    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    /// The derived host state for this port
    pub fn host_state(&self) -> HostState {
        self.state
    }

    /// Read the initial server-speaks banner
    ///
    /// Performs a single bounded read; a silent peer yields an empty banner
    /// and the port stays open.
    pub async fn recv_banner(&mut self) -> Vec<u8> {
        let recv_timeout = self.recv_timeout;

        let stream = match self.stream.as_mut() {
            Some(stream) => stream,
            None => return Vec::new(),
        };

        match read_banner(stream, recv_timeout).await {
            Ok(data) => data,
            Err(e) => {
                debug!("Banner read failed on {}: {}", self.port, e);

                if IoErrorKind::from_io(&e) == IoErrorKind::Reset {
                    self.state = HostState::Closed;
                }
                Vec::new()
            }
        }
    }

    /// Write a payload to the stream, bounded by the send deadline
    pub async fn send(&mut self, payload: &[u8]) -> ScanResult<()> {
        let endpoint = net::port_notation(self.port);
        let send_timeout = self.send_timeout;

        let stream = self
            .stream
            .as_mut()
            .ok_or_else(|| ScanError::io_timeout(&endpoint))?;

        match timeout(send_timeout, stream.write_all(payload)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(ScanError::io(endpoint, &e)),
            Err(_) => Err(ScanError::io_timeout(endpoint)),
        }
    }

    /// Take ownership of the connected stream (e.g. for an HTTP exchange)
    pub fn stream_mut(&mut self) -> Option<&mut TcpStream> {
        self.stream.as_mut()
    }

    /// Consume the client, returning the connected stream when present
    pub fn into_stream(self) -> Option<TcpStream> {
        self.stream
    }

    /// Drop the connection, closing the socket
    pub fn disconnect(&mut self) {
        self.stream = None;
    }
}

/// Perform one bounded read of up to the buffer size
///
/// A timeout on a connected stream is not an error: the peer is simply
/// silent, so an empty banner is returned.
pub async fn read_banner<S>(stream: &mut S, recv_timeout: Duration) -> std::io::Result<Vec<u8>>
where
    S: AsyncRead + Unpin,
{
    let mut buffer = vec![0u8; BUFFER_SIZE];

    match timeout(recv_timeout, stream.read(&mut buffer)).await {
        Ok(Ok(num_read)) => {
            buffer.truncate(num_read);
            Ok(buffer)
        }
        Ok(Err(e)) => Err(e),
        Err(_) => Ok(Vec::new()),
    }
}

/// Write a payload to any probe stream, bounded by the send deadline
pub async fn send_all<S>(
    stream: &mut S,
    payload: &[u8],
    send_timeout: Duration,
    endpoint: &str,
) -> ScanResult<()>
where
    S: AsyncWrite + Unpin,
{
    match timeout(send_timeout, stream.write_all(payload)).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(ScanError::io(endpoint, &e)),
        Err(_) => Err(ScanError::io_timeout(endpoint)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt;
    use tokio::net::TcpListener;

    fn test_config(target: &str) -> ScanConfig {
        ScanConfig {
            target: target.to_string(),
            ports: vec![1],
            connect_timeout: Duration::from_millis(500),
            recv_timeout: Duration::from_millis(200),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_resolve_ipv4_literal() {
        let client = TcpClient::new(&test_config("127.0.0.1"), 80);
        let addr = client.resolve().await.unwrap();
        assert!(addr.is_ipv4());
        assert_eq!(addr.port(), 80);
    }

    #[tokio::test]
    async fn test_resolve_failure() {
        let client = TcpClient::new(&test_config("host.invalid."), 80);
        let result = client.resolve().await;
        assert!(matches!(result, Err(ScanError::Resolve { .. })));
    }

    #[tokio::test]
    async fn test_connect_open_port() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let mut client = TcpClient::new(&test_config("127.0.0.1"), port);
        client.connect().await.unwrap();

        assert!(client.is_connected());
        assert_eq!(client.host_state(), HostState::Open);
    }

    #[tokio::test]
    async fn test_connect_closed_port() {
        // Bind then drop to obtain a port with nothing listening
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let mut client = TcpClient::new(&test_config("127.0.0.1"), port);
        let result = client.connect().await;

        assert!(result.is_err());
        assert!(!client.is_connected());
        assert_eq!(client.host_state(), HostState::Closed);
    }

    #[tokio::test]
    async fn test_banner_read() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            socket.write_all(b"ssh-2.0-openssh_9.3\r\n").await.unwrap();
        });

        let mut client = TcpClient::new(&test_config("127.0.0.1"), port);
        client.connect().await.unwrap();

        let banner = client.recv_banner().await;
        assert_eq!(banner, b"ssh-2.0-openssh_9.3\r\n");
    }

    #[tokio::test]
    async fn test_banner_read_silent_peer() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        // Accept but never write
        tokio::spawn(async move {
            let (_socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(2)).await;
        });

        let mut client = TcpClient::new(&test_config("127.0.0.1"), port);
        client.connect().await.unwrap();

        let banner = client.recv_banner().await;
        assert!(banner.is_empty());
        assert_eq!(client.host_state(), HostState::Open);
    }
}
