/// TLS probing client
///
/// Layers a permissive TLS session over a fresh TCP connection and exposes
/// the negotiated cipher suite plus the server certificate's issuer and
/// subject names. Certificate validation is intentionally disabled: the
/// scanner inspects certificates, it does not trust them.

use crate::config::ScanConfig;
use crate::error::{ScanError, ScanResult, TlsErrorKind};
use crate::net::{self, client::TcpClient, HostState};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Once};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_rustls::client::TlsStream;
use tokio_rustls::rustls::client::danger::{
    HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier,
};
use tokio_rustls::rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use tokio_rustls::rustls::{self, ClientConfig, DigitallySignedStruct, SignatureScheme};
use tokio_rustls::TlsConnector;
use tracing::debug;
use x509_parser::prelude::*;

static PROVIDER_INIT: Once = Once::new();

/// Install the process-wide crypto provider exactly once
fn install_provider() {
    PROVIDER_INIT.call_once(|| {
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
}

/// Negotiated session details recorded on a service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TlsInfo {
    pub cipher_suite: String,
    pub issuer: String,
    pub subject: String,
}

/// Certificate verifier that accepts any server certificate
#[derive(Debug)]
struct AcceptAnyCert;

impl ServerCertVerifier for AcceptAnyCert {
    fn verify_server_cert(
        &self,
        _end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        vec![
            SignatureScheme::RSA_PKCS1_SHA256,
            SignatureScheme::RSA_PKCS1_SHA384,
            SignatureScheme::RSA_PKCS1_SHA512,
            SignatureScheme::ECDSA_NISTP256_SHA256,
            SignatureScheme::ECDSA_NISTP384_SHA384,
            SignatureScheme::ECDSA_NISTP521_SHA512,
            SignatureScheme::RSA_PSS_SHA256,
            SignatureScheme::RSA_PSS_SHA384,
            SignatureScheme::RSA_PSS_SHA512,
            SignatureScheme::ED25519,
        ]
    }
}

/// TLS client owning one port's encrypted stream and session details
pub struct TlsClient {
    stream: TlsStream<TcpStream>,
    info: TlsInfo,
    recv_timeout: Duration,
    port: u16,
}

impl TlsClient {
    /// Connect to the target port and perform a permissive TLS handshake
    /// on a fresh TCP stream
    pub async fn connect(config: &ScanConfig, port: u16) -> ScanResult<Self> {
        install_provider();

        let endpoint = net::port_notation(port);

        let mut tcp_client = TcpClient::new(config, port);
        tcp_client.connect().await?;

        let tcp_stream = tcp_client
            .into_stream()
            .ok_or_else(|| ScanError::io_timeout(&endpoint))?;

        let tls_config = ClientConfig::builder()
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(AcceptAnyCert))
            .with_no_client_auth();

        let server_name = ServerName::try_from(config.target.clone()).map_err(|e| {
            ScanError::tls(&endpoint, TlsErrorKind::HandshakeFailed, e.to_string())
        })?;

        let connector = TlsConnector::from(Arc::new(tls_config));

        let stream = match timeout(
            config.connect_timeout,
            connector.connect(server_name, tcp_stream),
        )
        .await
        {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => return Err(classify_tls_error(&endpoint, &e)),
            Err(_) => {
                return Err(ScanError::tls(
                    &endpoint,
                    TlsErrorKind::HandshakeFailed,
                    "handshake timed out",
                ))
            }
        };

        let info = session_info(&stream);
        debug!("TLS session established on {}: {}", endpoint, info.cipher_suite);

        Ok(Self {
            stream,
            info,
            recv_timeout: config.recv_timeout,
            port,
        })
    }

    /// Negotiated session details
    pub fn info(&self) -> &TlsInfo {
        &self.info
    }

    /// The TCP connection succeeded, so the port is live
    pub fn host_state(&self) -> HostState {
        HostState::Open
    }

    /// Read the initial banner over the encrypted stream
    pub async fn recv_banner(&mut self) -> Vec<u8> {
        match net::client::read_banner(&mut self.stream, self.recv_timeout).await {
            Ok(data) => data,
            Err(e) => {
                debug!("TLS banner read failed on {}: {}", self.port, e);
                Vec::new()
            }
        }
    }

    /// Mutable access to the encrypted stream for an HTTP exchange
    pub fn stream_mut(&mut self) -> &mut TlsStream<TcpStream> {
        &mut self.stream
    }
}

/// Extract the cipher suite and certificate names from a live session
fn session_info(stream: &TlsStream<TcpStream>) -> TlsInfo {
    let (_, connection) = stream.get_ref();

    let cipher_suite = connection
        .negotiated_cipher_suite()
        .map(|suite| format!("{:?}", suite.suite()))
        .unwrap_or_default();

    let (issuer, subject) = connection
        .peer_certificates()
        .and_then(|certs| certs.first())
        .and_then(|der| certificate_names(der.as_ref()))
        .unwrap_or_default();

    TlsInfo {
        cipher_suite,
        issuer,
        subject,
    }
}

/// Parse the issuer and subject one-line DNs from certificate DER bytes
fn certificate_names(der: &[u8]) -> Option<(String, String)> {
    let (_, certificate) = parse_x509_certificate(der).ok()?;

    Some((
        certificate.issuer().to_string(),
        certificate.subject().to_string(),
    ))
}

/// Map a handshake/stream error into the TLS error taxonomy
fn classify_tls_error(endpoint: &str, error: &std::io::Error) -> ScanError {
    let kind = if error.kind() == std::io::ErrorKind::UnexpectedEof {
        TlsErrorKind::StreamTruncated
    } else {
        TlsErrorKind::HandshakeFailed
    };

    ScanError::tls(endpoint, kind, error.to_string())
}
