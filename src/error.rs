/// Error handling for SvcProbe
///
/// This module defines the scanner error taxonomy and implements proper
/// error handling throughout the application using thiserror.

use thiserror::Error;

/// Socket-level error classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoErrorKind {
    Refused,
    Reset,
    Timeout,
    WouldBlock,
    Unknown,
}

impl IoErrorKind {
    /// Classify a standard I/O error into the scanner taxonomy
    pub fn from_io(error: &std::io::Error) -> Self {
        use std::io::ErrorKind;

        match error.kind() {
            ErrorKind::ConnectionRefused => IoErrorKind::Refused,
            ErrorKind::ConnectionReset | ErrorKind::ConnectionAborted => IoErrorKind::Reset,
            ErrorKind::TimedOut => IoErrorKind::Timeout,
            ErrorKind::WouldBlock => IoErrorKind::WouldBlock,
            _ => IoErrorKind::Unknown,
        }
    }
}

impl std::fmt::Display for IoErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IoErrorKind::Refused => write!(f, "refused"),
            IoErrorKind::Reset => write!(f, "reset"),
            IoErrorKind::Timeout => write!(f, "timeout"),
            IoErrorKind::WouldBlock => write!(f, "would_block"),
            IoErrorKind::Unknown => write!(f, "unknown"),
        }
    }
}

/// TLS handshake/stream error classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TlsErrorKind {
    StreamTruncated,
    HandshakeFailed,
    Other,
}

impl std::fmt::Display for TlsErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TlsErrorKind::StreamTruncated => write!(f, "stream_truncated"),
            TlsErrorKind::HandshakeFailed => write!(f, "handshake_failed"),
            TlsErrorKind::Other => write!(f, "other"),
        }
    }
}

/// HTTP response parser error classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpErrorKind {
    Headers,
    Body,
}

impl std::fmt::Display for HttpErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HttpErrorKind::Headers => write!(f, "headers"),
            HttpErrorKind::Body => write!(f, "body"),
        }
    }
}

/// Main error type for the SvcProbe scanner
#[derive(Error, Debug)]
pub enum ScanError {
    /// User input violated an argument contract
    #[error("Invalid argument '{name}': {explanation}")]
    InvalidArg { name: String, explanation: String },

    /// Port specification token failed to parse
    #[error("'{token}' is not a valid port specification")]
    InvalidPorts { token: String },

    /// DNS lookup exhausted its retries
    #[error("Unable to resolve hostname: '{target}'")]
    Resolve { target: String },

    /// Socket-level error
    #[error("Socket error ({kind}) on {endpoint}: {message}")]
    Io {
        endpoint: String,
        kind: IoErrorKind,
        message: String,
    },

    /// TLS handshake or stream error
    #[error("TLS error ({kind}) on {endpoint}: {message}")]
    Tls {
        endpoint: String,
        kind: TlsErrorKind,
        message: String,
    },

    /// HTTP response parser failure
    #[error("HTTP parse error in message {kind}")]
    Http { kind: HttpErrorKind },

    /// Output path validation failure
    #[error("Invalid file path '{path}': {reason}")]
    FilePath { path: String, reason: String },
}

/// Result type alias for scanner operations
pub type ScanResult<T> = Result<T, ScanError>;

impl ScanError {
    /// Create an invalid argument error
    pub fn invalid_arg<S1: Into<String>, S2: Into<String>>(name: S1, explanation: S2) -> Self {
        ScanError::InvalidArg {
            name: name.into(),
            explanation: explanation.into(),
        }
    }

    /// Create an invalid port specification error
    pub fn invalid_ports<S: Into<String>>(token: S) -> Self {
        ScanError::InvalidPorts {
            token: token.into(),
        }
    }

    /// Create a name resolution error
    pub fn resolve<S: Into<String>>(target: S) -> Self {
        ScanError::Resolve {
            target: target.into(),
        }
    }

    /// Create a socket error from a standard I/O error
    pub fn io<S: Into<String>>(endpoint: S, error: &std::io::Error) -> Self {
        ScanError::Io {
            endpoint: endpoint.into(),
            kind: IoErrorKind::from_io(error),
            message: error.to_string(),
        }
    }

    /// Create a socket timeout error for an elapsed deadline
    pub fn io_timeout<S: Into<String>>(endpoint: S) -> Self {
        ScanError::Io {
            endpoint: endpoint.into(),
            kind: IoErrorKind::Timeout,
            message: "operation timed out".to_string(),
        }
    }

    /// Create a TLS error
    pub fn tls<S1: Into<String>, S2: Into<String>>(
        endpoint: S1,
        kind: TlsErrorKind,
        message: S2,
    ) -> Self {
        ScanError::Tls {
            endpoint: endpoint.into(),
            kind,
            message: message.into(),
        }
    }

    /// Create an HTTP parse error
    pub fn http(kind: HttpErrorKind) -> Self {
        ScanError::Http { kind }
    }

    /// Create an output path validation error
    pub fn file_path<S1: Into<String>, S2: Into<String>>(path: S1, reason: S2) -> Self {
        ScanError::FilePath {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Get the socket error kind when this is a socket error
    pub fn io_kind(&self) -> Option<IoErrorKind> {
        match self {
            ScanError::Io { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// One-line message suitable for the console error banner
    pub fn summary(&self) -> String {
        match self {
            ScanError::Io {
                endpoint,
                kind: IoErrorKind::Refused,
                ..
            } => format!("Connection refused: {}", endpoint),
            ScanError::Io {
                endpoint,
                kind: IoErrorKind::Reset,
                ..
            } => format!("Connection was reset: {}", endpoint),
            ScanError::Io {
                endpoint,
                kind: IoErrorKind::Timeout,
                ..
            } => format!("Connection timeout: {}", endpoint),
            ScanError::Io {
                endpoint,
                kind: IoErrorKind::WouldBlock,
                ..
            } => format!("Socket would block: {}", endpoint),
            ScanError::Tls {
                endpoint,
                kind: TlsErrorKind::StreamTruncated,
                ..
            } => format!("The TLS stream was closed: {}", endpoint),
            other => other.to_string(),
        }
    }
}
