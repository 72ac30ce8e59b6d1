/// Minimal HTTP/1.1 probe messages
///
/// Provides the request builder and a tolerant streaming response parser
/// used to identify web services. The parser accepts chunked transfer
/// encoding, declared content lengths, and EOF-terminated bodies, and
/// treats truncation at a message boundary as success.

use crate::error::{HttpErrorKind, ScanError, ScanResult};
use crate::net::{client, BUFFER_SIZE};
use std::collections::BTreeMap;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite};
use tokio::time::timeout;
use tracing::debug;

/// HTTP version spoken by the probe
const HTTP_VERSION: &str = "1.1";

/// `User-Agent` header value
const USER_AGENT: &str = concat!("SvcProbe/", env!("CARGO_PKG_VERSION"));

/// Header field map with canonical-cased names
pub type HeaderMap = BTreeMap<String, String>;

/// Normalize an HTTP header field name to canonical casing
///
/// Each `-`-separated segment is lowercased with its first character
/// uppercased (`x-powered-by` becomes `X-Powered-By`).
pub fn normalize_header(name: &str) -> String {
    name.split('-')
        .map(|segment| {
            let lower = segment.to_lowercase();
            let mut chars = lower.chars();

            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join("-")
}

/// Outbound HTTP probe request
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: String,
    pub uri: String,
    pub version: String,
    pub headers: HeaderMap,
    pub body: String,
}

impl HttpRequest {
    /// Build a probe request with the mandatory header set
    pub fn new(method: &str, host: &str, uri: &str) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(normalize_header("Host"), host.to_string());
        headers.insert(normalize_header("Connection"), "close".to_string());
        headers.insert(normalize_header("User-Agent"), USER_AGENT.to_string());
        headers.insert(normalize_header("Accept"), "*/*".to_string());

        Self {
            method: method.to_string(),
            uri: uri.to_string(),
            version: HTTP_VERSION.to_string(),
            headers,
            body: String::new(),
        }
    }

    /// Serialize the request into wire form
    pub fn raw(&self) -> String {
        let mut raw = format!("{} {} HTTP/{}\r\n", self.method, self.uri, self.version);

        for (name, value) in &self.headers {
            raw.push_str(&format!("{}: {}\r\n", name, value));
        }

        raw.push_str("\r\n");
        raw.push_str(&self.body);
        raw
    }
}

/// Parsed HTTP probe response
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub version: String,
    pub status: u16,
    pub reason: String,
    pub headers: HeaderMap,
    pub body: String,
    raw: Vec<u8>,
    valid: bool,
}

impl HttpResponse {
    /// Whether the status line and headers parsed successfully
    pub fn valid(&self) -> bool {
        self.valid
    }

    /// The unmodified response bytes as received
    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    /// `Server` header value when present
    pub fn server(&self) -> Option<&str> {
        self.headers.get("Server").map(String::as_str)
    }

    /// Parse a complete response buffer
    ///
    /// Fails with a headers-stage error when the status line or header
    /// block is malformed; a missing or truncated body is not an error.
    pub fn parse(data: &[u8]) -> ScanResult<Self> {
        let header_end = find_header_end(data).ok_or(ScanError::http(HttpErrorKind::Headers))?;

        let head = String::from_utf8_lossy(&data[..header_end]);
        let mut lines = head.split("\r\n");

        let status_line = lines.next().ok_or(ScanError::http(HttpErrorKind::Headers))?;
        let (version, status, reason) = parse_status_line(status_line)?;

        let mut headers = HeaderMap::new();

        for line in lines {
            if let Some((name, value)) = line.split_once(':') {
                headers.insert(normalize_header(name.trim_end()), value.trim().to_string());
            }
        }

        let body_bytes = &data[header_end + 4..];
        let body = decode_body(body_bytes, &headers);

        Ok(Self {
            version,
            status,
            reason,
            headers,
            body,
            raw: data.to_vec(),
            valid: true,
        })
    }
}

/// Send a probe request and read the response from the given stream
///
/// Reads headers to completion, then reads the body until the declared
/// content length is satisfied, the chunked terminator arrives, or the
/// peer closes the stream. Truncation at a message boundary is success.
pub async fn exchange<S>(
    stream: &mut S,
    request: &HttpRequest,
    recv_timeout: Duration,
    send_timeout: Duration,
    endpoint: &str,
) -> ScanResult<HttpResponse>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    client::send_all(stream, request.raw().as_bytes(), send_timeout, endpoint).await?;

    let mut data = Vec::new();
    let mut chunk = vec![0u8; BUFFER_SIZE];

    // Read until the header block terminator
    let header_end = loop {
        match timeout(recv_timeout, stream.read(&mut chunk)).await {
            Ok(Ok(0)) | Err(_) => match find_header_end(&data) {
                Some(end) => break end,
                None => return Err(ScanError::http(HttpErrorKind::Headers)),
            },
            Ok(Ok(num_read)) => {
                data.extend_from_slice(&chunk[..num_read]);

                if let Some(end) = find_header_end(&data) {
                    break end;
                }
            }
            Ok(Err(e)) => {
                debug!("HTTP header read failed on {}: {}", endpoint, e);
                return Err(ScanError::http(HttpErrorKind::Headers));
            }
        }
    };

    // Provisional parse for the body-framing headers
    let provisional = HttpResponse::parse(&data)?;

    let content_length = provisional
        .headers
        .get("Content-Length")
        .and_then(|v| v.parse::<usize>().ok());

    let chunked = provisional
        .headers
        .get("Transfer-Encoding")
        .map(|v| v.to_lowercase().contains("chunked"))
        .unwrap_or(false);

    // Read the body to its declared or natural end
    loop {
        let body_len = data.len() - (header_end + 4);

        let complete = if chunked {
            chunked_complete(&data[header_end + 4..])
        } else if let Some(length) = content_length {
            body_len >= length
        } else {
            false
        };

        if complete {
            break;
        }

        match timeout(recv_timeout, stream.read(&mut chunk)).await {
            Ok(Ok(0)) | Err(_) => break,
            Ok(Ok(num_read)) => data.extend_from_slice(&chunk[..num_read]),
            Ok(Err(e)) => {
                debug!("HTTP body read failed on {}: {}", endpoint, e);
                return Err(ScanError::http(HttpErrorKind::Body));
            }
        }
    }

    HttpResponse::parse(&data)
}

/// Render a header map with one indented `Name: value` line per field
pub fn format_headers(headers: &HeaderMap, indent: &str) -> String {
    headers
        .iter()
        .map(|(name, value)| format!("{}{}: {}", indent, name, value))
        .collect::<Vec<String>>()
        .join("\n")
}

/// Locate the `\r\n\r\n` header block terminator
fn find_header_end(data: &[u8]) -> Option<usize> {
    data.windows(4).position(|w| w == b"\r\n\r\n")
}

/// Parse `HTTP/<v> <status> <reason>` into its parts
fn parse_status_line(line: &str) -> ScanResult<(String, u16, String)> {
    let mut parts = line.splitn(3, ' ');

    let version = parts
        .next()
        .and_then(|v| v.strip_prefix("HTTP/"))
        .ok_or(ScanError::http(HttpErrorKind::Headers))?;

    let status = parts
        .next()
        .and_then(|s| s.parse::<u16>().ok())
        .ok_or(ScanError::http(HttpErrorKind::Headers))?;

    let reason = parts.next().unwrap_or("").to_string();

    Ok((version.to_string(), status, reason))
}

/// Decode the body region according to its framing headers
fn decode_body(body: &[u8], headers: &HeaderMap) -> String {
    let chunked = headers
        .get("Transfer-Encoding")
        .map(|v| v.to_lowercase().contains("chunked"))
        .unwrap_or(false);

    if chunked {
        return String::from_utf8_lossy(&decode_chunked(body)).to_string();
    }

    let body = match headers
        .get("Content-Length")
        .and_then(|v| v.parse::<usize>().ok())
    {
        Some(length) if length < body.len() => &body[..length],
        _ => body,
    };

    String::from_utf8_lossy(body).to_string()
}

/// Reassemble a chunked transfer-encoded body, keeping whatever decodes
/// cleanly when the data is truncated
fn decode_chunked(data: &[u8]) -> Vec<u8> {
    let mut decoded = Vec::new();
    let mut offset = 0;

    while offset < data.len() {
        let line_end = match data[offset..].windows(2).position(|w| w == b"\r\n") {
            Some(pos) => offset + pos,
            None => break,
        };

        let size_line = String::from_utf8_lossy(&data[offset..line_end]);
        let size_field = size_line.split(';').next().unwrap_or("").trim();

        let size = match usize::from_str_radix(size_field, 16) {
            Ok(size) => size,
            Err(_) => break,
        };

        if size == 0 {
            break;
        }

        let chunk_beg = line_end + 2;
        let chunk_end = (chunk_beg + size).min(data.len());
        decoded.extend_from_slice(&data[chunk_beg..chunk_end]);

        // Skip the chunk's trailing CRLF
        offset = chunk_end + 2;
    }

    decoded
}

/// Whether a chunked body region contains its zero-size terminator
fn chunked_complete(data: &[u8]) -> bool {
    let mut offset = 0;

    while offset < data.len() {
        let line_end = match data[offset..].windows(2).position(|w| w == b"\r\n") {
            Some(pos) => offset + pos,
            None => return false,
        };

        let size_line = String::from_utf8_lossy(&data[offset..line_end]);
        let size_field = size_line.split(';').next().unwrap_or("").trim();

        let size = match usize::from_str_radix(size_field, 16) {
            Ok(size) => size,
            Err(_) => return false,
        };

        if size == 0 {
            return true;
        }

        offset = line_end + 2 + size + 2;
    }

    false
}
