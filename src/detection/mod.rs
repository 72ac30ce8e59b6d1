/// Service identification
///
/// Fuses the banner, HTTP response, TLS session details, and the embedded
/// catalog into one `ServiceRecord` per scanned port.

use crate::catalog::ServiceCatalog;
use crate::net::{self, http, HostState, HttpRequest, HttpResponse, TlsInfo};
use crate::output;

/// Maximum visible length of a banner-derived summary
const SUMMARY_LEN: usize = 25;

/// One scanned port's identification result, the unit of report output
#[derive(Debug, Clone)]
pub struct ServiceRecord {
    pub port: u16,
    pub proto: String,
    pub state: HostState,
    pub service: String,
    pub summary: String,
    pub banner: String,
    pub tls_info: Option<TlsInfo>,
    pub request: Option<HttpRequest>,
    pub response: Option<HttpResponse>,
}

impl ServiceRecord {
    /// Create an unidentified record for a port in the given state
    pub fn new(port: u16, state: HostState) -> Self {
        Self {
            port,
            proto: net::PROTO.to_string(),
            state,
            service: String::new(),
            summary: String::new(),
            banner: String::new(),
            tls_info: None,
            request: None,
            response: None,
        }
    }

    /// `port/tcp` notation for table rows and messages
    pub fn port_str(&self) -> String {
        net::port_notation(self.port)
    }

    /// Parse a raw application banner into the identity fields
    ///
    /// Banners with at least two `-` separators carry extended service
    /// information (`ssh-2.0-openssh_9.3`); anything else is retained
    /// verbatim with an abbreviated summary.
    pub fn parse_banner(&mut self, data: &str) {
        if data.is_empty() {
            return;
        }

        self.banner = upto_last_eol(data).to_string();
        self.state = HostState::Open;

        if self.banner.matches('-').count() >= 2 {
            let fields: Vec<&str> = self.banner.splitn(3, '-').collect();

            self.service = format!(
                "{} ({})",
                fields[0].to_lowercase(),
                fields[1].to_lowercase()
            );
            self.summary = fields[2].replace('_', " ");
        } else {
            self.service = "unknown".to_string();
            self.summary = abbreviate(upto_first_eol(&self.banner), SUMMARY_LEN);
        }
    }

    /// Record an HTTP exchange and derive the identity from it when the
    /// banner gave none
    pub fn apply_http(&mut self, request: HttpRequest, response: HttpResponse) {
        if self.banner.is_empty() && response.valid() {
            let server = response.server().unwrap_or("").to_string();

            self.service = format!("http ({})", response.version);
            self.summary = server.replace(['_', '/'], " ");
            self.banner = server;
        }

        self.request = Some(request);
        self.response = Some(response);
    }

    /// Attach negotiated TLS session details; the service name is
    /// unaffected
    pub fn set_tls_info(&mut self, info: TlsInfo) {
        self.tls_info = Some(info);
    }

    /// Resolve a still-unknown identity through the catalog
    ///
    /// A banner-derived summary is kept when only the service name was
    /// unknown; the catalog never overwrites an identified service.
    pub fn update_from_catalog(&mut self, catalog: &ServiceCatalog) {
        let skip_summary = !self.summary.is_empty() && self.service == "unknown";

        if self.service.is_empty() || skip_summary {
            if let Some((service, summary)) = catalog.lookup(self.port, &self.proto) {
                self.service = service.to_string();

                if !skip_summary {
                    self.summary = summary.to_string();
                }
            }
        }

        if self.service.is_empty() {
            self.service = "unknown".to_string();
        }
    }

    /// Whether the probes yielded a usable identity without TLS
    pub fn identified(&self) -> bool {
        !self.banner.is_empty() || self.response.as_ref().map(HttpResponse::valid).unwrap_or(false)
    }

    /// Multi-line detail block for verbose output
    pub fn details(&self, colorize: bool) -> String {
        let mut block = output::header(&format!("Details: {}", self.port_str()), colorize);

        block.push('\n');
        block.push_str(&output::field("Port    ", &self.port.to_string(), colorize));
        block.push('\n');
        block.push_str(&output::field("Protocol", &self.proto, colorize));
        block.push('\n');
        block.push_str(&output::field("State   ", &self.state.to_string(), colorize));
        block.push('\n');
        block.push_str(&output::field("Service ", &self.service, colorize));

        if !self.summary.is_empty() {
            block.push('\n');
            block.push_str(&output::field("Summary ", &self.summary, colorize));
        }

        if !self.banner.is_empty() {
            block.push('\n');
            block.push_str(&output::field("Banner  ", &self.banner, colorize));
        }

        if let Some(tls) = &self.tls_info {
            block.push_str("\n\n");
            block.push_str(&output::field("Cipher Suite ", &tls.cipher_suite, colorize));
            block.push('\n');
            block.push_str(&output::field("X.509 Issuer ", &tls.issuer, colorize));
            block.push('\n');
            block.push_str(&output::field("X.509 Subject", &tls.subject, colorize));
        }

        if let (Some(request), Some(response)) = (&self.request, &self.response) {
            block.push_str("\n\n");
            block.push_str(&request_details(request, colorize));
            block.push_str("\n\n");
            block.push_str(&response_details(response, colorize));
        }

        block
    }
}

/// Detail lines for the probe request
fn request_details(request: &HttpRequest, colorize: bool) -> String {
    let headers = format!("\n{}", http::format_headers(&request.headers, "    "));

    let mut block = output::field("Request Version", &request.version, colorize);
    block.push('\n');
    block.push_str(&output::field("Request Method ", &request.method, colorize));
    block.push('\n');
    block.push_str(&output::field("Request URI    ", &request.uri, colorize));
    block.push('\n');
    block.push_str(&output::field("Request Headers", &headers, colorize));

    if !request.body.is_empty() {
        block.push('\n');
        block.push_str(&output::field(
            "Request Body   ",
            &format!("\n{}", request.body),
            colorize,
        ));
    }

    block
}

/// Detail lines for the probe response
fn response_details(response: &HttpResponse, colorize: bool) -> String {
    let headers = format!("\n{}", http::format_headers(&response.headers, "    "));

    let mut block = output::field("Response Version", &response.version, colorize);
    block.push('\n');
    block.push_str(&output::field(
        "Response Status ",
        &response.status.to_string(),
        colorize,
    ));
    block.push('\n');
    block.push_str(&output::field("Response Reason ", &response.reason, colorize));
    block.push('\n');
    block.push_str(&output::field("Response Headers", &headers, colorize));

    if !response.body.is_empty() {
        block.push('\n');
        block.push_str(&output::field(
            "Response Body   ",
            &format!("\n{}", response.body),
            colorize,
        ));
    }

    block
}

/// Truncate at the last line terminator (CR-LF preferred, LF fallback)
fn upto_last_eol(data: &str) -> &str {
    if let Some(index) = data.rfind("\r\n") {
        &data[..index]
    } else if let Some(index) = data.rfind('\n') {
        &data[..index]
    } else {
        data
    }
}

/// Truncate at the first line terminator (CR-LF preferred, LF fallback)
fn upto_first_eol(data: &str) -> &str {
    if let Some(index) = data.find("\r\n") {
        &data[..index]
    } else if let Some(index) = data.find('\n') {
        &data[..index]
    } else {
        data
    }
}

/// Abbreviate to the given length, marking truncation with `...`
fn abbreviate(data: &str, len: usize) -> String {
    let truncated: String = data.chars().take(len).collect();

    if data.chars().count() > len {
        format!("{}...", truncated)
    } else {
        truncated
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ServiceCatalog;

    #[test]
    fn test_banner_triple() {
        let mut record = ServiceRecord::new(22, HostState::Open);
        record.parse_banner("ssh-2.0-openssh_9.3\r\n");

        assert_eq!(record.service, "ssh (2.0)");
        assert_eq!(record.summary, "openssh 9.3");
        assert_eq!(record.banner, "ssh-2.0-openssh_9.3");
    }

    #[test]
    fn test_banner_triple_lowercases_name_and_version() {
        let mut record = ServiceRecord::new(22, HostState::Open);
        record.parse_banner("SSH-2.0-OpenSSH_9.3\r\n");

        assert_eq!(record.service, "ssh (2.0)");
        assert_eq!(record.summary, "OpenSSH 9.3");
    }

    #[test]
    fn test_short_banner_unknown() {
        let mut record = ServiceRecord::new(4444, HostState::Open);
        record.parse_banner("hello\n");

        assert_eq!(record.service, "unknown");
        assert_eq!(record.summary, "hello");
        assert_eq!(record.banner, "hello");
    }

    #[test]
    fn test_long_banner_abbreviated() {
        let mut record = ServiceRecord::new(4444, HostState::Open);
        record.parse_banner("this banner line is well over the limit\r\n");

        assert_eq!(record.service, "unknown");
        assert!(record.summary.ends_with("..."));
        assert_eq!(record.summary.chars().count(), SUMMARY_LEN + 3);
    }

    #[test]
    fn test_multiline_banner_keeps_all_but_summary_first_line() {
        let mut record = ServiceRecord::new(25, HostState::Open);
        record.parse_banner("hi there\r\nsecond line\r\n");

        assert_eq!(record.banner, "hi there\r\nsecond line");
        assert_eq!(record.summary, "hi there");
    }

    #[test]
    fn test_http_identity() {
        let data = b"HTTP/1.1 200 OK\r\nServer: nginx/1.25.0\r\n\r\n";
        let response = HttpResponse::parse(data).unwrap();
        let request = HttpRequest::new("HEAD", "127.0.0.1", "/");

        let mut record = ServiceRecord::new(80, HostState::Open);
        record.apply_http(request, response);

        assert_eq!(record.service, "http (1.1)");
        assert_eq!(record.summary, "nginx 1.25.0");
        assert_eq!(record.banner, "nginx/1.25.0");
        assert!(record.response.is_some());
    }

    #[test]
    fn test_http_does_not_override_banner_identity() {
        let data = b"HTTP/1.1 200 OK\r\nServer: nginx/1.25.0\r\n\r\n";
        let response = HttpResponse::parse(data).unwrap();
        let request = HttpRequest::new("GET", "127.0.0.1", "/");

        let mut record = ServiceRecord::new(22, HostState::Open);
        record.parse_banner("ssh-2.0-openssh_9.3\r\n");
        record.apply_http(request, response);

        assert_eq!(record.service, "ssh (2.0)");
        assert_eq!(record.summary, "openssh 9.3");
        assert!(record.response.is_some());
    }

    #[test]
    fn test_catalog_fills_unidentified_record() {
        let catalog = ServiceCatalog::load().unwrap();

        let mut record = ServiceRecord::new(1, HostState::Closed);
        record.update_from_catalog(&catalog);

        assert_eq!(record.service, "tcpmux");
        assert_eq!(record.summary, "TCP Port Service Multiplexer");
        assert!(record.banner.is_empty());
    }

    #[test]
    fn test_catalog_keeps_banner_summary() {
        let catalog = ServiceCatalog::load().unwrap();

        let mut record = ServiceRecord::new(22, HostState::Open);
        record.parse_banner("hello\n");
        record.update_from_catalog(&catalog);

        // Name resolved from the catalog, banner summary retained
        assert_eq!(record.service, "ssh");
        assert_eq!(record.summary, "hello");
    }

    #[test]
    fn test_catalog_never_overwrites_identified_service() {
        let catalog = ServiceCatalog::load().unwrap();

        let mut record = ServiceRecord::new(22, HostState::Open);
        record.parse_banner("ssh-2.0-openssh_9.3\r\n");
        record.update_from_catalog(&catalog);

        assert_eq!(record.service, "ssh (2.0)");
        assert_eq!(record.summary, "openssh 9.3");
    }

    #[test]
    fn test_catalog_miss_yields_unknown() {
        let catalog = ServiceCatalog::load().unwrap();

        let mut record = ServiceRecord::new(64999, HostState::Closed);
        record.update_from_catalog(&catalog);

        assert_eq!(record.service, "unknown");
        assert!(record.summary.is_empty());
    }

    #[test]
    fn test_service_never_empty() {
        let catalog = ServiceCatalog::load().unwrap();

        for port in [1u16, 22, 80, 64999] {
            let mut record = ServiceRecord::new(port, HostState::Unknown);
            record.update_from_catalog(&catalog);
            assert!(!record.service.is_empty());
        }
    }

    #[test]
    fn test_tls_info_does_not_change_service() {
        let catalog = ServiceCatalog::load().unwrap();

        let mut record = ServiceRecord::new(443, HostState::Open);
        record.set_tls_info(TlsInfo {
            cipher_suite: "TLS13_AES_256_GCM_SHA384".to_string(),
            issuer: "CN=example.test".to_string(),
            subject: "CN=example.test".to_string(),
        });
        record.update_from_catalog(&catalog);

        assert_eq!(record.service, "https");
        assert!(record.tls_info.is_some());
    }

    #[test]
    fn test_details_block() {
        let data = b"HTTP/1.1 200 OK\r\nServer: nginx/1.25.0\r\nContent-Length: 2\r\n\r\nok";
        let response = HttpResponse::parse(data).unwrap();
        let request = HttpRequest::new("HEAD", "localhost", "/");

        let mut record = ServiceRecord::new(80, HostState::Open);
        record.apply_http(request, response);

        let details = record.details(false);

        assert!(details.starts_with("Details: 80/tcp"));
        assert!(details.contains("State    : open"));
        assert!(details.contains("Service  : http (1.1)"));
        assert!(details.contains("Request Method  : HEAD"));
        assert!(details.contains("Response Status  : 200"));
        assert!(details.contains("    Server: nginx/1.25.0"));
        assert!(details.contains("Response Body"));
    }

    #[test]
    fn test_details_block_omits_empty_sections() {
        let mut record = ServiceRecord::new(22, HostState::Open);
        record.parse_banner("ssh-2.0-openssh_9.3\r\n");

        let details = record.details(false);

        assert!(details.contains("Banner   : ssh-2.0-openssh_9.3"));
        assert!(!details.contains("Cipher Suite"));
        assert!(!details.contains("Request"));
    }

    #[test]
    fn test_eol_helpers() {
        assert_eq!(upto_last_eol("a\r\nb\r\n"), "a\r\nb");
        assert_eq!(upto_last_eol("a\nb\n"), "a\nb");
        assert_eq!(upto_last_eol("plain"), "plain");
        assert_eq!(upto_first_eol("a\r\nb"), "a");
        assert_eq!(upto_first_eol("plain"), "plain");
    }
}
