/// Scan configuration
///
/// This module defines the immutable configuration record built by the
/// command-line parser and shared read-only by every scan task.

use crate::error::{ScanError, ScanResult};
use crate::net;
use lazy_static::lazy_static;
use regex::Regex;
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};
use std::time::Duration;

lazy_static! {
    /// Accepted HTTP URI characters, with `%`-encoded octets permitted
    static ref URI_REGEX: Regex =
        Regex::new(r"^([!#$&-;=?-\[\]_a-z~]|%[0-9a-fA-F]{2})+$").unwrap();
}

/// Immutable scan configuration shared by all worker tasks
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Hostname or IPv4 literal to scan
    pub target: String,
    /// Ordered, deduplicated port set
    pub ports: Vec<u16>,
    /// Concurrent scan task budget
    pub threads: usize,
    /// TCP connect deadline
    pub connect_timeout: Duration,
    /// Socket receive deadline
    pub recv_timeout: Duration,
    /// Socket send deadline
    pub send_timeout: Duration,
    /// HTTP request URI
    pub uri: String,
    /// Force an HTTP GET exchange on every open port
    pub curl: bool,
    /// Retry failed probes over TLS
    pub tls_enabled: bool,
    /// Print per-connection status lines
    pub verbose: bool,
    /// Emit the report as JSON instead of a text table
    pub out_json: bool,
    /// Optional report file path
    pub out_path: Option<PathBuf>,
    /// Executable path as invoked
    pub exe_path: String,
    /// Copy of the original command-line arguments
    pub argv: Vec<String>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            target: String::new(),
            ports: Vec::new(),
            threads: num_cpus::get().max(1),
            connect_timeout: Duration::from_millis(net::CONN_TIMEOUT_MS),
            recv_timeout: Duration::from_millis(net::RECV_TIMEOUT_MS),
            send_timeout: Duration::from_millis(net::SEND_TIMEOUT_MS),
            uri: net::URI_ROOT.to_string(),
            curl: false,
            tls_enabled: false,
            verbose: false,
            out_json: false,
            out_path: None,
            exe_path: String::new(),
            argv: Vec::new(),
        }
    }
}

impl ScanConfig {
    /// Validate the configured target, ports, URI, and output path
    pub fn validate(&self) -> ScanResult<()> {
        validate_target(&self.target)?;

        if self.ports.is_empty() {
            return Err(ScanError::invalid_ports(""));
        }

        if self.threads == 0 {
            return Err(ScanError::invalid_arg(
                "threads",
                "Thread count must be at least 1",
            ));
        }

        if !valid_uri(&self.uri) {
            return Err(ScanError::invalid_arg(
                "uri",
                format!("'{}' is not a valid HTTP URI", self.uri),
            ));
        }

        if let Some(path) = &self.out_path {
            validate_out_path(path)?;
        }

        Ok(())
    }

    /// Quoted report path for summary output
    pub fn quoted_out_path(&self) -> String {
        match &self.out_path {
            Some(path) => format!("'{}'", path.display()),
            None => String::new(),
        }
    }

    /// Quoted executable path for summary output
    pub fn quoted_exe_path(&self) -> String {
        format!("'{}'", self.exe_path)
    }
}

/// Normalize an HTTP URI argument, inserting the leading `/` when missing
pub fn normalize_uri(uri: &str) -> String {
    if uri.starts_with('/') {
        uri.to_string()
    } else {
        format!("/{}", uri)
    }
}

/// Determine whether the given string is a valid HTTP URI
pub fn valid_uri(uri: &str) -> bool {
    URI_REGEX.is_match(uri)
}

/// Validate the scan target: non-empty, and a well-formed address when it
/// is shaped like a dotted-quad IPv4 literal
fn validate_target(target: &str) -> ScanResult<()> {
    if target.is_empty() {
        return Err(ScanError::invalid_arg("target", "Target must not be empty"));
    }

    if ipv4_shaped(target) && target.parse::<Ipv4Addr>().is_err() {
        return Err(ScanError::invalid_arg(
            "target",
            format!("'{}' is not a valid IPv4 address", target),
        ));
    }

    Ok(())
}

/// Whether the string looks like a dotted-quad address (name resolution
/// handles everything else later)
fn ipv4_shaped(target: &str) -> bool {
    let octets: Vec<&str> = target.split('.').collect();
    octets.len() == 4 && octets.iter().all(|o| !o.is_empty() && o.chars().all(|c| c.is_ascii_digit()))
}

/// Validate a report output path: the parent must exist and the path must
/// not name a directory
fn validate_out_path(path: &Path) -> ScanResult<()> {
    if path.is_dir() {
        return Err(ScanError::file_path(
            path.display().to_string(),
            "Path names a directory",
        ));
    }

    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };

    if !parent.is_dir() {
        return Err(ScanError::file_path(
            path.display().to_string(),
            "Parent directory does not exist",
        ));
    }

    Ok(())
}
