/// Port specification parsing
///
/// Expands textual port specifications (e.g. "22,80,1000-1010") into a
/// deduplicated sequence of port numbers, preserving first-seen order.

use crate::error::{ScanError, ScanResult};

/// Reserved null port, never valid for scanning
pub const PORT_NULL: u16 = 0;

/// Parse a port specification string
///
/// Each comma-separated token is either a single decimal port or an
/// inclusive `low-high` range. Port 0 is rejected as a single token and
/// silently skipped inside ranges. Duplicates across tokens are dropped
/// while keeping the first occurrence's position.
///
/// # Examples
/// ```
/// use svcprobe::ports::parse_port_spec;
///
/// let ports = parse_port_spec("22,80,1000-1002,80").unwrap();
/// assert_eq!(ports, vec![22, 80, 1000, 1001, 1002]);
/// ```
pub fn parse_port_spec(spec: &str) -> ScanResult<Vec<u16>> {
    let mut ports = Vec::new();
    let mut seen = std::collections::HashSet::new();

    if spec.trim().is_empty() {
        return Err(ScanError::invalid_ports(spec));
    }

    for token in spec.split(',') {
        let token = token.trim();

        if token.contains('-') {
            let (low, high) = parse_range(token)?;

            for port in low..=high {
                if port != PORT_NULL && seen.insert(port) {
                    ports.push(port);
                }
            }
        } else {
            let port = parse_port(token)?;

            if port == PORT_NULL {
                return Err(ScanError::invalid_ports(token));
            }

            if seen.insert(port) {
                ports.push(port);
            }
        }
    }

    Ok(ports)
}

/// Parse a single port token as a number in [0, 65535]
fn parse_port(token: &str) -> ScanResult<u16> {
    token
        .parse::<u16>()
        .map_err(|_| ScanError::invalid_ports(token))
}

/// Parse a range token, requiring both endpoints and `low <= high`
fn parse_range(token: &str) -> ScanResult<(u16, u16)> {
    let bounds: Vec<&str> = token.split('-').collect();

    if bounds.len() != 2 || bounds[0].is_empty() || bounds[1].is_empty() {
        return Err(ScanError::invalid_ports(token));
    }

    let low = parse_port(bounds[0])?;
    let high = parse_port(bounds[1])?;

    if low > high {
        return Err(ScanError::invalid_ports(token));
    }

    Ok((low, high))
}
