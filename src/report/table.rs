/// Text table report generator
///
/// Formats the sorted service records as a plain space-padded table with
/// column widths computed from the widest cell in each column.

use crate::detection::ServiceRecord;

/// Column delimiter when the SUMMARY column is shown
const DELIM: &str = "   ";

/// Column delimiter when the SUMMARY column is hidden
const DELIM_NO_SUMMARY: &str = "    ";

/// Render the service table for the given target
///
/// Rows arrive sorted by port; the header row leads and is excluded from
/// the sort. The SUMMARY column disappears entirely when no record carries
/// a summary.
pub fn render(target: &str, records: &[ServiceRecord]) -> String {
    let mut output = String::new();

    if !target.is_empty() {
        let title = format!("Target: {}", target);
        output.push_str(&title);
        output.push('\n');
        output.push_str(&"-".repeat(title.len()));
        output.push('\n');
    }

    let hide_summary = records.iter().all(|record| record.summary.is_empty());
    let delim = if hide_summary { DELIM_NO_SUMMARY } else { DELIM };

    let mut rows: Vec<[String; 4]> = Vec::with_capacity(records.len() + 1);

    rows.push([
        "PORT".to_string(),
        "STATE".to_string(),
        "SERVICE".to_string(),
        if hide_summary { String::new() } else { "SUMMARY".to_string() },
    ]);

    for record in records {
        rows.push([
            record.port_str(),
            record.state.to_string(),
            record.service.clone(),
            record.summary.clone(),
        ]);
    }

    let widths = column_widths(&rows);

    for row in &rows {
        let line = format!(
            "{:<port$}{delim}{:<state$}{delim}{:<service$}{delim}{}",
            row[0],
            row[1],
            row[2],
            row[3],
            port = widths[0],
            state = widths[1],
            service = widths[2],
            delim = delim,
        );

        output.push_str(line.trim_end());
        output.push('\n');
    }

    output
}

/// Maximum content width per column across all rows
fn column_widths(rows: &[[String; 4]]) -> [usize; 4] {
    let mut widths = [0usize; 4];

    for row in rows {
        for (index, cell) in row.iter().enumerate() {
            widths[index] = widths[index].max(cell.chars().count());
        }
    }

    widths
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::HostState;

    fn record(port: u16, state: HostState, service: &str, summary: &str) -> ServiceRecord {
        let mut record = ServiceRecord::new(port, state);
        record.service = service.to_string();
        record.summary = summary.to_string();
        record
    }

    #[test]
    fn test_render_with_summaries() {
        let records = vec![
            record(22, HostState::Open, "ssh (2.0)", "openssh 9.3"),
            record(80, HostState::Open, "http (1.1)", "nginx 1.25.0"),
        ];

        let table = render("localhost", &records);
        let lines: Vec<&str> = table.lines().collect();

        assert_eq!(lines[0], "Target: localhost");
        assert_eq!(lines[1], "-----------------");
        assert!(lines[2].starts_with("PORT"));
        assert!(lines[2].contains("SUMMARY"));
        assert!(lines[3].starts_with("22/tcp"));
        assert!(lines[3].contains("openssh 9.3"));
        assert!(lines[4].starts_with("80/tcp"));
    }

    #[test]
    fn test_render_hides_empty_summary_column() {
        let records = vec![
            record(22, HostState::Closed, "ssh", ""),
            record(80, HostState::Closed, "http", ""),
        ];

        let table = render("localhost", &records);
        let header = table.lines().nth(2).unwrap();

        assert!(header.ends_with("SERVICE"));
        assert!(!table.contains("SUMMARY"));
    }

    #[test]
    fn test_columns_align_on_widest_cell() {
        let records = vec![
            record(1, HostState::Closed, "tcpmux", "TCP Port Service Multiplexer"),
            record(65535, HostState::Open, "unknown", ""),
        ];

        let table = render("host", &records);
        let lines: Vec<&str> = table.lines().collect();

        // STATE column starts at the same offset in every row
        let offset = lines[2].find("STATE").unwrap();
        assert_eq!(&lines[3][offset..offset + 6], "closed");
        assert_eq!(&lines[4][offset..offset + 4], "open");
    }

    #[test]
    fn test_no_trailing_whitespace() {
        let records = vec![record(1, HostState::Closed, "tcpmux", "")];
        let table = render("host", &records);

        for line in table.lines() {
            assert_eq!(line, line.trim_end());
        }
    }

    #[test]
    fn test_closed_ports_still_render() {
        let records = vec![record(9999, HostState::Unknown, "unknown", "")];
        let table = render("host", &records);

        assert!(table.contains("9999/tcp"));
        assert!(table.contains("unknown"));
    }
}
