/// Console output helpers
///
/// Titled header blocks and labeled fields shared by the startup banner,
/// the scan summary, and error reporting. Color is applied through the
/// `colored` crate, which disables itself on non-VT output.

use colored::Colorize;

/// Render a title underlined with dashes
pub fn header(title: &str, colorize: bool) -> String {
    let underline = "-".repeat(title.len());

    if colorize {
        format!("{}\n{}", title.cyan().bold(), underline)
    } else {
        format!("{}\n{}", title, underline)
    }
}

/// Render a `Label : value` field line
pub fn field(label: &str, value: &str, colorize: bool) -> String {
    if colorize {
        format!("{} : {}", label.cyan(), value)
    } else {
        format!("{} : {}", label, value)
    }
}

/// Write a one-line error banner to the standard error stream
pub fn error_banner(message: &str) {
    eprintln!("{}", message.red().bold());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_underline_matches_title() {
        let rendered = header("Scan Summary", false);
        assert_eq!(rendered, "Scan Summary\n------------");
    }

    #[test]
    fn test_field_plain() {
        assert_eq!(field("Target", "localhost", false), "Target : localhost");
    }
}
