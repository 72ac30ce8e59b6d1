/// Keypress-triggered progress reporting
///
/// Worker tasks call `poll` as their first action; when the user has
/// pressed a key since the last check, a completion-percentage line is
/// printed and the pending keystrokes are drained so one press yields one
/// report.

use std::time::Duration;
use tracing::debug;

/// Progress reporter over a fixed task total
#[derive(Debug, Clone, Copy)]
pub struct ProgressReporter {
    total: usize,
}

impl ProgressReporter {
    pub fn new(total: usize) -> Self {
        Self { total }
    }

    /// Print a progress summary when a key was pressed and any task has
    /// completed
    pub fn poll(&self, completed: usize) {
        if !key_pressed() {
            return;
        }

        if completed > 0 {
            println!("{}", self.progress_line(completed));
        }

        drain_keys();
    }

    /// `Approximately P% complete (R ports remaining)`
    pub fn progress_line(&self, completed: usize) -> String {
        let percentage = if self.total > 0 {
            completed as f64 / self.total as f64 * 100.0
        } else {
            0.0
        };

        let remaining = self.total.saturating_sub(completed);
        let noun = if remaining == 1 { "port" } else { "ports" };

        format!(
            "Approximately {:.1}% complete ({} {} remaining)",
            percentage, remaining, noun
        )
    }
}

/// Non-blocking check of the terminal input buffer
fn key_pressed() -> bool {
    crossterm::event::poll(Duration::from_millis(0)).unwrap_or(false)
}

/// Discard all pending input events
fn drain_keys() {
    while crossterm::event::poll(Duration::from_millis(0)).unwrap_or(false) {
        if let Err(e) = crossterm::event::read() {
            debug!("Failed to drain input event: {}", e);
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_line_format() {
        let reporter = ProgressReporter::new(8);
        assert_eq!(
            reporter.progress_line(2),
            "Approximately 25.0% complete (6 ports remaining)"
        );
    }

    #[test]
    fn test_progress_line_one_decimal() {
        let reporter = ProgressReporter::new(3);
        assert_eq!(
            reporter.progress_line(1),
            "Approximately 33.3% complete (2 ports remaining)"
        );
    }

    #[test]
    fn test_progress_line_singular_port() {
        let reporter = ProgressReporter::new(4);
        assert_eq!(
            reporter.progress_line(3),
            "Approximately 75.0% complete (1 port remaining)"
        );
    }

    #[test]
    fn test_progress_line_complete() {
        let reporter = ProgressReporter::new(2);
        assert_eq!(
            reporter.progress_line(2),
            "Approximately 100.0% complete (0 ports remaining)"
        );
    }

    #[test]
    fn test_progress_line_empty_total() {
        let reporter = ProgressReporter::new(0);
        assert_eq!(
            reporter.progress_line(0),
            "Approximately 0.0% complete (0 ports remaining)"
        );
    }
}
