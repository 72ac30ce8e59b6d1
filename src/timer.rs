/// Scan duration timer
///
/// Pairs a monotonic clock for elapsed-duration measurement with a wall
/// clock for human-readable timestamps.

use chrono::{DateTime, Local};
use std::time::{Duration, Instant};

/// Timestamp format: date, time, and local time zone
const TIMESTAMP_FMT: &str = "%F %T %Z";

/// Monotonic + wall-clock scan timer
#[derive(Debug, Clone, Copy)]
pub struct Timer {
    steady_beg: Option<Instant>,
    steady_end: Option<Instant>,
    system_beg: Option<DateTime<Local>>,
    system_end: Option<DateTime<Local>>,
}

impl Timer {
    /// Create a new timer without starting it
    pub fn new() -> Self {
        Self {
            steady_beg: None,
            steady_end: None,
            system_beg: None,
            system_end: None,
        }
    }

    /// Start the timer, capturing both clocks
    pub fn start(&mut self) -> DateTime<Local> {
        let now = Local::now();

        self.steady_beg = Some(Instant::now());
        self.steady_end = None;
        self.system_beg = Some(now);
        self.system_end = None;

        now
    }

    /// Stop the timer, capturing both clocks
    pub fn stop(&mut self) -> DateTime<Local> {
        let now = Local::now();

        self.steady_end = Some(Instant::now());
        self.system_end = Some(now);

        now
    }

    /// Whether the timer has started and is currently running
    pub fn is_running(&self) -> bool {
        self.steady_beg.is_some() && self.steady_end.is_none()
    }

    /// Elapsed duration between start and stop (or now while running)
    pub fn elapsed(&self) -> Duration {
        match self.steady_beg {
            Some(beg) => self.steady_end.unwrap_or_else(Instant::now) - beg,
            None => Duration::ZERO,
        }
    }

    /// Format the elapsed duration as `[H hours, ]M min, S.mmm sec`,
    /// dropping the hour segment below one hour
    pub fn elapsed_str(&self) -> String {
        let mut ms = self.elapsed().as_millis();
        let mut result = String::new();

        let hours = ms / 3_600_000;

        if hours >= 1 {
            ms -= hours * 3_600_000;
            let noun = if hours < 2 { "hour" } else { "hours" };
            result.push_str(&format!("{} {}, ", hours, noun));
        }

        let minutes = ms / 60_000;
        ms -= minutes * 60_000;

        let seconds = ms / 1_000;
        ms -= seconds * 1_000;

        result.push_str(&format!("{} min, {}.{:03} sec", minutes, seconds, ms));
        result
    }

    /// Start time formatted as a local timestamp
    pub fn beg_timestamp(&self) -> String {
        Self::timestamp(self.system_beg.unwrap_or_else(Local::now))
    }

    /// End time formatted as a local timestamp (now while running)
    pub fn end_timestamp(&self) -> String {
        Self::timestamp(self.system_end.unwrap_or_else(Local::now))
    }

    /// Format a wall-clock time point as a date-time string
    pub fn timestamp(time: DateTime<Local>) -> String {
        time.format(TIMESTAMP_FMT).to_string()
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timer_lifecycle() {
        let mut timer = Timer::new();
        assert!(!timer.is_running());
        assert_eq!(timer.elapsed(), Duration::ZERO);

        timer.start();
        assert!(timer.is_running());

        std::thread::sleep(Duration::from_millis(10));
        timer.stop();

        assert!(!timer.is_running());
        assert!(timer.elapsed() >= Duration::from_millis(10));
    }

    #[test]
    fn test_elapsed_str_sub_hour() {
        let mut timer = Timer::new();
        timer.start();
        timer.stop();

        let formatted = timer.elapsed_str();
        assert!(formatted.contains("min,"));
        assert!(formatted.ends_with("sec"));
        assert!(!formatted.contains("hour"));
    }

    #[test]
    fn test_elapsed_str_zero() {
        let timer = Timer::new();
        assert_eq!(timer.elapsed_str(), "0 min, 0.000 sec");
    }

    #[test]
    fn test_timestamps_present() {
        let mut timer = Timer::new();
        timer.start();
        timer.stop();

        // "%F %T" yields at least "YYYY-MM-DD HH:MM:SS"
        assert!(timer.beg_timestamp().len() >= 19);
        assert!(timer.end_timestamp().len() >= 19);
    }
}
