//! Wall-clock timing for limits and progress reports.

use std::time::{Duration, Instant};

/// Stopwatch started on construction.
#[derive(Debug, Clone)]
pub struct Timer {
    start: Instant,
    last_report: Instant,
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

impl Timer {
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            start: now,
            last_report: now,
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    pub fn elapsed_ms(&self) -> u64 {
        u64::try_from(self.elapsed().as_millis()).unwrap_or(u64::MAX)
    }

    /// Whether `limit_ms` (if any) has passed.
    pub fn exceeded(&self, limit_ms: Option<u64>) -> bool {
        limit_ms.map_or(false, |limit| self.elapsed_ms() >= limit)
    }

    /// True at most `frequency` times per second; resets the report clock when true.
    ///
    /// A frequency of zero or below never reports.
    pub fn report_due(&mut self, frequency: f64) -> bool {
        if frequency <= 0.0 || !frequency.is_finite() {
            return false;
        }
        let interval = Duration::from_secs_f64(1.0 / frequency);
        if self.last_report.elapsed() >= interval {
            self.last_report = Instant::now();
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limits() {
        let timer = Timer::new();
        assert!(!timer.exceeded(None));
        assert!(timer.exceeded(Some(0)));
        assert!(!timer.exceeded(Some(60_000)));
    }

    #[test]
    fn test_elapsed_ms_tracks_duration() {
        let timer = Timer::new();
        std::thread::sleep(Duration::from_millis(3));
        let ms = timer.elapsed_ms();
        assert!(ms >= 3);
        assert!(u128::from(ms) <= timer.elapsed().as_millis());
    }

    #[test]
    fn test_report_frequency() {
        let mut timer = Timer::new();
        assert!(!timer.report_due(0.0));
        assert!(!timer.report_due(1e-3));
        std::thread::sleep(Duration::from_millis(5));
        assert!(timer.report_due(1e6));
    }
}
