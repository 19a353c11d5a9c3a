//! Progress tracking with ETA estimation

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::info;

/// Thread-safe progress tracker for batch runs
pub struct ProgressTracker {
    total: u64,
    processed: AtomicU64,
    failed: AtomicU64,
    start_time: Instant,
    label: String,
}

impl ProgressTracker {
    /// Creates a new progress tracker
    pub fn new(total: u64, label: &str) -> Self {
        Self {
            total,
            processed: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            start_time: Instant::now(),
            label: label.to_string(),
        }
    }

    /// Records one finished item and logs progress every `report_interval`
    /// items and on the last one
    pub fn record(&self, succeeded: bool, report_interval: u64) {
        if !succeeded {
            self.failed.fetch_add(1, Ordering::Relaxed);
        }
        let current = self.processed.fetch_add(1, Ordering::Relaxed) + 1;
        if current % report_interval.max(1) == 0 || current == self.total {
            self.report(current);
        }
    }

    pub fn processed(&self) -> u64 {
        self.processed.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    fn report(&self, current: u64) {
        let elapsed = self.elapsed().as_secs_f64();
        let failed = self.failed();

        if current < self.total {
            let rate = current as f64 / elapsed.max(f64::EPSILON);
            let remaining = (self.total - current) as f64 / rate;
            info!(
                label = %self.label,
                current,
                total = self.total,
                failed,
                elapsed = %format_duration(elapsed),
                eta = %format_duration(remaining),
                "progress"
            );
        } else {
            info!(
                label = %self.label,
                total = self.total,
                failed,
                elapsed = %format_duration(elapsed),
                "completed"
            );
        }
    }
}

/// Formats seconds as `1.5s`, `2m 3s` or `1h 2m 3s`
pub fn format_duration(secs: f64) -> String {
    if secs < 60.0 {
        return format!("{:.1}s", secs);
    }
    let whole = secs.round() as u64;
    let (hours, mins, rest) = (whole / 3600, (whole % 3600) / 60, whole % 60);
    if hours == 0 {
        format!("{}m {}s", mins, rest)
    } else {
        format!("{}h {}m {}s", hours, mins, rest)
    }
}
