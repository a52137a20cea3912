// Scan station metrics
//
// Lightweight counters for what the station did during one run

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Station counters
///
/// Uses atomic operations so the decoder pump, manual entry and resume timers can all
/// record without locks. Logged once at shutdown.
#[derive(Debug)]
pub struct ScanMetrics {
    /// Decoded payloads accepted for lookup
    pub decodes_accepted: AtomicU64,

    /// Decoded payloads dropped because a lookup was already pending
    pub decodes_ignored: AtomicU64,

    /// Frames with no readable code
    pub decode_noise: AtomicU64,

    pub lookups_found: AtomicU64,
    pub lookups_not_found: AtomicU64,
    pub lookups_failed: AtomicU64,

    pub manual_submissions: AtomicU64,
    pub manual_rejections: AtomicU64,

    /// Decoder resumes actually performed
    pub resumes: AtomicU64,

    start_time: Instant,
}

impl ScanMetrics {
    pub fn new() -> Self {
        Self {
            decodes_accepted: AtomicU64::new(0),
            decodes_ignored: AtomicU64::new(0),
            decode_noise: AtomicU64::new(0),
            lookups_found: AtomicU64::new(0),
            lookups_not_found: AtomicU64::new(0),
            lookups_failed: AtomicU64::new(0),
            manual_submissions: AtomicU64::new(0),
            manual_rejections: AtomicU64::new(0),
            resumes: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn record_decode_accepted(&self) {
        self.decodes_accepted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_decode_ignored(&self) {
        self.decodes_ignored.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_decode_noise(&self) {
        self.decode_noise.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_lookup_found(&self) {
        self.lookups_found.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_lookup_not_found(&self) {
        self.lookups_not_found.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_lookup_failed(&self) {
        self.lookups_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_manual_submission(&self) {
        self.manual_submissions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_manual_rejection(&self) {
        self.manual_rejections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_resume(&self) {
        self.resumes.fetch_add(1, Ordering::Relaxed);
    }

    /// Lookups that got an answer or a classified failure
    pub fn lookups_total(&self) -> u64 {
        self.lookups_found.load(Ordering::Relaxed)
            + self.lookups_not_found.load(Ordering::Relaxed)
            + self.lookups_failed.load(Ordering::Relaxed)
    }

    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Log metrics summary
    pub fn log_summary(&self) {
        tracing::info!("=== Scan Station Summary ===");
        tracing::info!("Uptime: {:.2}s", self.uptime().as_secs_f64());
        tracing::info!(
            "Decoder: {} accepted, {} ignored while busy, {} noise frames",
            self.decodes_accepted.load(Ordering::Relaxed),
            self.decodes_ignored.load(Ordering::Relaxed),
            self.decode_noise.load(Ordering::Relaxed)
        );
        tracing::info!(
            "Lookups: {} found, {} not found, {} failed",
            self.lookups_found.load(Ordering::Relaxed),
            self.lookups_not_found.load(Ordering::Relaxed),
            self.lookups_failed.load(Ordering::Relaxed)
        );
        tracing::info!(
            "Manual entry: {} submitted, {} rejected locally; {} resumes",
            self.manual_submissions.load(Ordering::Relaxed),
            self.manual_rejections.load(Ordering::Relaxed),
            self.resumes.load(Ordering::Relaxed)
        );
    }
}

impl Default for ScanMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_metrics_creation() {
        let metrics = ScanMetrics::new();
        assert_eq!(metrics.decodes_accepted.load(Ordering::Relaxed), 0);
        assert_eq!(metrics.lookups_total(), 0);
    }

    #[test]
    fn test_record_lookups() {
        let metrics = ScanMetrics::new();

        metrics.record_lookup_found();
        metrics.record_lookup_found();
        metrics.record_lookup_not_found();
        metrics.record_lookup_failed();

        assert_eq!(metrics.lookups_found.load(Ordering::Relaxed), 2);
        assert_eq!(metrics.lookups_total(), 4);
    }

    #[test]
    fn test_decoder_and_manual_counters() {
        let metrics = ScanMetrics::new();

        metrics.record_decode_accepted();
        metrics.record_decode_ignored();
        metrics.record_decode_noise();
        metrics.record_manual_submission();
        metrics.record_manual_rejection();
        metrics.record_resume();

        assert_eq!(metrics.decodes_accepted.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.decodes_ignored.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.decode_noise.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.manual_submissions.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.manual_rejections.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.resumes.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_uptime() {
        let metrics = ScanMetrics::new();
        thread::sleep(Duration::from_millis(10));
        assert!(metrics.uptime().as_millis() >= 10);
    }
}
