//! Query metrics and statistics.
//!
//! Tracks dispatch volume, outcomes, latency and abandoned calls.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Query metrics shared between the query system and its workers.
///
/// Uses atomics for lock-free access across threads. Workers only ever touch
/// the orphan counter.
#[derive(Debug, Default)]
pub struct QueryMetrics {
    /// Total number of queries handed to the pool
    dispatched: AtomicU64,

    /// Total number of responses accepted by a parser
    succeeded: AtomicU64,

    /// Client errors, parse errors and lost workers
    failed: AtomicU64,

    /// Queries abandoned or classified late because of the timeout
    timed_out: AtomicU64,

    /// Abandoned calls still executing on the pool
    orphaned: AtomicU64,

    /// Peak number of concurrent orphans observed
    peak_orphaned: AtomicU64,

    /// Sum of latencies of accepted responses, in nanoseconds
    total_latency_nanos: AtomicU64,
}

impl QueryMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_dispatch(&self) {
        self.dispatched.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_success(&self, latency: Duration) {
        self.succeeded.fetch_add(1, Ordering::Relaxed);
        self.total_latency_nanos
            .fetch_add(latency.as_nanos() as u64, Ordering::Relaxed);
    }

    pub(crate) fn record_failure(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_timeout(&self) {
        self.timed_out.fetch_add(1, Ordering::Relaxed);
    }

    /// An abandoned call is still running on a worker.
    pub(crate) fn orphan_started(&self) {
        let current = self.orphaned.fetch_add(1, Ordering::AcqRel) + 1;

        // Update peak using compare-and-swap loop
        let mut peak = self.peak_orphaned.load(Ordering::Relaxed);
        while current > peak {
            match self.peak_orphaned.compare_exchange_weak(
                peak,
                current,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(actual) => peak = actual,
            }
        }
    }

    /// An abandoned call has finished (or the abandonment was withdrawn).
    pub(crate) fn orphan_finished(&self) {
        self.orphaned.fetch_sub(1, Ordering::AcqRel);
    }

    pub fn dispatched(&self) -> u64 {
        self.dispatched.load(Ordering::Relaxed)
    }

    pub fn succeeded(&self) -> u64 {
        self.succeeded.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    pub fn timed_out(&self) -> u64 {
        self.timed_out.load(Ordering::Relaxed)
    }

    /// Abandoned calls still occupying a worker. Bounded by the pool size.
    pub fn orphaned(&self) -> u64 {
        self.orphaned.load(Ordering::Acquire)
    }

    pub fn peak_orphaned(&self) -> u64 {
        self.peak_orphaned.load(Ordering::Relaxed)
    }

    /// Calculates average latency of accepted responses.
    pub fn avg_latency(&self) -> Duration {
        let succeeded = self.succeeded.load(Ordering::Relaxed);
        if succeeded == 0 {
            Duration::ZERO
        } else {
            let total_nanos = self.total_latency_nanos.load(Ordering::Relaxed);
            Duration::from_nanos(total_nanos / succeeded)
        }
    }

    /// Creates a snapshot of all metrics for display/logging.
    ///
    /// Note: individual fields are read atomically but the snapshot as a
    /// whole may be inconsistent while workers are finishing.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            dispatched: self.dispatched(),
            succeeded: self.succeeded(),
            failed: self.failed(),
            timed_out: self.timed_out(),
            orphaned: self.orphaned(),
            peak_orphaned: self.peak_orphaned(),
            avg_latency: self.avg_latency(),
        }
    }
}

/// Snapshot of metrics at a point in time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub dispatched: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub timed_out: u64,
    pub orphaned: u64,
    pub peak_orphaned: u64,
    pub avg_latency: Duration,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn average_latency_covers_successes_only() {
        let metrics = QueryMetrics::new();
        assert_eq!(metrics.avg_latency(), Duration::ZERO);

        metrics.record_success(Duration::from_millis(10));
        metrics.record_success(Duration::from_millis(30));
        metrics.record_failure();

        assert_eq!(metrics.avg_latency(), Duration::from_millis(20));
        assert_eq!(metrics.failed(), 1);
    }

    #[test]
    fn orphan_peak_is_sticky() {
        let metrics = QueryMetrics::new();
        metrics.orphan_started();
        metrics.orphan_started();
        metrics.orphan_finished();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.orphaned, 1);
        assert_eq!(snapshot.peak_orphaned, 2);
    }
}
