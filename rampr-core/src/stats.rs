use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Instant, SystemTime};

use super::config::PhaseSpec;
use super::sample::RequestSample;

/// Error strings are truncated to this many characters before grouping, so a
/// run with thousands of distinct connection errors still summarizes cleanly.
const ERROR_GROUP_PREFIX: usize = 50;

/// Descriptive latency statistics in milliseconds. All zero when no samples
/// exist. Percentiles use the nearest-rank method: index `floor(n * p)` into
/// the sorted sequence, clamped to the last element, no interpolation.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LatencyStats {
    pub avg_ms: f64,
    pub min_ms: f64,
    pub max_ms: f64,
    pub p95_ms: f64,
    pub p99_ms: f64,
}

impl LatencyStats {
    fn from_sorted(sorted: &[f64]) -> Self {
        if sorted.is_empty() {
            return Self::default();
        }

        let sum: f64 = sorted.iter().sum();
        Self {
            avg_ms: sum / sorted.len() as f64,
            min_ms: sorted[0],
            max_ms: sorted[sorted.len() - 1],
            p95_ms: nearest_rank(sorted, 0.95),
            p99_ms: nearest_rank(sorted, 0.99),
        }
    }
}

fn nearest_rank(sorted: &[f64], p: f64) -> f64 {
    let idx = ((sorted.len() as f64) * p).floor() as usize;
    sorted[idx.min(sorted.len() - 1)]
}

/// Overall run quality. Bands are evaluated in order, first match wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumString)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    Excellent,
    Good,
    Fair,
    Poor,
}

impl Verdict {
    #[must_use]
    pub fn from_rates(success_rate_pct: f64, avg_latency_ms: f64) -> Self {
        if success_rate_pct >= 95.0 && avg_latency_ms <= 2000.0 {
            Self::Excellent
        } else if success_rate_pct >= 90.0 && avg_latency_ms <= 5000.0 {
            Self::Good
        } else if success_rate_pct >= 80.0 {
            Self::Fair
        } else {
            Self::Poor
        }
    }
}

/// Outcome of one completed phase. Owned by the phase controller once the
/// phase's virtual users have all joined.
#[derive(Debug, Clone)]
pub struct PhaseResult {
    pub spec: PhaseSpec,
    pub requests: u64,
    pub errors: u64,
    pub avg_latency_ms: f64,
    pub max_latency_ms: f64,
    /// Advisory only; never stops subsequent phases.
    pub unstable: bool,
    /// Completed request count per virtual user, in spawn order.
    pub vu_requests: Vec<u64>,
    pub samples: Vec<RequestSample>,
}

impl PhaseResult {
    #[must_use]
    pub fn error_rate_pct(&self) -> f64 {
        if self.requests == 0 {
            0.0
        } else {
            (self.errors as f64 / self.requests as f64) * 100.0
        }
    }
}

/// Phase-level instability: error rate above 10% or average latency above
/// 10 s. Intentionally independent from the run-level verdict bands.
#[must_use]
pub(crate) fn phase_is_unstable(requests: u64, errors: u64, avg_latency_ms: f64) -> bool {
    let error_rate = if requests == 0 {
        0.0
    } else {
        (errors as f64 / requests as f64) * 100.0
    };
    error_rate > 10.0 || avg_latency_ms > 10_000.0
}

/// The final run report, built once from all accumulated samples and handed to
/// the report sink. The core never prints or persists it.
#[derive(Debug, Clone)]
pub struct AggregateReport {
    pub total_requests: u64,
    pub total_success: u64,
    pub total_errors: u64,
    pub success_rate_pct: f64,
    pub requests_per_sec: f64,
    pub latency: LatencyStats,
    pub phases: Vec<PhaseResult>,
    pub verdict: Verdict,
    /// AND over all phases' stability flags.
    pub stable: bool,
    /// Transport error strings, truncated and counted, most frequent first.
    pub errors_by_kind: Vec<(String, u64)>,
    /// True when the run was cut short by cancellation.
    pub interrupted: bool,
    pub started_at: SystemTime,
    pub finished_at: SystemTime,
}

/// The only mutable state shared across virtual users. Appends are mutually
/// exclusive; existing samples are never mutated. Statistics are computed on
/// demand in [`MetricsAggregator::snapshot`] rather than incrementally.
#[derive(Debug, Default)]
pub struct MetricsAggregator {
    samples: Mutex<Vec<RequestSample>>,
    phases: Mutex<Vec<PhaseResult>>,
    total: AtomicU64,
    success: AtomicU64,
    errors: AtomicU64,
    started_wall: OnceLock<SystemTime>,
    started: OnceLock<Instant>,
}

impl MetricsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pin the run start for wall-clock and throughput accounting. Idempotent.
    pub fn mark_started(&self) {
        let _ = self.started_wall.set(SystemTime::now());
        let _ = self.started.set(Instant::now());
    }

    pub fn record(&self, sample: RequestSample) {
        self.total.fetch_add(1, Ordering::Relaxed);
        if sample.success {
            self.success.fetch_add(1, Ordering::Relaxed);
        } else {
            self.errors.fetch_add(1, Ordering::Relaxed);
        }

        let mut samples = self
            .samples
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        samples.push(sample);
    }

    pub fn total_requests(&self) -> u64 {
        self.total.load(Ordering::Relaxed)
    }

    pub fn len(&self) -> usize {
        self.samples
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Clone of all samples recorded at or after `start`. The phase controller
    /// uses this to compute phase-local statistics.
    pub fn samples_from(&self, start: usize) -> Vec<RequestSample> {
        let samples = self
            .samples
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        samples.get(start..).unwrap_or_default().to_vec()
    }

    pub fn push_phase(&self, result: PhaseResult) {
        let mut phases = self
            .phases
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        phases.push(result);
    }

    /// Build the full report from everything recorded so far. Safe to call at
    /// any point (including after cancellation, or with zero samples) and
    /// stable under repeated calls with no intervening `record`.
    pub fn snapshot(&self, interrupted: bool) -> AggregateReport {
        let total = self.total.load(Ordering::Relaxed);
        let success = self.success.load(Ordering::Relaxed);
        let errors = self.errors.load(Ordering::Relaxed);

        let (latency, errors_by_kind) = {
            let samples = self
                .samples
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());

            let mut latencies: Vec<f64> = samples.iter().map(|s| s.latency_ms).collect();
            latencies.sort_by(f64::total_cmp);

            (LatencyStats::from_sorted(&latencies), group_errors(&samples))
        };

        let phases = self
            .phases
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone();

        let success_rate_pct = if total == 0 {
            0.0
        } else {
            (success as f64 / total as f64) * 100.0
        };

        let started_at = self.started_wall.get().copied().unwrap_or_else(SystemTime::now);
        let elapsed_secs = self
            .started
            .get()
            .map(|s| s.elapsed().as_secs_f64())
            .unwrap_or(0.0);
        let requests_per_sec = if elapsed_secs > 0.0 {
            total as f64 / elapsed_secs
        } else {
            0.0
        };

        let stable = phases.iter().all(|p| !p.unstable);

        AggregateReport {
            total_requests: total,
            total_success: success,
            total_errors: errors,
            success_rate_pct,
            requests_per_sec,
            latency,
            verdict: Verdict::from_rates(success_rate_pct, latency.avg_ms),
            stable,
            phases,
            errors_by_kind,
            interrupted,
            started_at,
            finished_at: SystemTime::now(),
        }
    }
}

fn group_errors(samples: &[RequestSample]) -> Vec<(String, u64)> {
    let mut counts: HashMap<String, u64> = HashMap::new();
    for s in samples {
        let Some(err) = &s.error else { continue };
        let key: String = err.chars().take(ERROR_GROUP_PREFIX).collect();
        *counts.entry(key).or_insert(0) += 1;
    }

    let mut out: Vec<(String, u64)> = counts.into_iter().collect();
    out.sort_by(|(a_key, a_n), (b_key, b_n)| b_n.cmp(a_n).then_with(|| a_key.cmp(b_key)));
    out
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use std::sync::Arc;

    fn ok_sample(latency_ms: f64) -> RequestSample {
        RequestSample::status_response(Arc::from("s"), 200, latency_ms)
    }

    fn failed_sample(latency_ms: f64) -> RequestSample {
        RequestSample::status_response(Arc::from("s"), 500, latency_ms)
    }

    #[test]
    fn nearest_rank_reference_sequence() {
        // 100 samples: 10, 20, .., 1000.
        let agg = MetricsAggregator::new();
        for i in 1..=100 {
            agg.record(ok_sample((i * 10) as f64));
        }

        let report = agg.snapshot(false);
        assert_eq!(report.latency.p95_ms, 960.0);
        assert_eq!(report.latency.p99_ms, 1000.0);
        assert_eq!(report.latency.min_ms, 10.0);
        assert_eq!(report.latency.max_ms, 1000.0);
        assert_eq!(report.latency.avg_ms, 505.0);
    }

    #[test]
    fn nearest_rank_clamps_to_last_element() {
        let agg = MetricsAggregator::new();
        agg.record(ok_sample(5.0));
        let report = agg.snapshot(false);
        assert_eq!(report.latency.p95_ms, 5.0);
        assert_eq!(report.latency.p99_ms, 5.0);
    }

    #[test]
    fn empty_snapshot_is_all_zero() {
        let agg = MetricsAggregator::new();
        let report = agg.snapshot(false);
        assert_eq!(report.total_requests, 0);
        assert_eq!(report.latency, LatencyStats::default());
        assert_eq!(report.success_rate_pct, 0.0);
        assert_eq!(report.verdict, Verdict::Poor);
        assert!(report.stable);
    }

    #[test]
    fn snapshot_is_idempotent_without_new_records() {
        let agg = MetricsAggregator::new();
        for i in 0..50 {
            agg.record(ok_sample(10.0 + i as f64));
        }
        agg.record(failed_sample(99.0));

        let a = agg.snapshot(false);
        let b = agg.snapshot(false);
        assert_eq!(a.total_requests, b.total_requests);
        assert_eq!(a.total_success, b.total_success);
        assert_eq!(a.total_errors, b.total_errors);
        assert_eq!(a.latency, b.latency);
        assert_eq!(a.verdict, b.verdict);
        assert_eq!(a.errors_by_kind, b.errors_by_kind);
    }

    #[test]
    fn verdict_banding_reference_points() {
        assert_eq!(Verdict::from_rates(96.0, 1500.0), Verdict::Excellent);
        assert_eq!(Verdict::from_rates(92.0, 4000.0), Verdict::Good);
        assert_eq!(Verdict::from_rates(85.0, 1000.0), Verdict::Fair);
        assert_eq!(Verdict::from_rates(50.0, 100.0), Verdict::Poor);
    }

    #[test]
    fn verdict_banding_exact_cutoffs() {
        // Band edges are inclusive.
        assert_eq!(Verdict::from_rates(95.0, 2000.0), Verdict::Excellent);
        assert_eq!(Verdict::from_rates(95.0, 2001.0), Verdict::Good);
        assert_eq!(Verdict::from_rates(90.0, 5000.0), Verdict::Good);
        assert_eq!(Verdict::from_rates(90.0, 5001.0), Verdict::Fair);
        assert_eq!(Verdict::from_rates(80.0, 60_000.0), Verdict::Fair);
        assert_eq!(Verdict::from_rates(79.9, 1.0), Verdict::Poor);
    }

    #[test]
    fn instability_thresholds() {
        assert!(!phase_is_unstable(100, 10, 500.0)); // exactly 10% is stable
        assert!(phase_is_unstable(100, 11, 500.0));
        assert!(!phase_is_unstable(100, 0, 10_000.0)); // exactly 10s is stable
        assert!(phase_is_unstable(100, 0, 10_001.0));
        assert!(!phase_is_unstable(0, 0, 0.0));
    }

    #[test]
    fn success_and_error_counters_track_samples() {
        let agg = MetricsAggregator::new();
        for _ in 0..8 {
            agg.record(ok_sample(1.0));
        }
        agg.record(failed_sample(1.0));
        agg.record(RequestSample::transport_failure(
            Arc::from("s"),
            "request: connection refused".to_string(),
            1.0,
        ));

        let report = agg.snapshot(false);
        assert_eq!(report.total_requests, 10);
        assert_eq!(report.total_success, 8);
        assert_eq!(report.total_errors, 2);
        assert_eq!(report.success_rate_pct, 80.0);
    }

    #[test]
    fn errors_group_by_truncated_message() {
        let agg = MetricsAggregator::new();
        let long = "x".repeat(80);
        for _ in 0..3 {
            agg.record(RequestSample::transport_failure(
                Arc::from("s"),
                long.clone(),
                1.0,
            ));
        }
        agg.record(RequestSample::transport_failure(
            Arc::from("s"),
            "timeout: request timed out".to_string(),
            1.0,
        ));

        let report = agg.snapshot(false);
        assert_eq!(report.errors_by_kind.len(), 2);
        assert_eq!(report.errors_by_kind[0].0.len(), 50);
        assert_eq!(report.errors_by_kind[0].1, 3);
        assert_eq!(report.errors_by_kind[1].1, 1);
    }
}
