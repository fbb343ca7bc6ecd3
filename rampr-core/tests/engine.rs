//! Phase controller tests against stub executors, no network involved.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use rampr_core::{
    CancelToken, Error, Execute, LoadPlan, MetricsAggregator, PhaseSpec, RequestSample, Result,
    Scenario, ScenarioCatalog, Verdict, run_phases,
};

fn plan(phases: Vec<PhaseSpec>) -> LoadPlan {
    let catalog = ScenarioCatalog::new(vec![
        Scenario::get("a", "/a").weight(3),
        Scenario::get("b", "/b").weight(1),
    ])
    .unwrap();

    // The stub executors never touch the network, so the base URL is inert.
    LoadPlan::new("http://localhost:9", catalog, phases)
        .unwrap()
        .with_pacing(Duration::from_millis(5))
        .with_phase_pause(Duration::ZERO)
        .with_seed(7)
}

#[derive(Default)]
struct CountingStub {
    executed: AtomicU64,
}

impl Execute for CountingStub {
    async fn execute(&self, scenario: &Scenario) -> RequestSample {
        self.executed.fetch_add(1, Ordering::Relaxed);
        RequestSample::status_response(scenario.name.clone(), 200, 5.0)
    }
}

struct SlowStub;

impl Execute for SlowStub {
    async fn execute(&self, scenario: &Scenario) -> RequestSample {
        tokio::time::sleep(Duration::from_millis(20)).await;
        RequestSample::status_response(scenario.name.clone(), 200, 20.0)
    }
}

struct FailingPreflightStub;

impl Execute for FailingPreflightStub {
    async fn execute(&self, scenario: &Scenario) -> RequestSample {
        RequestSample::status_response(scenario.name.clone(), 200, 1.0)
    }

    async fn preflight(&self, path: &str) -> Result<()> {
        Err(Error::TargetUnavailable(format!("no listener at {path}")))
    }
}

/// Pattern ok, ok, http-500, transport-failure, repeating.
#[derive(Default)]
struct MixedOutcomeStub {
    n: AtomicU64,
}

impl Execute for MixedOutcomeStub {
    async fn execute(&self, scenario: &Scenario) -> RequestSample {
        match self.n.fetch_add(1, Ordering::Relaxed) % 4 {
            2 => RequestSample::status_response(scenario.name.clone(), 500, 3.0),
            3 => RequestSample::transport_failure(
                scenario.name.clone(),
                "connect: connection refused".to_string(),
                3.0,
            ),
            _ => RequestSample::status_response(scenario.name.clone(), 200, 3.0),
        }
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn every_executed_request_is_recorded_and_attributed() {
    let p = plan(vec![
        PhaseSpec::new("p1", 3, Duration::from_millis(200)),
        PhaseSpec::new("p2", 2, Duration::from_millis(200)),
    ]);

    let stub = Arc::new(CountingStub::default());
    let metrics = Arc::new(MetricsAggregator::new());
    let report = run_phases(&p, stub.clone(), metrics, Arc::new(CancelToken::new()))
        .await
        .unwrap_or_else(|e| panic!("run failed: {e}"));

    assert_eq!(report.total_requests, stub.executed.load(Ordering::Relaxed));
    assert_eq!(report.phases.len(), 2);

    for phase in &report.phases {
        let per_vu: u64 = phase.vu_requests.iter().sum();
        assert_eq!(per_vu, phase.requests, "phase {}", phase.spec.name);
        assert_eq!(phase.samples.len() as u64, phase.requests);
    }
    assert_eq!(report.phases[0].vu_requests.len(), 3);
    assert_eq!(report.phases[1].vu_requests.len(), 2);

    let phase_sum: u64 = report.phases.iter().map(|p| p.requests).sum();
    assert_eq!(phase_sum, report.total_requests);

    assert_eq!(report.total_success, report.total_requests);
    assert_eq!(report.total_errors, 0);
    assert_eq!(report.verdict, Verdict::Excellent);
    assert!(report.stable);
    assert!(!report.interrupted);
    assert!(report.errors_by_kind.is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn phase_request_count_tracks_duration_over_cycle_time() {
    // Each iteration costs a fixed 20ms execute plus 30ms pacing, so 10 users
    // over 2s should land near 10 * 2000 / 50 = 400 completed requests.
    let p = plan(vec![PhaseSpec::new("steady", 10, Duration::from_secs(2))])
        .with_pacing(Duration::from_millis(30));

    let metrics = Arc::new(MetricsAggregator::new());
    let report = run_phases(
        &p,
        Arc::new(SlowStub),
        metrics,
        Arc::new(CancelToken::new()),
    )
    .await
    .unwrap_or_else(|e| panic!("run failed: {e}"));

    let expected = 10.0 * 2000.0 / (20.0 + 30.0);
    let observed = report.total_requests as f64;
    let ratio = observed / expected;
    assert!(
        (0.7..=1.3).contains(&ratio),
        "expected ~{expected} requests, observed {observed} (ratio {ratio:.2})"
    );

    // No drops or duplicates under load.
    let per_vu: u64 = report.phases[0].vu_requests.iter().sum();
    assert_eq!(per_vu, report.total_requests);
}

#[tokio::test(flavor = "multi_thread")]
async fn cancellation_yields_partial_report_not_error() {
    let p = plan(vec![PhaseSpec::new("long", 4, Duration::from_secs(30))]);
    let cancel = Arc::new(CancelToken::new());
    let metrics = Arc::new(MetricsAggregator::new());

    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(300)).await;
            cancel.cancel();
        });
    }

    let started = Instant::now();
    let report = run_phases(&p, Arc::new(SlowStub), metrics, cancel)
        .await
        .unwrap_or_else(|e| panic!("run failed: {e}"));

    assert!(report.interrupted);
    assert!(report.total_requests > 0);
    // Nowhere near the 30s phase duration.
    assert!(started.elapsed() < Duration::from_secs(10));

    let phase = &report.phases[0];
    assert_eq!(phase.samples.len() as u64, phase.requests);
}

#[tokio::test(flavor = "multi_thread")]
async fn failed_preflight_aborts_before_any_traffic() {
    let p = plan(vec![PhaseSpec::new("p", 2, Duration::from_millis(200))])
        .with_health_path("/health");

    let metrics = Arc::new(MetricsAggregator::new());
    let err = run_phases(
        &p,
        Arc::new(FailingPreflightStub),
        metrics.clone(),
        Arc::new(CancelToken::new()),
    )
    .await
    .map(|_| ())
    .unwrap_err();

    assert!(matches!(err, Error::TargetUnavailable(_)));
    assert!(metrics.is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn mixed_outcomes_produce_error_rates_and_instability() {
    let p = plan(vec![PhaseSpec::new("p", 2, Duration::from_millis(300))]);

    let report = run_phases(
        &p,
        Arc::new(MixedOutcomeStub::default()),
        Arc::new(MetricsAggregator::new()),
        Arc::new(CancelToken::new()),
    )
    .await
    .unwrap_or_else(|e| panic!("run failed: {e}"));

    assert!(report.total_errors > 0);
    assert_eq!(
        report.total_success + report.total_errors,
        report.total_requests
    );

    // Half the traffic fails, far past the 10% stability bound.
    assert!(report.phases[0].unstable);
    assert!(!report.stable);
    assert!(report.phases[0].error_rate_pct() > 10.0);
    assert_eq!(report.verdict, Verdict::Poor);

    // Only transport failures carry error strings; HTTP 500s count toward the
    // error totals without appearing in the grouping.
    assert_eq!(report.errors_by_kind.len(), 1);
    assert_eq!(report.errors_by_kind[0].0, "connect: connection refused");
}
