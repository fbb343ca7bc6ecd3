//! End-to-end runs against a local HTTP server.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use rampr_core::{
    CancelToken, Error, LoadPlan, MetricsAggregator, PhaseSpec, RequestExecutor, Scenario,
    ScenarioCatalog, run_phases,
};
use rampr_testserver::TestServer;

fn plan_for(base_url: &str, scenarios: Vec<Scenario>, phase: PhaseSpec) -> LoadPlan {
    let catalog = ScenarioCatalog::new(scenarios).unwrap();
    LoadPlan::new(base_url, catalog, vec![phase])
        .unwrap()
        .with_pacing(Duration::from_millis(10))
        .with_phase_pause(Duration::ZERO)
        .with_seed(11)
}

async fn run(plan: &LoadPlan) -> rampr_core::Result<rampr_core::AggregateReport> {
    let executor = Arc::new(RequestExecutor::new(plan));
    run_phases(
        plan,
        executor,
        Arc::new(MetricsAggregator::new()),
        Arc::new(CancelToken::new()),
    )
    .await
}

#[tokio::test(flavor = "multi_thread")]
async fn e2e_load_run_reaches_server_and_reports_success() {
    let server = TestServer::start().await.unwrap();

    let plan = plan_for(
        server.base_url(),
        vec![Scenario::get("fast", "/fast")],
        PhaseSpec::new("load", 3, Duration::from_millis(400)),
    )
    .with_health_path("/health");

    let report = run(&plan).await.unwrap_or_else(|e| panic!("run failed: {e}"));

    let seen = server.stats().requests_total();
    let health = server.stats().health_total();
    server.shutdown().await;

    assert!(report.total_requests > 0);
    assert_eq!(report.total_errors, 0);
    assert!(!report.interrupted);
    assert_eq!(health, 1, "exactly one pre-flight probe");
    assert_eq!(seen, report.total_requests + health);
    assert!(report.requests_per_sec > 0.0);
}

#[tokio::test(flavor = "multi_thread")]
async fn e2e_post_json_sends_content_type() {
    let server = TestServer::start().await.unwrap();

    let plan = plan_for(
        server.base_url(),
        vec![Scenario::post_json("echo", "/echo", r#"{"k":"v"}"#)],
        PhaseSpec::new("load", 2, Duration::from_millis(200)),
    );

    let report = run(&plan).await.unwrap_or_else(|e| panic!("run failed: {e}"));

    let saw_ct = server.stats().saw_json_content_type();
    server.shutdown().await;

    assert_eq!(report.total_errors, 0);
    assert!(saw_ct > 0, "expected application/json content-type");
}

#[tokio::test(flavor = "multi_thread")]
async fn e2e_http_500s_count_as_errors_with_status() {
    let server = TestServer::start().await.unwrap();

    let plan = plan_for(
        server.base_url(),
        vec![Scenario::get("flaky", "/flaky")],
        PhaseSpec::new("load", 2, Duration::from_millis(400)),
    );

    let report = run(&plan).await.unwrap_or_else(|e| panic!("run failed: {e}"));
    server.shutdown().await;

    assert!(report.total_errors > 0);
    assert!(report.total_success > 0);
    assert!(
        report.phases[0]
            .samples
            .iter()
            .any(|s| s.status == Some(500) && !s.success)
    );
    // Roughly every other request fails, well past the stability bound.
    assert!(!report.stable);
}

#[tokio::test(flavor = "multi_thread")]
async fn e2e_latency_reflects_server_delay() {
    let server = TestServer::start().await.unwrap();

    let plan = plan_for(
        server.base_url(),
        vec![Scenario::get("slow", "/slow")],
        PhaseSpec::new("load", 1, Duration::from_millis(400)),
    )
    .with_pacing(Duration::ZERO);

    let report = run(&plan).await.unwrap_or_else(|e| panic!("run failed: {e}"));
    server.shutdown().await;

    assert!(report.total_requests > 0);
    // The endpoint sleeps 150ms per request.
    assert!(
        report.latency.min_ms >= 100.0,
        "min latency {} below server delay",
        report.latency.min_ms
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn e2e_missing_health_endpoint_fails_preflight() {
    let server = TestServer::start().await.unwrap();

    let plan = plan_for(
        server.base_url(),
        vec![Scenario::get("fast", "/fast")],
        PhaseSpec::new("load", 2, Duration::from_millis(200)),
    )
    .with_health_path("/definitely-not-here");

    let err = run(&plan).await.map(|_| ()).unwrap_err();

    let seen = server.stats().requests_total();
    server.shutdown().await;

    assert!(matches!(err, Error::TargetUnavailable(_)));
    assert_eq!(seen, 0, "no load traffic after a failed probe");
}
