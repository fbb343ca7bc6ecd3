use serde::Serialize;
use std::io::Write as _;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use super::OutputFormatter;

pub(crate) struct JsonOutput;

impl OutputFormatter for JsonOutput {
    fn print_header(&self, _plan_path: &Path, _plan: &rampr_core::LoadPlan) {}

    fn print_summary(&self, report: &rampr_core::AggregateReport) -> anyhow::Result<()> {
        let doc = JsonReport::from(report);
        let mut out = std::io::stdout().lock();
        serde_json::to_writer(&mut out, &doc)?;
        writeln!(out)?;
        Ok(())
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct JsonReport {
    pub kind: &'static str,
    pub total_requests: u64,
    pub total_success: u64,
    pub total_errors: u64,
    pub success_rate_pct: f64,
    pub requests_per_sec: f64,
    pub latency: JsonLatency,
    pub phases: Vec<JsonPhase>,
    pub errors_by_kind: Vec<JsonErrorGroup>,
    pub verdict: String,
    pub stable: bool,
    pub interrupted: bool,
    pub started_at_ms: u64,
    pub finished_at_ms: u64,
}

#[derive(Debug, Serialize)]
pub(crate) struct JsonLatency {
    pub avg_ms: f64,
    pub min_ms: f64,
    pub max_ms: f64,
    pub p95_ms: f64,
    pub p99_ms: f64,
}

#[derive(Debug, Serialize)]
pub(crate) struct JsonPhase {
    pub name: String,
    pub users: u32,
    pub duration_secs: f64,
    pub requests: u64,
    pub errors: u64,
    pub error_rate_pct: f64,
    pub avg_latency_ms: f64,
    pub max_latency_ms: f64,
    pub unstable: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct JsonErrorGroup {
    pub error: String,
    pub count: u64,
}

impl From<&rampr_core::AggregateReport> for JsonReport {
    fn from(report: &rampr_core::AggregateReport) -> Self {
        let phases = report
            .phases
            .iter()
            .map(|p| JsonPhase {
                name: p.spec.name.to_string(),
                users: p.spec.concurrency,
                duration_secs: p.spec.duration.as_secs_f64(),
                requests: p.requests,
                errors: p.errors,
                error_rate_pct: p.error_rate_pct(),
                avg_latency_ms: p.avg_latency_ms,
                max_latency_ms: p.max_latency_ms,
                unstable: p.unstable,
            })
            .collect();

        let errors_by_kind = report
            .errors_by_kind
            .iter()
            .map(|(error, count)| JsonErrorGroup {
                error: error.clone(),
                count: *count,
            })
            .collect();

        JsonReport {
            kind: "report",
            total_requests: report.total_requests,
            total_success: report.total_success,
            total_errors: report.total_errors,
            success_rate_pct: report.success_rate_pct,
            requests_per_sec: report.requests_per_sec,
            latency: JsonLatency {
                avg_ms: report.latency.avg_ms,
                min_ms: report.latency.min_ms,
                max_ms: report.latency.max_ms,
                p95_ms: report.latency.p95_ms,
                p99_ms: report.latency.p99_ms,
            },
            phases,
            errors_by_kind,
            verdict: report.verdict.to_string(),
            stable: report.stable,
            interrupted: report.interrupted,
            started_at_ms: epoch_ms(report.started_at),
            finished_at_ms: epoch_ms(report.finished_at),
        }
    }
}

fn epoch_ms(t: SystemTime) -> u64 {
    t.duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use serde_json::Value;
    use std::sync::Arc;

    fn sample_report() -> rampr_core::AggregateReport {
        let agg = rampr_core::MetricsAggregator::new();
        agg.mark_started();
        for i in 0..20 {
            agg.record(rampr_core::RequestSample::status_response(
                Arc::from("s"),
                200,
                10.0 + i as f64,
            ));
        }
        agg.record(rampr_core::RequestSample::transport_failure(
            Arc::from("s"),
            "timeout: request timed out".to_string(),
            500.0,
        ));
        agg.snapshot(false)
    }

    #[test]
    fn report_serializes_with_expected_shape() {
        let doc = JsonReport::from(&sample_report());
        let v: Value = serde_json::to_value(&doc).unwrap_or_else(|e| panic!("{e}"));

        assert_eq!(v.get("kind").and_then(Value::as_str), Some("report"));
        assert_eq!(
            v.get("total_requests").and_then(Value::as_u64),
            Some(21)
        );
        assert_eq!(v.get("total_errors").and_then(Value::as_u64), Some(1));
        assert!(v.pointer("/latency/p95_ms").and_then(Value::as_f64).is_some());
        assert_eq!(
            v.pointer("/errors_by_kind/0/count").and_then(Value::as_u64),
            Some(1)
        );
        assert!(v.get("verdict").and_then(Value::as_str).is_some());
        assert_eq!(v.get("interrupted").and_then(Value::as_bool), Some(false));
    }
}
