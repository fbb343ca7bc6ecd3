use std::fmt::Write as _;
use std::path::Path;

use super::OutputFormatter;

pub(crate) struct HumanReadableOutput;

impl OutputFormatter for HumanReadableOutput {
    fn print_header(&self, plan_path: &Path, plan: &rampr_core::LoadPlan) {
        println!("plan: {}", plan_path.display());
        println!("target: {}", plan.base_url);
        println!(
            "scenarios: {} (total weight {})",
            plan.catalog.scenarios().len(),
            plan.catalog.total_weight()
        );
        for p in &plan.phases {
            println!(
                "phase: {} users={} duration={}",
                p.name,
                p.concurrency,
                humantime::format_duration(p.duration)
            );
        }
        println!();
    }

    fn print_summary(&self, report: &rampr_core::AggregateReport) -> anyhow::Result<()> {
        print!("{}", render(report));
        Ok(())
    }
}

fn render(report: &rampr_core::AggregateReport) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "==================== LOAD TEST REPORT ====================");
    let _ = writeln!(
        out,
        "requests:     {} (ok {}, failed {})",
        report.total_requests, report.total_success, report.total_errors
    );
    let _ = writeln!(out, "success rate: {:.2}%", report.success_rate_pct);
    let _ = writeln!(out, "throughput:   {:.2} req/s", report.requests_per_sec);
    let _ = writeln!(
        out,
        "latency (ms): avg={:.1} min={:.1} max={:.1} p95={:.1} p99={:.1}",
        report.latency.avg_ms,
        report.latency.min_ms,
        report.latency.max_ms,
        report.latency.p95_ms,
        report.latency.p99_ms
    );

    if !report.phases.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "phases:");
        for p in &report.phases {
            let _ = writeln!(
                out,
                "  {:<14} users={:<4} requests={:<7} errors={} ({:.2}%) avg={:.1}ms max={:.1}ms{}",
                p.spec.name,
                p.spec.concurrency,
                p.requests,
                p.errors,
                p.error_rate_pct(),
                p.avg_latency_ms,
                p.max_latency_ms,
                if p.unstable { "  [UNSTABLE]" } else { "" }
            );
        }
    }

    if !report.errors_by_kind.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "errors:");
        for (error, count) in &report.errors_by_kind {
            let _ = writeln!(out, "  {count}x {error}");
        }
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "verdict: {}", report.verdict);
    if !report.stable {
        let _ = writeln!(out, "warning: one or more phases were unstable");
    }
    if report.interrupted {
        let _ = writeln!(out, "note: run was interrupted; results are partial");
    }

    out
}
