use std::sync::Arc;
use std::time::Instant;

use super::cancel::CancelToken;
use super::config::{LoadPlan, PhaseSpec};
use super::error::Result;
use super::executor::Execute;
use super::stats::{AggregateReport, MetricsAggregator, PhaseResult, phase_is_unstable};
use super::vu::{VuContext, run_vu};

/// Run the plan's phases strictly in order and return the final report.
///
/// Pre-flight runs first (when a health path is configured) and aborts the
/// whole run before any phase if the target is unreachable. Cancellation
/// between iterations stops new traffic promptly; the report built from the
/// samples recorded so far is returned with `interrupted` set, never an error.
pub async fn run_phases<E: Execute>(
    plan: &LoadPlan,
    executor: Arc<E>,
    metrics: Arc<MetricsAggregator>,
    cancel: Arc<CancelToken>,
) -> Result<AggregateReport> {
    if let Some(path) = &plan.health_path {
        executor.preflight(path).await?;
    }

    metrics.mark_started();
    let seed = plan.seed.unwrap_or_else(|| fastrand::u64(..));

    let last = plan.phases.len().saturating_sub(1);
    let mut next_vu_id = 1u64;

    for (idx, spec) in plan.phases.iter().enumerate() {
        if cancel.is_cancelled() {
            break;
        }

        let result =
            run_phase_inner(plan, spec, &executor, &metrics, &cancel, next_vu_id, seed).await?;
        next_vu_id = next_vu_id.saturating_add(u64::from(spec.concurrency));
        metrics.push_phase(result);

        if idx != last && !plan.phase_pause.is_zero() && !cancel.is_cancelled() {
            tokio::select! {
                () = tokio::time::sleep(plan.phase_pause) => {}
                () = cancel.cancelled() => {}
            }
        }
    }

    Ok(metrics.snapshot(cancel.is_cancelled()))
}

/// Run a single phase: spawn `spec.concurrency` virtual users, wait for every
/// one of them to finish (barrier semantics), then derive phase statistics
/// from this phase's own samples.
pub async fn run_phase<E: Execute>(
    plan: &LoadPlan,
    spec: &PhaseSpec,
    executor: Arc<E>,
    metrics: Arc<MetricsAggregator>,
    cancel: Arc<CancelToken>,
) -> Result<PhaseResult> {
    let seed = plan.seed.unwrap_or_else(|| fastrand::u64(..));
    run_phase_inner(plan, spec, &executor, &metrics, &cancel, 1, seed).await
}

async fn run_phase_inner<E: Execute>(
    plan: &LoadPlan,
    spec: &PhaseSpec,
    executor: &Arc<E>,
    metrics: &Arc<MetricsAggregator>,
    cancel: &Arc<CancelToken>,
    first_vu_id: u64,
    seed: u64,
) -> Result<PhaseResult> {
    let phase_start = metrics.len();
    let stop_at = Instant::now() + spec.duration;

    let mut handles = Vec::with_capacity(spec.concurrency as usize);
    for offset in 0..u64::from(spec.concurrency) {
        let vu_id = first_vu_id.saturating_add(offset);
        let ctx = VuContext {
            catalog: plan.catalog.clone(),
            executor: executor.clone(),
            metrics: metrics.clone(),
            cancel: cancel.clone(),
            pacing: plan.pacing,
            stop_at,
            rng: fastrand::Rng::with_seed(seed.wrapping_add(vu_id)),
        };
        handles.push(tokio::spawn(run_vu(ctx)));
    }

    let mut vu_requests = Vec::with_capacity(handles.len());
    for h in handles {
        vu_requests.push(h.await?);
    }

    let samples = metrics.samples_from(phase_start);
    let requests = samples.len() as u64;
    let errors = samples.iter().filter(|s| !s.success).count() as u64;

    let (avg_latency_ms, max_latency_ms) = if samples.is_empty() {
        (0.0, 0.0)
    } else {
        let sum: f64 = samples.iter().map(|s| s.latency_ms).sum();
        let max = samples
            .iter()
            .map(|s| s.latency_ms)
            .fold(f64::MIN, f64::max);
        (sum / samples.len() as f64, max)
    };

    Ok(PhaseResult {
        spec: spec.clone(),
        requests,
        errors,
        avg_latency_ms,
        max_latency_ms,
        unstable: phase_is_unstable(requests, errors, avg_latency_ms),
        vu_requests,
        samples,
    })
}
