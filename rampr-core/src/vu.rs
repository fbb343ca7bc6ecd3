use std::sync::Arc;
use std::time::{Duration, Instant};

use super::cancel::CancelToken;
use super::catalog::ScenarioCatalog;
use super::executor::Execute;
use super::stats::MetricsAggregator;

/// Everything one virtual user needs; owned so the task is `'static`.
/// The user's RNG is derived from the plan seed and its id, so seeded runs
/// have stable per-user scenario streams.
pub(crate) struct VuContext<E> {
    pub catalog: ScenarioCatalog,
    pub executor: Arc<E>,
    pub metrics: Arc<MetricsAggregator>,
    pub cancel: Arc<CancelToken>,
    pub pacing: Duration,
    pub stop_at: Instant,
    pub rng: fastrand::Rng,
}

/// One simulated client: select a scenario, execute it, record the sample,
/// pace, repeat until the deadline. The stop/cancel check happens only between
/// iterations, so an in-flight request always completes.
///
/// Returns the number of completed requests for this user.
pub(crate) async fn run_vu<E: Execute>(mut ctx: VuContext<E>) -> u64 {
    let mut completed = 0u64;

    while Instant::now() < ctx.stop_at && !ctx.cancel.is_cancelled() {
        let scenario = ctx.catalog.pick(&mut ctx.rng);
        let sample = ctx.executor.execute(scenario).await;
        ctx.metrics.record(sample);
        completed = completed.saturating_add(1);

        if !ctx.pacing.is_zero() {
            // Pacing delay, cut short by cancellation so shutdown is prompt.
            tokio::select! {
                () = tokio::time::sleep(ctx.pacing) => {}
                () = ctx.cancel.cancelled() => {}
            }
        }
    }

    completed
}
