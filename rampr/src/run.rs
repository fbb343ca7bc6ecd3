use std::path::Path;
use std::sync::Arc;

use anyhow::Context as _;

use crate::cli::RunArgs;
use crate::exit_codes::ExitCode;
use crate::output;
use crate::run_error::RunError;

pub async fn run(args: RunArgs) -> Result<ExitCode, RunError> {
    let out = output::formatter(args.output);

    let mut plan = crate::plan_yaml::load_plan_from_yaml(&args.plan)
        .await
        .map_err(RunError::InvalidInput)?;

    if let Some(raw) = &args.base_url {
        plan.base_url = parse_base_url(raw).map_err(RunError::InvalidInput)?;
    }
    if let Some(seed) = args.seed {
        plan.seed = Some(seed);
    }
    if let Some(pacing) = args.pacing {
        plan.pacing = pacing;
    }

    out.print_header(&args.plan, &plan);

    let cancel = Arc::new(rampr_core::CancelToken::new());
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                eprintln!("interrupt received, letting in-flight requests finish");
                cancel.cancel();
            }
        });
    }

    let executor = Arc::new(rampr_core::RequestExecutor::new(&plan));
    let metrics = Arc::new(rampr_core::MetricsAggregator::new());

    let report = rampr_core::run_phases(&plan, executor, metrics, cancel)
        .await
        .map_err(classify)?;

    out.print_summary(&report).map_err(RunError::RuntimeError)?;

    if let Some(path) = &args.out {
        write_report_json(path, &report)
            .await
            .map_err(RunError::RuntimeError)?;
    }

    Ok(if report.verdict == rampr_core::Verdict::Poor {
        ExitCode::PoorVerdict
    } else {
        ExitCode::Success
    })
}

fn classify(err: rampr_core::Error) -> RunError {
    if err.is_configuration() {
        RunError::InvalidInput(err.into())
    } else if matches!(err, rampr_core::Error::TargetUnavailable(_)) {
        RunError::TargetUnavailable(err.into())
    } else {
        RunError::RuntimeError(err.into())
    }
}

fn parse_base_url(raw: &str) -> anyhow::Result<url::Url> {
    let parsed = url::Url::parse(raw).with_context(|| format!("invalid --base-url: {raw}"))?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        anyhow::bail!("invalid --base-url (expected http or https): {raw}");
    }
    Ok(parsed)
}

async fn write_report_json(path: &Path, report: &rampr_core::AggregateReport) -> anyhow::Result<()> {
    let doc = output::JsonReport::from(report);
    let bytes = serde_json::to_vec_pretty(&doc).context("failed to serialize report")?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("failed to create report dir: {}", parent.display()))?;
    }

    tokio::fs::write(path, bytes)
        .await
        .with_context(|| format!("failed to write report: {}", path.display()))?;

    Ok(())
}
