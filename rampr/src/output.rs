use crate::cli::OutputFormat;
use std::path::Path;

mod human;
mod json;

pub(crate) use json::JsonReport;

pub(crate) trait OutputFormatter: Send + Sync {
    fn print_header(&self, plan_path: &Path, plan: &rampr_core::LoadPlan);
    fn print_summary(&self, report: &rampr_core::AggregateReport) -> anyhow::Result<()>;
}

pub(crate) fn formatter(format: OutputFormat) -> Box<dyn OutputFormatter> {
    match format {
        OutputFormat::HumanReadable => Box::new(human::HumanReadableOutput),
        OutputFormat::Json => Box::new(json::JsonOutput),
    }
}
