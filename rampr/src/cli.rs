use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

fn parse_duration(input: &str) -> Result<Duration, String> {
    let s = input.trim();
    if s.is_empty() {
        return Err("duration cannot be empty (expected e.g. 10s, 250ms, 1m)".to_string());
    }

    let number_end = s
        .char_indices()
        .find(|(_, ch)| !ch.is_ascii_digit())
        .map_or(s.len(), |(idx, _)| idx);

    if number_end == 0 {
        return Err(format!(
            "invalid duration '{s}' (expected e.g. 10s, 250ms, 1m)"
        ));
    }

    let (number_str, unit_str) = s.split_at(number_end);
    let value: u64 = number_str
        .parse()
        .map_err(|_| format!("invalid duration '{s}' (expected e.g. 10s, 250ms, 1m)"))?;

    let unit = unit_str.trim();
    match unit {
        "" | "s" | "sec" | "secs" | "second" | "seconds" => Ok(Duration::from_secs(value)),
        "ms" | "msec" | "msecs" | "millisecond" | "milliseconds" => {
            Ok(Duration::from_millis(value))
        }
        "m" | "min" | "mins" | "minute" | "minutes" => {
            let secs = value
                .checked_mul(60)
                .ok_or_else(|| format!("duration '{s}' is too large"))?;
            Ok(Duration::from_secs(secs))
        }
        "h" | "hr" | "hrs" | "hour" | "hours" => {
            let secs = value
                .checked_mul(60)
                .and_then(|v| v.checked_mul(60))
                .ok_or_else(|| format!("duration '{s}' is too large"))?;
            Ok(Duration::from_secs(secs))
        }
        _ => Err(format!(
            "invalid duration '{s}' (expected e.g. 10s, 250ms, 1m)"
        )),
    }
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable report.
    HumanReadable,
    /// Emit the final report as a single JSON document on stdout.
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Profile {
    /// Single phase: 10 users for 30 seconds.
    Performance,
    /// Five escalating phases from warm-up to cool-down.
    Stress,
}

#[derive(Debug, Parser)]
#[command(
    name = "rampr",
    author,
    version,
    about = "HTTP load and stress measurement harness",
    long_about = "rampr drives weighted HTTP traffic at a target from a YAML plan.\n\nA plan names a base URL, a weighted scenario catalog and a sequence of phases (concurrent users for a duration). The run ends with a latency/error report and an overall verdict.",
    after_help = "Examples:\n  rampr init --profile stress\n  rampr run rampr.yaml\n  rampr run rampr.yaml --base-url http://localhost:8080 --seed 42\n  rampr run rampr.yaml --output json --out report.json"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run a load test plan
    #[command(
        long_about = "Run the phases of a YAML plan against its target.\n\nCLI flags override values from the plan file."
    )]
    Run(RunArgs),

    /// Scaffold a plan file for a built-in profile
    Init(InitArgs),
}

#[derive(Debug, Args)]
pub struct InitArgs {
    /// Target directory to initialize (created if missing)
    #[arg(default_value = ".")]
    pub dir: PathBuf,

    /// Overwrite an existing plan file
    #[arg(long)]
    pub force: bool,

    /// Phase profile to scaffold
    #[arg(long, value_enum, default_value_t = Profile::Performance)]
    pub profile: Profile,

    /// Plan filename to create in the target directory
    #[arg(long, default_value = "rampr.yaml")]
    pub file: String,
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Path to the plan (.yaml)
    pub plan: PathBuf,

    /// Override the plan's base URL
    #[arg(long)]
    pub base_url: Option<String>,

    /// Seed scenario selection for reproducible runs
    #[arg(long)]
    pub seed: Option<u64>,

    /// Override the delay between a virtual user's requests (e.g. 100ms)
    #[arg(long, value_parser = parse_duration)]
    pub pacing: Option<Duration>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::HumanReadable)]
    pub output: OutputFormat,

    /// Also write the JSON report to this file
    #[arg(long, value_name = "FILE")]
    pub out: Option<PathBuf>,
}
