#![forbid(unsafe_code)]

mod cancel;
mod catalog;
mod config;
mod error;
mod executor;
mod run;
mod sample;
mod stats;
mod vu;

pub use http::Method;

pub use cancel::CancelToken;
pub use catalog::{Scenario, ScenarioCatalog};
pub use config::{LoadPlan, PhaseSpec, RequestTimeouts};
pub use error::{Error, Result};
pub use executor::{Execute, RequestExecutor};
pub use run::{run_phase, run_phases};
pub use sample::RequestSample;
pub use stats::{AggregateReport, LatencyStats, MetricsAggregator, PhaseResult, Verdict};
