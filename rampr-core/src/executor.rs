use std::time::Instant;

use bytes::Bytes;
use rampr_http::{HttpClient, HttpRequest};

use super::catalog::Scenario;
use super::config::LoadPlan;
use super::error::{Error, Result};
use super::sample::RequestSample;

/// The seam between the engine and the network. Virtual users and the phase
/// controller only see this trait; tests substitute a stub.
pub trait Execute: Send + Sync + 'static {
    /// Issue one request for `scenario`. All failures are captured in the
    /// returned sample; this never fails as an error.
    fn execute(&self, scenario: &Scenario) -> impl Future<Output = RequestSample> + Send;

    /// One reachability probe before any phase starts. The default is a no-op
    /// so stub executors pass pre-flight.
    fn preflight(&self, path: &str) -> impl Future<Output = Result<()>> + Send {
        let _ = path;
        async { Ok(()) }
    }
}

/// Real HTTP executor. Holds two clients because the load path and the health
/// probe use independent connect timeouts.
#[derive(Debug)]
pub struct RequestExecutor {
    client: HttpClient,
    probe_client: HttpClient,
    base_url: url::Url,
    total_timeout: std::time::Duration,
    probe_total_timeout: std::time::Duration,
}

impl RequestExecutor {
    pub fn new(plan: &LoadPlan) -> Self {
        Self {
            client: HttpClient::new(Some(plan.timeouts.connect)),
            probe_client: HttpClient::new(Some(plan.health_timeouts.connect)),
            base_url: plan.base_url.clone(),
            total_timeout: plan.timeouts.total,
            probe_total_timeout: plan.health_timeouts.total,
        }
    }

    /// Absolute URLs pass through verbatim; anything else resolves against the
    /// base URL.
    fn resolve(&self, target: &str) -> Result<String> {
        if target.starts_with("http://") || target.starts_with("https://") {
            return Ok(target.to_string());
        }

        self.base_url
            .join(target)
            .map(String::from)
            .map_err(|_| Error::InvalidTarget(target.to_string()))
    }
}

impl Execute for RequestExecutor {
    async fn execute(&self, scenario: &Scenario) -> RequestSample {
        let url = match self.resolve(&scenario.target) {
            Ok(url) => url,
            Err(_) => {
                return RequestSample::transport_failure(
                    scenario.name.clone(),
                    format!("invalid_url: {}", scenario.target),
                    0.0,
                );
            }
        };

        let req = HttpRequest {
            method: scenario.method.clone(),
            url,
            headers: scenario.headers.clone(),
            body: scenario.body.clone().unwrap_or_else(Bytes::new),
            timeout: Some(self.total_timeout),
        };

        let started = Instant::now();
        match self.client.request(req).await {
            Ok(res) => {
                let latency_ms = started.elapsed().as_secs_f64() * 1000.0;
                RequestSample::status_response(scenario.name.clone(), res.status, latency_ms)
            }
            Err(err) => {
                let latency_ms = started.elapsed().as_secs_f64() * 1000.0;
                RequestSample::transport_failure(
                    scenario.name.clone(),
                    format!("{}: {err}", err.transport_error_kind()),
                    latency_ms,
                )
            }
        }
    }

    async fn preflight(&self, path: &str) -> Result<()> {
        let url = self
            .resolve(path)
            .map_err(|_| Error::TargetUnavailable(format!("invalid health path `{path}`")))?;

        let req = HttpRequest::get(&url).with_timeout(self.probe_total_timeout);
        match self.probe_client.request(req).await {
            Ok(res) if (200..400).contains(&res.status) => Ok(()),
            Ok(res) => Err(Error::TargetUnavailable(format!(
                "health probe `{url}` returned status {}",
                res.status
            ))),
            Err(err) => Err(Error::TargetUnavailable(format!(
                "health probe `{url}` failed: {err}"
            ))),
        }
    }
}
