use std::sync::Arc;
use std::time::Duration;

use super::catalog::{Scenario, ScenarioCatalog};
use super::error::{Error, Result};

/// Connect + total timeout pair for one request path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestTimeouts {
    pub connect: Duration,
    pub total: Duration,
}

impl RequestTimeouts {
    /// Defaults for load traffic.
    pub const fn load_default() -> Self {
        Self {
            connect: Duration::from_secs(5),
            total: Duration::from_secs(10),
        }
    }

    /// Defaults for the pre-flight health probe, tighter so an unreachable
    /// target fails the run quickly.
    pub const fn health_default() -> Self {
        Self {
            connect: Duration::from_secs(3),
            total: Duration::from_secs(5),
        }
    }
}

/// One time-boxed load segment with fixed concurrency.
#[derive(Debug, Clone)]
pub struct PhaseSpec {
    pub name: Arc<str>,
    pub concurrency: u32,
    pub duration: Duration,
}

impl PhaseSpec {
    pub fn new(name: &str, concurrency: u32, duration: Duration) -> Self {
        Self {
            name: Arc::from(name),
            concurrency,
            duration,
        }
    }
}

/// Full run configuration, validated at construction. Immutable for the run.
#[derive(Debug, Clone)]
pub struct LoadPlan {
    pub base_url: url::Url,
    pub catalog: ScenarioCatalog,
    pub phases: Vec<PhaseSpec>,
    /// Delay between a virtual user's requests.
    pub pacing: Duration,
    /// Pause between consecutive phases.
    pub phase_pause: Duration,
    pub timeouts: RequestTimeouts,
    pub health_timeouts: RequestTimeouts,
    /// Pre-flight probe path. `None` skips the probe.
    pub health_path: Option<String>,
    /// RNG seed for scenario selection. `None` seeds from entropy.
    pub seed: Option<u64>,
}

impl LoadPlan {
    pub fn new(base_url: &str, catalog: ScenarioCatalog, phases: Vec<PhaseSpec>) -> Result<Self> {
        let base_url = parse_base_url(base_url)?;

        if phases.is_empty() {
            return Err(Error::EmptyPhases);
        }
        for p in &phases {
            if p.concurrency == 0 {
                return Err(Error::InvalidConcurrency(p.name.to_string()));
            }
            if p.duration.is_zero() {
                return Err(Error::InvalidDuration(p.name.to_string()));
            }
        }

        Ok(Self {
            base_url,
            catalog,
            phases,
            pacing: Duration::from_millis(100),
            phase_pause: Duration::from_secs(5),
            timeouts: RequestTimeouts::load_default(),
            health_timeouts: RequestTimeouts::health_default(),
            health_path: None,
            seed: None,
        })
    }

    #[must_use]
    pub fn with_pacing(mut self, pacing: Duration) -> Self {
        self.pacing = pacing;
        self
    }

    #[must_use]
    pub fn with_phase_pause(mut self, pause: Duration) -> Self {
        self.phase_pause = pause;
        self
    }

    #[must_use]
    pub fn with_timeouts(mut self, timeouts: RequestTimeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    #[must_use]
    pub fn with_health_timeouts(mut self, timeouts: RequestTimeouts) -> Self {
        self.health_timeouts = timeouts;
        self
    }

    #[must_use]
    pub fn with_health_path(mut self, path: &str) -> Self {
        self.health_path = Some(path.to_string());
        self
    }

    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// The single-phase profile of the reference performance test:
    /// 10 users for 30 seconds with 100 ms pacing.
    pub fn performance(base_url: &str, catalog: ScenarioCatalog) -> Result<Self> {
        let phases = vec![PhaseSpec::new("load", 10, Duration::from_secs(30))];
        Self::new(base_url, catalog, phases).map(|p| p.with_pacing(Duration::from_millis(100)))
    }

    /// The five-phase stress profile: warm-up through cool-down.
    pub fn stress(base_url: &str, catalog: ScenarioCatalog) -> Result<Self> {
        let phases = vec![
            PhaseSpec::new("Warm-up", 5, Duration::from_secs(10)),
            PhaseSpec::new("Ramp-up", 20, Duration::from_secs(20)),
            PhaseSpec::new("Peak Load", 50, Duration::from_secs(30)),
            PhaseSpec::new("Stress Test", 100, Duration::from_secs(20)),
            PhaseSpec::new("Cool-down", 10, Duration::from_secs(10)),
        ];
        Self::new(base_url, catalog, phases).map(|p| {
            p.with_pacing(Duration::from_millis(50))
                .with_phase_pause(Duration::from_secs(5))
        })
    }

    /// The reference scenario mix used by the scaffolded plan.
    pub fn reference_catalog() -> Result<ScenarioCatalog> {
        ScenarioCatalog::new(vec![
            Scenario::get("health", "/actuator/health").weight(30),
            Scenario::get("tracking", "/api/transport/shipments/tracking/TRK123456789").weight(25),
            Scenario::get("routes", "/actuator/gateway/routes").weight(20),
            Scenario::get("discovery", "http://localhost:8761/eureka/apps").weight(15),
            Scenario::post_json(
                "login",
                "/api/auth/login",
                r#"{"username":"admin","password":"admin123"}"#,
            )
            .weight(10),
        ])
    }
}

fn parse_base_url(raw: &str) -> Result<url::Url> {
    if raw.trim().is_empty() {
        return Err(Error::InvalidBaseUrl(raw.to_string()));
    }

    let parsed = url::Url::parse(raw).map_err(|_| Error::InvalidBaseUrl(raw.to_string()))?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(Error::InvalidBaseUrl(raw.to_string()));
    }

    Ok(parsed)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    fn catalog() -> ScenarioCatalog {
        ScenarioCatalog::new(vec![Scenario::get("a", "/a")]).unwrap()
    }

    #[test]
    fn rejects_empty_base_url() {
        let err = LoadPlan::new("", catalog(), vec![PhaseSpec::new("p", 1, Duration::from_secs(1))])
            .unwrap_err();
        assert!(matches!(err, Error::InvalidBaseUrl(_)));
    }

    #[test]
    fn rejects_non_http_base_url() {
        let err = LoadPlan::new(
            "ftp://example.com",
            catalog(),
            vec![PhaseSpec::new("p", 1, Duration::from_secs(1))],
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidBaseUrl(_)));
    }

    #[test]
    fn rejects_empty_phase_list() {
        let err = LoadPlan::new("http://localhost:8080", catalog(), Vec::new()).unwrap_err();
        assert!(matches!(err, Error::EmptyPhases));
    }

    #[test]
    fn rejects_zero_concurrency() {
        let err = LoadPlan::new(
            "http://localhost:8080",
            catalog(),
            vec![PhaseSpec::new("p", 0, Duration::from_secs(1))],
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidConcurrency(_)));
    }

    #[test]
    fn rejects_zero_duration() {
        let err = LoadPlan::new(
            "http://localhost:8080",
            catalog(),
            vec![PhaseSpec::new("p", 1, Duration::ZERO)],
        )
        .unwrap_err();
        assert!(matches!(err, Error::InvalidDuration(_)));
    }

    #[test]
    fn stress_profile_has_five_ordered_phases() {
        let plan = LoadPlan::stress("http://localhost:8080", catalog()).unwrap();
        let names: Vec<&str> = plan.phases.iter().map(|p| &*p.name).collect();
        assert_eq!(
            names,
            ["Warm-up", "Ramp-up", "Peak Load", "Stress Test", "Cool-down"]
        );
        assert_eq!(plan.phases[3].concurrency, 100);
        assert_eq!(plan.phase_pause, Duration::from_secs(5));
    }

    #[test]
    fn configuration_errors_are_flagged_as_such() {
        assert!(Error::EmptyPhases.is_configuration());
        assert!(Error::InvalidBaseUrl(String::new()).is_configuration());
        assert!(!Error::TargetUnavailable(String::new()).is_configuration());
    }
}
