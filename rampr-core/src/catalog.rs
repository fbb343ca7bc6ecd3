use std::sync::Arc;

use bytes::Bytes;

use super::error::{Error, Result};

/// A weighted request template. `target` is either a path resolved against the
/// plan's base URL or an absolute http(s) URL used verbatim.
#[derive(Debug, Clone)]
pub struct Scenario {
    pub name: Arc<str>,
    pub method: http::Method,
    pub target: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Bytes>,
    pub weight: u32,
}

impl Scenario {
    pub fn get(name: &str, target: &str) -> Self {
        Self {
            name: Arc::from(name),
            method: http::Method::GET,
            target: target.to_string(),
            headers: Vec::new(),
            body: None,
            weight: 1,
        }
    }

    pub fn post_json(name: &str, target: &str, body: &str) -> Self {
        Self {
            name: Arc::from(name),
            method: http::Method::POST,
            target: target.to_string(),
            headers: vec![("content-type".to_string(), "application/json".to_string())],
            body: Some(Bytes::from(body.to_string())),
            weight: 1,
        }
    }

    /// Build a scenario from a method name, for plan files where the method is
    /// free text.
    pub fn request(name: &str, method: &str, target: &str) -> Result<Self> {
        let method = http::Method::from_bytes(method.to_ascii_uppercase().as_bytes())
            .map_err(|_| Error::InvalidMethod(method.to_string()))?;

        Ok(Self {
            name: Arc::from(name),
            method,
            target: target.to_string(),
            headers: Vec::new(),
            body: None,
            weight: 1,
        })
    }

    #[must_use]
    pub fn body_str(mut self, body: &str) -> Self {
        self.body = Some(Bytes::from(body.to_string()));
        self
    }

    #[must_use]
    pub fn weight(mut self, weight: u32) -> Self {
        self.weight = weight;
        self
    }

    #[must_use]
    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }
}

/// Immutable weighted scenario set. Validated once at construction, so
/// [`ScenarioCatalog::pick`] itself cannot fail.
#[derive(Debug, Clone)]
pub struct ScenarioCatalog {
    scenarios: Arc<[Scenario]>,
    total_weight: u64,
}

impl ScenarioCatalog {
    pub fn new(scenarios: Vec<Scenario>) -> Result<Self> {
        if scenarios.is_empty() {
            return Err(Error::EmptyCatalog);
        }

        let mut total_weight = 0u64;
        for s in &scenarios {
            if s.weight == 0 {
                return Err(Error::InvalidWeight(s.name.to_string()));
            }
            total_weight = total_weight.saturating_add(u64::from(s.weight));
        }

        Ok(Self {
            scenarios: Arc::from(scenarios.into_boxed_slice()),
            total_weight,
        })
    }

    pub fn scenarios(&self) -> &[Scenario] {
        &self.scenarios
    }

    pub fn total_weight(&self) -> u64 {
        self.total_weight
    }

    /// Weighted random selection: draw uniform in `[0, total_weight)` and walk
    /// the catalog in order, subtracting weights until the draw is used up.
    pub fn pick(&self, rng: &mut fastrand::Rng) -> &Scenario {
        let mut draw = rng.u64(..self.total_weight) as i128;

        for s in self.scenarios.iter() {
            draw -= i128::from(s.weight);
            if draw < 0 {
                return s;
            }
        }

        // Unreachable for a validated catalog; keep the first entry as fallback.
        &self.scenarios[0]
    }
}
