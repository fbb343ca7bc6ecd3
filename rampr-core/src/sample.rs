use std::sync::Arc;
use std::time::SystemTime;

/// One executed request, as data. Produced exactly once per request and never
/// mutated afterwards; failures below the phase level live here instead of in
/// the error channel.
#[derive(Debug, Clone)]
pub struct RequestSample {
    pub scenario: Option<Arc<str>>,
    pub success: bool,
    pub status: Option<u16>,
    pub latency_ms: f64,
    pub error: Option<String>,
    pub at: SystemTime,
}

impl RequestSample {
    pub fn status_response(scenario: Arc<str>, status: u16, latency_ms: f64) -> Self {
        Self {
            scenario: Some(scenario),
            success: (200..400).contains(&status),
            status: Some(status),
            latency_ms,
            error: None,
            at: SystemTime::now(),
        }
    }

    pub fn transport_failure(scenario: Arc<str>, error: String, latency_ms: f64) -> Self {
        Self {
            scenario: Some(scenario),
            success: false,
            status: None,
            latency_ms,
            error: Some(error),
            at: SystemTime::now(),
        }
    }
}
