use std::time::Duration;

use bytes::Bytes;

/// How many body bytes a response keeps around. The rest is drained and
/// counted but never stored, so a misbehaving target cannot balloon memory.
pub const BODY_PREVIEW_LIMIT: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    /// First [`BODY_PREVIEW_LIMIT`] bytes of the response body.
    pub body_preview: Bytes,
    /// Full body length in bytes (the body itself is not retained).
    pub body_len: u64,
    /// Response headers (lowercased header names). Multiple values are joined with ", ".
    pub headers: Vec<(String, String)>,
}

#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: http::Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
    /// Overall deadline for the request, including reading the body.
    pub timeout: Option<Duration>,
}

impl HttpRequest {
    pub fn get(url: &str) -> Self {
        Self {
            method: http::Method::GET,
            url: url.to_string(),
            headers: Vec::new(),
            body: Bytes::new(),
            timeout: None,
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}
