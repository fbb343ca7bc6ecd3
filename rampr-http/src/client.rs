use bytes::Bytes;
use http_body_util::{BodyExt as _, Full};
use hyper::Request;
use hyper::body::Incoming;
use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::client::legacy::Client;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::TokioExecutor;
use std::collections::BTreeMap;
use std::time::Duration;
use tokio::time::Instant;

use super::{BODY_PREVIEW_LIMIT, Error, HttpRequest, HttpResponse, Result};

#[derive(Debug, Clone)]
pub struct HttpClient {
    inner: Client<HttpsConnector<HttpConnector>, Full<Bytes>>,
}

impl Default for HttpClient {
    fn default() -> Self {
        // OS-level TCP connect timeouts run to tens of seconds; cap the connect
        // so an unreachable target fails within a few seconds.
        Self::new(Some(Duration::from_secs(3)))
    }
}

impl HttpClient {
    #[must_use]
    pub fn new(connect_timeout: Option<Duration>) -> Self {
        let mut http_connector = HttpConnector::new();
        http_connector.enforce_http(false);
        http_connector.set_connect_timeout(connect_timeout);

        let https_connector = HttpsConnectorBuilder::new()
            .with_webpki_roots()
            .https_or_http()
            .enable_http1()
            .wrap_connector(http_connector);

        let inner = Client::builder(TokioExecutor::new()).build(https_connector);

        Self { inner }
    }

    /// Issue a request and wait for the full response. `req.timeout` is one
    /// deadline over the whole exchange, body read included; the body is always
    /// drained but only a bounded preview is kept.
    pub async fn request(&self, req: HttpRequest) -> Result<HttpResponse> {
        let deadline = req.timeout.map(|t| (t, Instant::now() + t));
        let request = build_request(req)?;

        let res: hyper::Response<Incoming> = match deadline {
            Some((total, at)) => tokio::time::timeout_at(at, self.inner.request(request))
                .await
                .map_err(|_| Error::Timeout(total))??,
            None => self.inner.request(request).await?,
        };

        let (parts, body) = res.into_parts();
        let status = parts.status.as_u16();
        let headers = normalized_headers(&parts.headers);

        let body = match deadline {
            Some((total, at)) => tokio::time::timeout_at(at, body.collect())
                .await
                .map_err(|_| Error::Timeout(total))??
                .to_bytes(),
            None => body.collect().await?.to_bytes(),
        };

        Ok(HttpResponse {
            status,
            body_len: body.len() as u64,
            body_preview: body.slice(..body.len().min(BODY_PREVIEW_LIMIT)),
            headers,
        })
    }

    pub async fn get(&self, url: &str) -> Result<HttpResponse> {
        self.request(HttpRequest::get(url)).await
    }
}

fn build_request(req: HttpRequest) -> Result<Request<Full<Bytes>>> {
    let parsed = url::Url::parse(&req.url).map_err(|_| Error::InvalidUrl(req.url.clone()))?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(Error::UnsupportedScheme(req.url));
    }

    let uri: hyper::Uri = req
        .url
        .parse()
        .map_err(|_| Error::InvalidUrl(req.url.clone()))?;

    let mut builder = Request::builder().method(req.method).uri(uri);

    let has = |name: &str| req.headers.iter().any(|(k, _)| k.eq_ignore_ascii_case(name));

    if !has("host")
        && let Some(host) = host_header_value(&parsed)
    {
        builder = builder.header(http::header::HOST, host);
    }
    if !req.body.is_empty() && !has("content-length") {
        builder = builder.header(http::header::CONTENT_LENGTH, req.body.len());
    }

    for (k, v) in &req.headers {
        let name = http::header::HeaderName::from_bytes(k.as_bytes())?;
        let value = http::header::HeaderValue::from_str(v)?;
        builder = builder.header(name, value);
    }

    Ok(builder.body(Full::new(req.body))?)
}

/// Host header value, omitting the port when it is the scheme default.
fn host_header_value(parsed: &url::Url) -> Option<String> {
    let host = parsed.host_str()?;
    match parsed.port() {
        Some(port) => Some(format!("{host}:{port}")),
        None => Some(host.to_string()),
    }
}

/// Lowercase header names; repeated headers are joined with ", ".
fn normalized_headers(headers: &http::HeaderMap) -> Vec<(String, String)> {
    let mut merged: BTreeMap<String, String> = BTreeMap::new();
    for (name, value) in headers {
        let key = name.as_str().to_ascii_lowercase();
        let v = String::from_utf8_lossy(value.as_bytes()).to_string();
        merged
            .entry(key)
            .and_modify(|cur| {
                cur.push_str(", ");
                cur.push_str(&v);
            })
            .or_insert(v);
    }
    merged.into_iter().collect()
}
