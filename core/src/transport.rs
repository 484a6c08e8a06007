//! Network execution of `HttpRequest` values.
//!
//! # Design
//! `Transport` is the only seam where I/O happens. The gateway is generic
//! over it, so production code plugs in `ReqwestTransport` and tests plug in
//! an in-memory implementation. A transport performs exactly one attempt per
//! call; retries are left to whoever invoked the operation.

use std::error::Error;
use std::fmt;
use std::future::Future;
use std::time::Duration;

use crate::http::{HttpMethod, HttpRequest, HttpResponse};

/// Executes one HTTP round-trip.
///
/// Any status code is a successful exchange; only failures to obtain a
/// response at all (DNS, refused connection, timeout) are `TransportError`.
pub trait Transport: Send + Sync + 'static {
    fn execute(
        &self,
        request: HttpRequest,
    ) -> impl Future<Output = Result<HttpResponse, TransportError>> + Send;
}

/// A request that never produced a response.
#[derive(Debug)]
pub struct TransportError {
    message: String,
    source: Option<Box<dyn Error + Send + Sync>>,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(
        message: impl Into<String>,
        source: impl Into<Box<dyn Error + Send + Sync>>,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.source {
            Some(source) => write!(f, "{}: {source}", self.message),
            None => f.write_str(&self.message),
        }
    }
}

impl Error for TransportError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.source.as_deref().map(|e| e as &(dyn Error + 'static))
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        let message = if err.is_timeout() {
            "request timed out"
        } else if err.is_connect() {
            "connection failed"
        } else if err.is_body() || err.is_decode() {
            "error reading body"
        } else {
            "request failed"
        };
        TransportError::with_source(message, err)
    }
}

/// `Transport` backed by a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Transport for ReqwestTransport {
    fn execute(
        &self,
        request: HttpRequest,
    ) -> impl Future<Output = Result<HttpResponse, TransportError>> + Send {
        let client = self.client.clone();
        async move {
            let HttpRequest {
                method,
                url,
                headers,
                body,
            } = request;

            let mut builder = match method {
                HttpMethod::Get => client.get(url.as_str()),
                HttpMethod::Post => client.post(url.as_str()),
                HttpMethod::Put => client.put(url.as_str()),
                HttpMethod::Delete => client.delete(url.as_str()),
            };
            for (key, value) in &headers {
                builder = builder.header(key.as_str(), value.as_str());
            }
            if let Some(body) = body {
                builder = builder.body(body);
            }

            tracing::debug!(%method, %url, "sending request");
            let response = builder.send().await.map_err(|e| {
                tracing::warn!(%method, %url, error = %e, "request failed");
                TransportError::from(e)
            })?;
            let status = response.status().as_u16();
            let body = response.text().await?;
            tracing::debug!(%method, %url, status, bytes = body.len(), "response received");

            Ok(HttpResponse { status, body })
        }
    }
}
