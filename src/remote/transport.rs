//! HTTP transport for the remote source.
//!
//! Abstracted for testability:
//! - Transport trait: one synchronous GET
//! - HttpTransport: reqwest blocking client

use std::time::Duration;

use thiserror::Error;
use url::Url;

/// Status and body of an HTTP reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpReply {
    pub status: u16,
    pub body: String,
}

/// Transport errors
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to build HTTP client: {0}")]
    Client(String),

    #[error("request to {url} failed: {message}")]
    Request { url: String, message: String },
}

/// Issues the single GET the remote source needs.
pub trait Transport: Send + Sync {
    fn get(&self, url: &Url) -> Result<HttpReply, TransportError>;
}

/// Blocking HTTP transport.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::blocking::Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Client(e.to_string()))?;
        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    fn get(&self, url: &Url) -> Result<HttpReply, TransportError> {
        let request_error = |e: reqwest::Error| TransportError::Request {
            url: url.to_string(),
            message: e.to_string(),
        };
        let response = self.client.get(url.clone()).send().map_err(request_error)?;
        let status = response.status().as_u16();
        let body = response.text().map_err(request_error)?;
        Ok(HttpReply { status, body })
    }
}
