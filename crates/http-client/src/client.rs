//! The transport seam.
//!
//! [`HttpClient`] executes one fully materialised request. The adapter depends
//! only on this trait, so tests and middleware stacks can substitute their own
//! transport; [`ReqwestHttpClient`] is the production implementation.

use std::collections::BTreeMap;
use std::time::Duration;

use abstractions::{BoxError, RequestError};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::Deserialize;

/// Executes HTTP requests.
///
/// Request options travel in the request's extensions as an
/// [`abstractions::RequestOptions`] value.
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Sends `request` and returns the response as soon as its headers
    /// arrive. Non-success statuses are returned, not turned into errors;
    /// only transport failures fail.
    async fn execute(&self, request: http::Request<Bytes>) -> Result<reqwest::Response, BoxError>;
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Settings for the default reqwest transport.
///
/// Deserialisable so a composition root can load it from its own
/// configuration file; every field has a default.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct HttpClientOptions {
    /// Whole-request timeout in seconds.
    pub timeout_secs: u64,

    /// Connection establishment timeout in seconds. `None` uses reqwest's default.
    pub connect_timeout_secs: Option<u64>,

    /// `User-Agent` header sent with every request.
    pub user_agent: String,

    /// Headers added to every request unless the request sets them itself.
    pub default_headers: BTreeMap<String, String>,
}

impl Default for HttpClientOptions {
    fn default() -> Self {
        Self {
            timeout_secs: 100,
            connect_timeout_secs: None,
            user_agent: concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")).to_owned(),
            default_headers: BTreeMap::new(),
        }
    }
}

impl HttpClientOptions {
    /// Builds a `reqwest::Client` from these options.
    pub fn build_client(&self) -> Result<reqwest::Client, RequestError> {
        let mut headers = HeaderMap::new();
        for (name, value) in &self.default_headers {
            let name = HeaderName::from_bytes(name.as_bytes()).map_err(construction)?;
            let value = HeaderValue::from_str(value).map_err(construction)?;
            headers.insert(name, value);
        }

        let mut builder = reqwest::Client::builder()
            .timeout(Duration::from_secs(self.timeout_secs))
            .user_agent(self.user_agent.as_str())
            .default_headers(headers);
        if let Some(secs) = self.connect_timeout_secs {
            builder = builder.connect_timeout(Duration::from_secs(secs));
        }
        builder.build().map_err(construction)
    }
}

fn construction(err: impl std::fmt::Display) -> RequestError {
    RequestError::Construction {
        message: format!("invalid HTTP client configuration: {err}"),
    }
}

// ---------------------------------------------------------------------------
// reqwest transport
// ---------------------------------------------------------------------------

/// [`HttpClient`] backed by a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestHttpClient {
    client: reqwest::Client,
}

impl ReqwestHttpClient {
    /// Uses an already configured `reqwest::Client`.
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Builds the underlying client from `options`.
    pub fn from_options(options: &HttpClientOptions) -> Result<Self, RequestError> {
        options.build_client().map(Self::new)
    }

    /// The underlying `reqwest::Client`.
    pub fn inner(&self) -> &reqwest::Client {
        &self.client
    }
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn execute(&self, request: http::Request<Bytes>) -> Result<reqwest::Response, BoxError> {
        let request = reqwest::Request::try_from(request)?;
        Ok(self.client.execute(request).await?)
    }
}
