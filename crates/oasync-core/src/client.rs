//! Store client
//!
//! Thin HTTP operations against the annotation and document stores. The
//! rest of the crate only talks to [`StoreClient`], so the resolver,
//! importer and exporter can be exercised without a server.

use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::StatusCode;
use serde_json::Value;
use tracing::debug;

use crate::annotation::pretty;
use crate::encoding::decode_text;
use crate::error::{SyncError, SyncResult};

/// Media types used for Accept negotiation
pub mod accept {
    pub const JSON_LD: &str = "application/ld+json";
    pub const TEXT_PLAIN: &str = "text/plain";
}

/// A fully read HTTP response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// URL the request was sent to
    pub url: String,
    pub status: StatusCode,
    /// Content-Type header, if the server sent one
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(url: impl Into<String>, status: StatusCode) -> Self {
        Self {
            url: url.into(),
            status,
            content_type: None,
            body: Vec::new(),
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Check if the status is a client or server error
    pub fn is_error(&self) -> bool {
        self.status.is_client_error() || self.status.is_server_error()
    }

    /// The error this response represents, if its status is 4xx or 5xx
    pub fn status_error(&self) -> Option<SyncError> {
        self.is_error().then(|| SyncError::Status {
            url: self.url.clone(),
            status: self.status,
        })
    }

    /// Turn a 4xx/5xx response into an error
    pub fn error_for_status(self) -> SyncResult<Self> {
        match self.status_error() {
            Some(err) => Err(err),
            None => Ok(self),
        }
    }

    /// Parse the body as JSON
    pub fn json(&self) -> SyncResult<Value> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    /// Decode the body as text using the declared or detected charset
    pub fn text(&self) -> SyncResult<String> {
        decode_text(self.content_type.as_deref(), &self.body)
    }

    /// Body for display: pretty JSON when it parses, raw text otherwise
    pub fn pretty_body(&self) -> String {
        match self.json() {
            Ok(value) => pretty(&value),
            Err(_) => String::from_utf8_lossy(&self.body).into_owned(),
        }
    }
}

/// HTTP operations needed against RESTful annotation and document stores
///
/// Implementations return `Ok` for any HTTP status; only failures to
/// complete the exchange are errors. Callers decide which statuses they
/// accept.
pub trait StoreClient {
    /// GET `url` asking for the `accept` media type
    fn get(&self, url: &str, accept: &str) -> SyncResult<HttpResponse>;

    /// POST `body` as `application/json` to `url`
    fn post_json(&self, url: &str, body: &Value) -> SyncResult<HttpResponse>;
}

impl<C: StoreClient + ?Sized> StoreClient for &C {
    fn get(&self, url: &str, accept: &str) -> SyncResult<HttpResponse> {
        (**self).get(url, accept)
    }

    fn post_json(&self, url: &str, body: &Value) -> SyncResult<HttpResponse> {
        (**self).post_json(url, body)
    }
}

/// Default request timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Blocking HTTP implementation of [`StoreClient`]
#[derive(Debug, Clone)]
pub struct HttpStoreClient {
    client: Client,
}

impl HttpStoreClient {
    /// Create a client with the given request timeout
    pub fn new(timeout: Duration) -> SyncResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("oasync/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(SyncError::Client)?;
        Ok(Self { client })
    }

    fn read(url: &str, response: reqwest::blocking::Response) -> SyncResult<HttpResponse> {
        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let body = response.bytes().map_err(|source| SyncError::Transport {
            url: url.to_string(),
            source,
        })?;
        debug!("{} {} ({} bytes)", status, url, body.len());

        Ok(HttpResponse {
            url: url.to_string(),
            status,
            content_type,
            body: body.to_vec(),
        })
    }
}

impl StoreClient for HttpStoreClient {
    fn get(&self, url: &str, accept: &str) -> SyncResult<HttpResponse> {
        debug!("GET {} (Accept: {})", url, accept);
        let response = self
            .client
            .get(url)
            .header(ACCEPT, accept)
            .send()
            .map_err(|source| SyncError::Transport {
                url: url.to_string(),
                source,
            })?;
        Self::read(url, response)
    }

    fn post_json(&self, url: &str, body: &Value) -> SyncResult<HttpResponse> {
        debug!("POST {}", url);
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .map_err(|source| SyncError::Transport {
                url: url.to_string(),
                source,
            })?;
        Self::read(url, response)
    }
}
