//! In-memory store for tests
//!
//! [`FakeStore`] answers requests from canned responses and records every
//! request it receives. GETs for unknown URLs answer 404 and POSTs answer
//! 201 unless told otherwise.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};

use reqwest::StatusCode;
use serde_json::{json, Value};

use crate::client::{HttpResponse, StoreClient};
use crate::error::{SyncError, SyncResult};

/// A request received by [`FakeStore`]
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    Get { url: String, accept: String },
    Post { url: String, body: Value },
}

#[derive(Debug, Default)]
pub struct FakeStore {
    gets: RefCell<HashMap<String, HttpResponse>>,
    posts: RefCell<HashMap<String, HttpResponse>>,
    failing_posts: RefCell<HashSet<String>>,
    requests: RefCell<Vec<Request>>,
}

impl FakeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer GETs for `url` with a `text/plain` body
    pub fn with_text(self, url: &str, content_type: &str, text: &str) -> Self {
        let response = HttpResponse::new(url, StatusCode::OK)
            .with_content_type(content_type)
            .with_body(text);
        self.gets.borrow_mut().insert(url.to_string(), response);
        self
    }

    /// Answer GETs for `url` with a JSON-LD body
    pub fn with_json(self, url: &str, value: &Value) -> Self {
        let response = HttpResponse::new(url, StatusCode::OK)
            .with_content_type("application/ld+json")
            .with_body(value.to_string());
        self.gets.borrow_mut().insert(url.to_string(), response);
        self
    }

    /// Answer GETs for `url` with an arbitrary response
    pub fn with_get(self, url: &str, response: HttpResponse) -> Self {
        self.gets.borrow_mut().insert(url.to_string(), response);
        self
    }

    /// Answer POSTs to `url` with `status` and a plain-text body
    pub fn with_post_status(self, url: &str, status: StatusCode, body: &str) -> Self {
        let response = HttpResponse::new(url, status).with_body(body);
        self.posts.borrow_mut().insert(url.to_string(), response);
        self
    }

    /// Fail POSTs to `url` as if the connection dropped
    pub fn with_post_failure(self, url: &str) -> Self {
        self.failing_posts.borrow_mut().insert(url.to_string());
        self
    }

    /// All requests received, in order
    pub fn requests(&self) -> Vec<Request> {
        self.requests.borrow().clone()
    }

    /// Number of GETs sent to `url`
    pub fn get_count(&self, url: &str) -> usize {
        self.requests
            .borrow()
            .iter()
            .filter(|r| matches!(r, Request::Get { url: u, .. } if u == url))
            .count()
    }

    /// Bodies POSTed to `url`, in order
    pub fn posted(&self, url: &str) -> Vec<Value> {
        self.requests
            .borrow()
            .iter()
            .filter_map(|r| match r {
                Request::Post { url: u, body } if u == url => Some(body.clone()),
                _ => None,
            })
            .collect()
    }
}

impl StoreClient for FakeStore {
    fn get(&self, url: &str, accept: &str) -> SyncResult<HttpResponse> {
        self.requests.borrow_mut().push(Request::Get {
            url: url.to_string(),
            accept: accept.to_string(),
        });
        let response = self
            .gets
            .borrow()
            .get(url)
            .cloned()
            .unwrap_or_else(|| HttpResponse::new(url, StatusCode::NOT_FOUND).with_body("Not Found"));
        Ok(response)
    }

    fn post_json(&self, url: &str, body: &Value) -> SyncResult<HttpResponse> {
        self.requests.borrow_mut().push(Request::Post {
            url: url.to_string(),
            body: body.clone(),
        });
        if self.failing_posts.borrow().contains(url) {
            return Err(SyncError::Transport {
                url: url.to_string(),
                source: transport_error(),
            });
        }
        let response = self.posts.borrow().get(url).cloned().unwrap_or_else(|| {
            HttpResponse::new(url, StatusCode::CREATED)
                .with_content_type("application/json")
                .with_body(json!({"status": "created"}).to_string())
        });
        Ok(response)
    }
}

/// A real `reqwest::Error`, produced without touching the network
fn transport_error() -> reqwest::Error {
    reqwest::blocking::Client::new()
        .get("not a url")
        .send()
        .unwrap_err()
}
