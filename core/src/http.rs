//! HTTP request and response types.
//!
//! # Design
//! Requests exist in two shapes. `RequestSpec` is what the caller wrote down:
//! a raw url string, a method name, headers, an optional JSON body and a
//! timeout. `HttpRequest` is what survives validation: a parsed `Url`, a known
//! `HttpMethod`, and a body only when the method carries one. The cache and
//! the transport only ever see `HttpRequest`.
//!
//! All fields use owned types so values can move between threads and into
//! capability implementations without lifetime concerns.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde_json::Value;
use url::Url;

/// Default per-attempt timeout, in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Patch,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Patch => "PATCH",
        }
    }

    /// Whether a JSON body is sent with this method.
    pub fn carries_body(&self) -> bool {
        matches!(self, HttpMethod::Post | HttpMethod::Put | HttpMethod::Patch)
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = ();

    /// Case-insensitive; `"get"` and `"GET"` are the same method.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(HttpMethod::Get),
            "POST" => Ok(HttpMethod::Post),
            "PUT" => Ok(HttpMethod::Put),
            "DELETE" => Ok(HttpMethod::Delete),
            "PATCH" => Ok(HttpMethod::Patch),
            _ => Err(()),
        }
    }
}

/// The headers every request starts with. Caller headers are appended after
/// these, never merged into them.
pub fn default_headers() -> Vec<(String, String)> {
    vec![
        ("Content-Type".to_string(), "application/json".to_string()),
        ("Accept".to_string(), "application/json".to_string()),
    ]
}

/// An unvalidated description of one call, as assembled by `ClientBuilder`.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestSpec {
    pub url: String,
    pub method: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Value>,
    pub timeout_secs: u64,
}

impl RequestSpec {
    /// Build a spec with the default headers followed by `headers`.
    pub fn new(
        url: impl Into<String>,
        method: impl Into<String>,
        headers: Vec<(String, String)>,
        body: Option<Value>,
    ) -> Self {
        let mut all = default_headers();
        all.extend(headers);
        Self {
            url: url.into(),
            method: method.into(),
            headers: all,
            body,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// A validated HTTP request described as plain data.
///
/// Produced by [`crate::validate`]. Transports execute it; the cache derives
/// its fingerprint from it.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: Url,
    pub headers: Vec<(String, String)>,
    pub body: Option<Value>,
    pub timeout: Duration,
}

impl HttpRequest {
    /// The body as sent on the wire, if the method carries one.
    pub fn body_json(&self) -> Option<String> {
        self.body.as_ref().map(Value::to_string)
    }
}

/// An HTTP response described as plain data.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}
