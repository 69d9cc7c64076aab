//! The network boundary.
//!
//! # Design
//! A `Transport` performs exactly one exchange for an `HttpRequest`. It does
//! not retry and does not cache. Any completed exchange is a `Success`,
//! whatever its status code; deciding what a 404 or a 503 means is the
//! client's job. `Failure` is reserved for exchanges that never produced a
//! status: DNS, connect, TLS, timeouts, unreadable bodies.

use std::time::Duration;

use ureq::http::Response;
use ureq::typestate::WithBody;
use ureq::{Agent, Body, RequestBuilder};

use crate::http::{HttpMethod, HttpRequest, HttpResponse};

/// Outcome of a single exchange.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportResult {
    Success(HttpResponse),
    Failure { reason: String },
}

pub trait Transport: Send + Sync {
    fn send(&self, request: &HttpRequest) -> TransportResult;
}

/// Blocking transport backed by `ureq`.
///
/// Uses ureq's default rustls configuration, so certificates and hostnames
/// are verified for `https` urls. The request timeout bounds the whole
/// exchange, body included. Redirects are not followed and the response body
/// is read without a size cap.
///
/// Headers go out in request order except that repeated names are sent
/// together, at the position of their first occurrence.
#[derive(Debug, Clone, Copy, Default)]
pub struct UreqTransport;

impl UreqTransport {
    pub fn new() -> Self {
        Self
    }

    /// Status codes, 3xx included, are returned as data rather than `Err`.
    fn agent(timeout: Duration) -> Agent {
        Agent::config_builder()
            .http_status_as_error(false)
            .max_redirects(0)
            .timeout_global(Some(timeout))
            .build()
            .new_agent()
    }

    fn exchange(&self, request: &HttpRequest) -> Result<HttpResponse, ureq::Error> {
        let agent = Self::agent(request.timeout);
        let url = request.url.as_str();
        let body = request.body_json();
        let headers = &request.headers;

        let mut response = match request.method {
            HttpMethod::Get => with_headers(agent.get(url), headers).call(),
            HttpMethod::Delete => with_headers(agent.delete(url), headers).call(),
            HttpMethod::Post => send_body(with_headers(agent.post(url), headers), body.as_deref()),
            HttpMethod::Put => send_body(with_headers(agent.put(url), headers), body.as_deref()),
            HttpMethod::Patch => send_body(with_headers(agent.patch(url), headers), body.as_deref()),
        }?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response
            .body_mut()
            .with_config()
            .limit(u64::MAX)
            .read_to_string()?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

impl Transport for UreqTransport {
    fn send(&self, request: &HttpRequest) -> TransportResult {
        match self.exchange(request) {
            Ok(response) => TransportResult::Success(response),
            Err(e) => TransportResult::Failure {
                reason: e.to_string(),
            },
        }
    }
}

fn with_headers<B>(mut builder: RequestBuilder<B>, headers: &[(String, String)]) -> RequestBuilder<B> {
    for (name, value) in headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder
}

fn send_body(builder: RequestBuilder<WithBody>, body: Option<&str>) -> Result<Response<Body>, ureq::Error> {
    match body {
        Some(body) => builder.send(body.as_bytes()),
        None => builder.send_empty(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::RequestSpec;
    use crate::validate::validate;

    #[test]
    fn refused_connection_is_a_failure() {
        // Bind and drop to find a port nothing is listening on.
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let mut spec = RequestSpec::new(format!("http://127.0.0.1:{port}/"), "GET", Vec::new(), None);
        spec.timeout_secs = 2;
        let request = validate(&spec).unwrap();

        let result = UreqTransport::new().send(&request);
        assert!(matches!(result, TransportResult::Failure { .. }), "{result:?}");
    }
}
