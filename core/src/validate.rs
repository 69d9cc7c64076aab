//! Request validation.
//!
//! Turns a caller-assembled `RequestSpec` into an `HttpRequest`. Runs once per
//! `execute`, before the cache is consulted, and has no side effects.

use std::time::Duration;

use url::Url;

use crate::error::ValidationError;
use crate::http::{HttpMethod, HttpRequest, RequestSpec};

/// Check `spec` and produce the typed request the cache and transport use.
///
/// The body is dropped for methods that do not carry one, so a GET and a GET
/// with a stray body are the same request.
pub fn validate(spec: &RequestSpec) -> Result<HttpRequest, ValidationError> {
    if spec.url.is_empty() {
        return Err(ValidationError::EmptyUrl);
    }

    let url = Url::parse(&spec.url).map_err(|e| ValidationError::MalformedUrl(e.to_string()))?;
    if !url.has_host() {
        return Err(ValidationError::MalformedUrl(format!("{} has no host", spec.url)));
    }

    let method: HttpMethod = spec
        .method
        .parse()
        .map_err(|_| ValidationError::UnsupportedMethod(spec.method.clone()))?;

    if spec.timeout_secs == 0 {
        return Err(ValidationError::ZeroTimeout);
    }

    let body = if method.carries_body() {
        spec.body.clone()
    } else {
        None
    };

    Ok(HttpRequest {
        method,
        url,
        headers: spec.headers.clone(),
        body,
        timeout: Duration::from_secs(spec.timeout_secs),
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn spec(url: &str, method: &str) -> RequestSpec {
        RequestSpec::new(url, method, Vec::new(), None)
    }

    #[test]
    fn rejects_empty_url() {
        assert_eq!(validate(&spec("", "GET")), Err(ValidationError::EmptyUrl));
    }

    #[test]
    fn rejects_malformed_url() {
        let err = validate(&spec("not a url", "GET")).unwrap_err();
        assert!(matches!(err, ValidationError::MalformedUrl(_)));
    }

    #[test]
    fn rejects_url_without_host() {
        let err = validate(&spec("mailto:someone@example.com", "GET")).unwrap_err();
        assert!(matches!(err, ValidationError::MalformedUrl(_)));
    }

    #[test]
    fn rejects_unsupported_method() {
        let err = validate(&spec("https://api.example.com/x", "HEAD")).unwrap_err();
        assert_eq!(err, ValidationError::UnsupportedMethod("HEAD".to_string()));
    }

    #[test]
    fn rejects_zero_timeout() {
        let mut s = spec("https://api.example.com/x", "GET");
        s.timeout_secs = 0;
        assert_eq!(validate(&s), Err(ValidationError::ZeroTimeout));
    }

    #[test]
    fn accepts_absolute_url_with_get() {
        let req = validate(&spec("https://api.example.com/x", "GET")).unwrap();
        assert_eq!(req.method, HttpMethod::Get);
        assert_eq!(req.url.as_str(), "https://api.example.com/x");
        assert_eq!(req.timeout, Duration::from_secs(30));
        assert_eq!(req.headers.len(), 2);
    }

    #[test]
    fn lowercase_method_is_normalized() {
        let req = validate(&spec("https://api.example.com/x", "patch")).unwrap();
        assert_eq!(req.method, HttpMethod::Patch);
    }

    #[test]
    fn body_is_kept_only_for_body_methods() {
        let body = Some(json!({"name": "x"}));

        let post = RequestSpec::new("https://api.example.com/x", "POST", Vec::new(), body.clone());
        assert_eq!(validate(&post).unwrap().body, body);

        let get = RequestSpec::new("https://api.example.com/x", "GET", Vec::new(), body.clone());
        assert_eq!(validate(&get).unwrap().body, None);

        let delete = RequestSpec::new("https://api.example.com/x", "DELETE", Vec::new(), body);
        assert_eq!(validate(&delete).unwrap().body, None);
    }
}
