//! The retrying, caching request client.
//!
//! # Design
//! `ClientBuilder` collects the request description and every tunable, then
//! `build()` freezes them into a `RetryingClient`. A built client is never
//! reconfigured, so it can be shared between threads and executed any number
//! of times.
//!
//! `execute` walks a fixed sequence:
//!
//! 1. validate the request, failing fast with no I/O;
//! 2. if caching is on, serve a fresh cached payload and stop;
//! 3. send up to `max_attempts` times, sleeping `delay_secs` between failed
//!    attempts; the first 2xx with a JSON body wins and is cached;
//! 4. otherwise fail with `ClientError::Exhausted`.
//!
//! Transport failures, non-2xx statuses and undecodable bodies are all just
//! a failed attempt. Each is logged with its own wording.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, error, info_span, warn};

use crate::audit::{format_line, AuditLog, FileLog};
use crate::cache::{fingerprint, CacheStore, FileCache, ResponseCache};
use crate::clock::{Clock, SystemClock};
use crate::config::{ClientSettings, RetryPolicy};
use crate::error::{AttemptFailure, ClientError, Result};
use crate::http::{HttpRequest, RequestSpec};
use crate::transport::{Transport, TransportResult, UreqTransport};
use crate::validate::validate;

/// Fluent configuration for a `RetryingClient`.
///
/// Capabilities that are not injected fall back to production defaults:
/// `UreqTransport`, `SystemClock`, and, once caching or logging is enabled,
/// `FileCache` / `FileLog` at the paths in `ClientSettings`.
pub struct ClientBuilder {
    spec: RequestSpec,
    settings: ClientSettings,
    transport: Option<Arc<dyn Transport>>,
    cache_store: Option<Arc<dyn CacheStore>>,
    audit_log: Option<Arc<dyn AuditLog>>,
    clock: Option<Arc<dyn Clock>>,
}

impl ClientBuilder {
    /// Full constructor. `headers` are appended after the JSON defaults.
    pub fn new(
        url: impl Into<String>,
        method: impl Into<String>,
        headers: Vec<(String, String)>,
        body: Option<Value>,
    ) -> Self {
        Self {
            spec: RequestSpec::new(url, method, headers, body),
            settings: ClientSettings::default(),
            transport: None,
            cache_store: None,
            audit_log: None,
            clock: None,
        }
    }

    /// Per-attempt timeout in seconds.
    pub fn timeout(mut self, secs: u64) -> Self {
        self.settings.timeout_secs = secs;
        self
    }

    /// Serve responses younger than `ttl_secs` from the cache.
    /// `cache::DEFAULT_CACHE_TTL` is the conventional value.
    pub fn enable_cache(mut self, ttl_secs: u64) -> Self {
        self.settings.cache_ttl_secs = Some(ttl_secs);
        self
    }

    pub fn enable_logging(mut self) -> Self {
        self.settings.logging = true;
        self
    }

    pub fn set_retry(mut self, attempts: u32, delay_secs: u64) -> Self {
        self.settings.retry = RetryPolicy::new(attempts, delay_secs);
        self
    }

    /// Replace every tunable at once.
    pub fn settings(mut self, settings: ClientSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Storage used once caching is enabled. Does not enable caching itself.
    pub fn cache_store(mut self, store: Arc<dyn CacheStore>) -> Self {
        self.cache_store = Some(store);
        self
    }

    /// Sink used once logging is enabled. Does not enable logging itself.
    pub fn audit_log(mut self, log: Arc<dyn AuditLog>) -> Self {
        self.audit_log = Some(log);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn build(self) -> RetryingClient {
        let ClientBuilder {
            mut spec,
            settings,
            transport,
            cache_store,
            audit_log,
            clock,
        } = self;

        spec.timeout_secs = settings.timeout_secs;
        let clock = clock.unwrap_or_else(|| Arc::new(SystemClock));

        let cache = settings.cache_ttl_secs.map(|ttl| {
            let store = cache_store.unwrap_or_else(|| Arc::new(FileCache::new(&settings.cache_dir)));
            ResponseCache::new(store, ttl, Arc::clone(&clock))
        });

        let audit = if settings.logging {
            Some(audit_log.unwrap_or_else(|| Arc::new(FileLog::new(&settings.log_file))))
        } else {
            None
        };

        RetryingClient {
            spec,
            retry: settings.retry,
            cache,
            audit,
            transport: transport.unwrap_or_else(|| Arc::new(UreqTransport::new())),
            clock,
        }
    }
}

impl std::fmt::Debug for ClientBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientBuilder")
            .field("spec", &self.spec)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

/// One configured call, executable any number of times.
#[derive(Clone)]
pub struct RetryingClient {
    spec: RequestSpec,
    retry: RetryPolicy,
    cache: Option<ResponseCache>,
    audit: Option<Arc<dyn AuditLog>>,
    transport: Arc<dyn Transport>,
    clock: Arc<dyn Clock>,
}

impl RetryingClient {
    pub fn builder(
        url: impl Into<String>,
        method: impl Into<String>,
        headers: Vec<(String, String)>,
        body: Option<Value>,
    ) -> ClientBuilder {
        ClientBuilder::new(url, method, headers, body)
    }

    pub fn get(url: impl Into<String>, headers: Vec<(String, String)>) -> ClientBuilder {
        ClientBuilder::new(url, "GET", headers, None)
    }

    pub fn post(url: impl Into<String>, body: Value, headers: Vec<(String, String)>) -> ClientBuilder {
        ClientBuilder::new(url, "POST", headers, Some(body))
    }

    pub fn put(url: impl Into<String>, body: Value, headers: Vec<(String, String)>) -> ClientBuilder {
        ClientBuilder::new(url, "PUT", headers, Some(body))
    }

    pub fn patch(url: impl Into<String>, body: Value, headers: Vec<(String, String)>) -> ClientBuilder {
        ClientBuilder::new(url, "PATCH", headers, Some(body))
    }

    pub fn delete(url: impl Into<String>, headers: Vec<(String, String)>) -> ClientBuilder {
        ClientBuilder::new(url, "DELETE", headers, None)
    }

    pub fn spec(&self) -> &RequestSpec {
        &self.spec
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    pub fn caching_enabled(&self) -> bool {
        self.cache.is_some()
    }

    /// Run the call and return the decoded JSON payload.
    pub fn execute(&self) -> Result<Value> {
        let request = validate(&self.spec)?;

        let span = info_span!("execute", method = %request.method, url = %request.url);
        let _enter = span.enter();

        let cached = self.cache.as_ref().map(|cache| (cache, fingerprint(&request)));
        if let Some((cache, key)) = &cached {
            if let Some(payload) = cache.get(key) {
                debug!(fingerprint = %key, "cache hit");
                self.log(&format!("Cache hit for: {}", request.url));
                return Ok(payload);
            }
        }

        let max_attempts = self.retry.attempts();
        let mut attempt = 0;
        loop {
            attempt += 1;
            let failure = match self.attempt(&request) {
                Ok(payload) => {
                    if let Some((cache, key)) = &cached {
                        cache.put(key, &payload);
                    }
                    debug!(attempt, "request succeeded");
                    return Ok(payload);
                }
                Err(failure) => failure,
            };

            warn!(attempt, max_attempts, error = %failure, "attempt failed");
            self.log(&failure.to_string());

            if attempt >= max_attempts {
                let err = ClientError::Exhausted {
                    attempts: attempt,
                    last_failure: failure,
                };
                error!(attempts = attempt, "giving up");
                self.log(&format!("Error: {err}"));
                return Err(err);
            }

            self.log(&format!("Retrying request (attempt {attempt} of {max_attempts})"));
            let delay = self.retry.delay();
            if !delay.is_zero() {
                self.clock.sleep(delay);
            }
        }
    }

    /// `execute`, then deserialize the payload into `T`.
    pub fn execute_json<T: DeserializeOwned>(&self) -> Result<T> {
        let payload = self.execute()?;
        Ok(serde_json::from_value(payload)?)
    }

    fn attempt(&self, request: &HttpRequest) -> std::result::Result<Value, AttemptFailure> {
        debug!("sending request");
        self.log(&format!("Sending {} request to: {}", request.method, request.url));

        match self.transport.send(request) {
            TransportResult::Failure { reason } => Err(AttemptFailure::Transport(reason)),
            TransportResult::Success(response) if !response.is_success() => Err(AttemptFailure::Status {
                status: response.status,
                body: response.body,
            }),
            TransportResult::Success(response) => decode_body(&response.body),
        }
    }

    fn log(&self, message: &str) {
        if let Some(audit) = &self.audit {
            let line = format_line(self.clock.now(), message);
            if let Err(e) = audit.append(&line) {
                warn!(error = %e, "audit log write failed");
            }
        }
    }
}

impl std::fmt::Debug for RetryingClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryingClient")
            .field("spec", &self.spec)
            .field("retry", &self.retry)
            .field("cache", &self.cache)
            .field("logging", &self.audit.is_some())
            .finish_non_exhaustive()
    }
}

/// An empty 2xx body is a successful `null` and is not retried.
fn decode_body(body: &str) -> std::result::Result<Value, AttemptFailure> {
    if body.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(body).map_err(|e| AttemptFailure::Decode(e.to_string()))
}
