//! Retrying, caching HTTP request client.
//!
//! # Overview
//! A `RetryingClient` describes one outbound call (url, method, headers,
//! JSON body, timeout) and executes it on demand: validate, answer from the
//! cache while fresh, otherwise try the transport up to a fixed number of
//! times with a fixed delay, then cache and return the decoded JSON.
//!
//! # Design
//! - Configuration is assembled on a `ClientBuilder` and frozen by `build()`.
//! - The network (`Transport`), cache medium (`CacheStore`), audit sink
//!   (`AuditLog`) and time (`Clock`) are injected capabilities. Production
//!   defaults are `UreqTransport`, `FileCache`, `FileLog` and `SystemClock`;
//!   `MemoryCache`, `MemoryLog` and `ManualClock` exist for tests and
//!   in-process use.
//! - A failed attempt is a value (`AttemptFailure`), not an error; only
//!   validation problems and exhaustion reach the caller.
//! - Diagnostics are emitted with `tracing`; the audit log is the separate,
//!   opt-in, line-oriented record.

pub mod audit;
pub mod cache;
pub mod client;
pub mod clock;
pub mod config;
pub mod error;
pub mod http;
pub mod transport;
pub mod validate;

pub use audit::{AuditLog, FileLog, MemoryLog};
pub use cache::{fingerprint, CacheEntry, CacheStore, FileCache, MemoryCache, ResponseCache, DEFAULT_CACHE_TTL};
pub use client::{ClientBuilder, RetryingClient};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ClientSettings, RetryPolicy};
pub use error::{AttemptFailure, ClientError, ValidationError};
pub use http::{HttpMethod, HttpRequest, HttpResponse, RequestSpec};
pub use transport::{Transport, TransportResult, UreqTransport};
pub use validate::validate;
