//! Error types for the request client.
//!
//! # Design
//! Only two things ever reach the caller: a `ValidationError`, raised before
//! any cache or network activity, and `ClientError::Exhausted`, raised once
//! every attempt has failed. Individual attempt failures are `AttemptFailure`
//! values that the retry loop records and logs; they only surface as the
//! `last_failure` text of an exhausted call.

use thiserror::Error;

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;

/// The request description is unusable. Never retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("empty url")]
    EmptyUrl,

    /// The url did not parse as an absolute URL with a host.
    #[error("malformed url: {0}")]
    MalformedUrl(String),

    #[error("unsupported method: {0}")]
    UnsupportedMethod(String),

    #[error("timeout must be at least one second")]
    ZeroTimeout,
}

/// Why a single attempt did not produce a payload.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AttemptFailure {
    /// DNS, connect, TLS, timeout, or any other non-HTTP failure.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The exchange completed with a non-2xx status.
    #[error("Request failed with status code: {status}")]
    Status { status: u16, body: String },

    /// A 2xx response whose body is not JSON.
    #[error("Invalid JSON response: {0}")]
    Decode(String),
}

/// Errors returned by `RetryingClient::execute`.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid request: {0}")]
    Validation(#[from] ValidationError),

    /// Every configured attempt failed.
    #[error("Request failed after {attempts} attempts")]
    Exhausted {
        attempts: u32,
        #[source]
        last_failure: AttemptFailure,
    },

    /// The payload did not match the type asked for by `execute_json`.
    #[error("response did not match the expected shape: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ClientError {
    /// Number of attempts made before giving up, if any were made.
    pub fn attempts(&self) -> Option<u32> {
        match self {
            ClientError::Exhausted { attempts, .. } => Some(*attempts),
            _ => None,
        }
    }
}
