//! Client tunables.
//!
//! `ClientSettings` gathers everything `ClientBuilder`'s fluent setters touch,
//! so a whole configuration can also be loaded from JSON and applied at once.
//! Missing fields take the defaults below.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::audit::DEFAULT_LOG_FILE;
use crate::cache::DEFAULT_CACHE_DIR;
use crate::http::DEFAULT_TIMEOUT_SECS;

/// How many times to try and how long to wait between tries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay_secs: u64,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay_secs: u64) -> Self {
        Self {
            max_attempts,
            delay_secs,
        }
    }

    /// Attempts actually made; never less than one.
    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    pub fn delay(&self) -> Duration {
        Duration::from_secs(self.delay_secs)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay_secs: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientSettings {
    pub timeout_secs: u64,
    pub retry: RetryPolicy,
    /// `Some(ttl)` turns caching on.
    pub cache_ttl_secs: Option<u64>,
    pub logging: bool,
    /// Root for the file cache when no store is injected.
    pub cache_dir: PathBuf,
    /// Audit log file when no sink is injected.
    pub log_file: PathBuf,
}

impl ClientSettings {
    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            retry: RetryPolicy::default(),
            cache_ttl_secs: None,
            logging: false,
            cache_dir: PathBuf::from(DEFAULT_CACHE_DIR),
            log_file: PathBuf::from(DEFAULT_LOG_FILE),
        }
    }
}
