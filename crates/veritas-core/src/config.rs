use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the verification engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct EngineConfig {
    /// Envelope format detection settings.
    #[serde(default)]
    pub envelope: EnvelopeConfig,

    /// Status list retrieval settings.
    #[serde(default)]
    pub status: StatusConfig,

    /// Policy runner settings.
    #[serde(default)]
    pub runner: RunnerConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvelopeConfig {
    /// Minimum number of hex characters before a string is considered a CWT.
    #[serde(default = "default_cwt_min_hex_length")]
    pub cwt_min_hex_length: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusConfig {
    /// How long a fetched status list stays cached, in seconds.
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
    /// Timeout for a single status list fetch, in seconds.
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct RunnerConfig {
    /// Deadline for a whole verification call, in seconds.
    #[serde(default)]
    pub policy_timeout_secs: Option<u64>,
}

fn default_cwt_min_hex_length() -> usize {
    100
}
fn default_cache_ttl_secs() -> u64 {
    300
}
fn default_fetch_timeout_secs() -> u64 {
    30
}

impl Default for EnvelopeConfig {
    fn default() -> Self {
        Self {
            cwt_min_hex_length: default_cwt_min_hex_length(),
        }
    }
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            cache_ttl_secs: default_cache_ttl_secs(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
        }
    }
}

impl StatusConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}

impl RunnerConfig {
    pub fn policy_timeout(&self) -> Option<Duration> {
        self.policy_timeout_secs.map(Duration::from_secs)
    }
}
