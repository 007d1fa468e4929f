//! Runtime configuration, extracted from the environment.

use anyhow::Context;
use figment::Figment;
use figment::providers::Env;
use serde::Deserialize;
use std::time::Duration;

/// Default bound on any single controller request. A request that exceeds it
/// counts as an ordinary fetch failure for the caller's retry budget.
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 8;

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Base URL of the controller API, e.g. `https://controller.example.net`.
    pub controller_url: String,
    /// Bearer token attached to every controller request when present.
    #[serde(default)]
    pub api_token: Option<String>,
    /// Per-request timeout in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Config {
    /// Extract configuration from `AIRLENS_`-prefixed environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        Figment::new()
            .merge(Env::prefixed("AIRLENS_"))
            .extract()
            .context("failed to load airlens config")
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
