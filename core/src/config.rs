//! Gateway configuration.
//!
//! Values come from the environment (`QUIZ_API_URL`, `QUIZ_API_TIMEOUT_SECS`)
//! with defaults matching a locally running question service.

use std::time::Duration;

use crate::gateway::QuestionGateway;
use crate::transport::{ReqwestTransport, TransportError};

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

pub const BASE_URL_VAR: &str = "QUIZ_API_URL";
pub const TIMEOUT_VAR: &str = "QUIZ_API_TIMEOUT_SECS";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayConfig {
    pub base_url: String,
    /// Per-request timeout enforced by the HTTP client.
    pub timeout: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl GatewayConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup. Unparseable timeouts fall
    /// back to the default.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(url) = lookup(BASE_URL_VAR).filter(|u| !u.trim().is_empty()) {
            config.base_url = url.trim().to_string();
        }
        if let Some(raw) = lookup(TIMEOUT_VAR) {
            match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => config.timeout = Duration::from_secs(secs),
                _ => tracing::warn!(value = %raw, "ignoring invalid {TIMEOUT_VAR}"),
            }
        }
        config
    }

    /// Construct the production gateway. Call once at startup and share it.
    pub fn connect(&self) -> Result<QuestionGateway<ReqwestTransport>, TransportError> {
        let transport = ReqwestTransport::new(self.timeout)?;
        tracing::info!(base_url = %self.base_url, timeout = ?self.timeout, "question gateway configured");
        Ok(QuestionGateway::new(&self.base_url, transport))
    }
}
