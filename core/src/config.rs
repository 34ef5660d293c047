//! Process-wide API configuration.
//!
//! The base URL can be overridden with `OSRS_CLOUD_API_BASE_URL`. The
//! environment is consulted once, on the first call to `ApiConfig::global`;
//! later changes to the variable have no effect.

use std::env;
use std::sync::OnceLock;

use tracing::info;

pub const BASE_URL_ENV: &str = "OSRS_CLOUD_API_BASE_URL";
pub const DEFAULT_BASE_URL: &str = "https://api.osrs.cloud/v1/";

static GLOBAL: OnceLock<ApiConfig> = OnceLock::new();

/// Immutable client configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    base_url: String,
}

impl ApiConfig {
    /// `base_url` is normalized to end with exactly one `/`.
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: format!("{}/", base_url.trim().trim_end_matches('/')),
        }
    }

    pub fn from_env() -> Self {
        Self::from_override(env::var(BASE_URL_ENV).ok())
    }

    /// The configuration loaded from the environment on first use.
    pub fn global() -> &'static ApiConfig {
        GLOBAL.get_or_init(|| {
            let config = Self::from_env();
            info!(base_url = %config.base_url, "api base url configured");
            config
        })
    }

    fn from_override(value: Option<String>) -> Self {
        match value {
            Some(url) if !url.trim().is_empty() => Self::new(&url),
            _ => Self::default(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL of an endpoint path relative to the base.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path.trim_start_matches('/'))
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}
