//! Configuration types for discogs-dl

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{Error, Result};

/// Largest page size the catalog service accepts
pub const MAX_PAGE_SIZE: u32 = 100;

/// Hard ceiling on concurrently outstanding page requests
pub const MAX_CONCURRENCY: usize = 6;

/// Main configuration for a [`CollectionClient`](crate::CollectionClient)
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    /// Catalog API base URL, without trailing slash (default: "https://api.discogs.com")
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// User-Agent header sent with every request (the catalog service rejects anonymous agents)
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Per-request timeout applied by the HTTP transport (default: 30 seconds)
    #[serde(default = "default_request_timeout", with = "duration_serde")]
    pub request_timeout: Duration,

    /// Paging and concurrency defaults
    #[serde(default)]
    pub fetch: FetchConfig,

    /// Retry sweep settings
    #[serde(default)]
    pub retry: RetryConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            user_agent: default_user_agent(),
            request_timeout: default_request_timeout(),
            fetch: FetchConfig::default(),
            retry: RetryConfig::default(),
        }
    }
}

impl Config {
    /// Check that the configuration can be used to build a client
    ///
    /// # Errors
    /// Returns [`Error::Config`] naming the offending key.
    pub fn validate(&self) -> Result<()> {
        let url = url::Url::parse(&self.base_url).map_err(|e| Error::Config {
            message: format!("invalid base URL '{}': {}", self.base_url, e),
            key: Some("base_url".to_string()),
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::Config {
                message: format!("base URL must be http or https, got '{}'", url.scheme()),
                key: Some("base_url".to_string()),
            });
        }
        if self.user_agent.trim().is_empty() {
            return Err(Error::Config {
                message: "user agent must not be empty".to_string(),
                key: Some("user_agent".to_string()),
            });
        }
        if !(1..=MAX_PAGE_SIZE).contains(&self.fetch.page_size) {
            return Err(Error::Config {
                message: format!(
                    "page size must be between 1 and {}, got {}",
                    MAX_PAGE_SIZE, self.fetch.page_size
                ),
                key: Some("page_size".to_string()),
            });
        }
        if self.fetch.max_concurrency == 0 {
            return Err(Error::Config {
                message: "max concurrency must be at least 1".to_string(),
                key: Some("max_concurrency".to_string()),
            });
        }
        Ok(())
    }

    /// Base URL with any trailing slashes removed, ready for path concatenation
    pub fn api_root(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }
}

/// Paging and concurrency preferences used when the caller does not pass explicit values
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Items requested per page; clamped to `1..=100` when a plan is built (default: 100)
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Requested number of page fetches in flight; clamped to `1..=6` (default: 6)
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            max_concurrency: default_max_concurrency(),
        }
    }
}

/// Settings for the single retry sweep over failed pages
///
/// The sweep itself always runs at most once per page; these settings only shape
/// the pause taken before it starts.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Pause before re-requesting failed pages (default: none)
    #[serde(default, with = "duration_serde")]
    pub delay: Duration,

    /// Add random jitter of up to 100% to the pause (default: false)
    #[serde(default)]
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            delay: Duration::ZERO,
            jitter: false,
        }
    }
}

// Default value functions
fn default_base_url() -> String {
    "https://api.discogs.com".to_string()
}

fn default_user_agent() -> String {
    format!("discogs-dl/{}", env!("CARGO_PKG_VERSION"))
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_page_size() -> u32 {
    MAX_PAGE_SIZE
}

fn default_max_concurrency() -> usize {
    MAX_CONCURRENCY
}

// Duration serialization helper
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
