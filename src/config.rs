//! Engine configuration.
//!
//! One [`EngineConfig`] value is built by the caller and passed into
//! [`crate::engine::Engine::new`]; there is no process-wide mutable
//! configuration. Validation happens once, at engine construction.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use url::Url;

use crate::cache::DEFAULT_TTL_DAYS;
use crate::session::{DEFAULT_MAX_ATTEMPTS, RetryPolicy};

/// Default minimum spacing between outbound requests.
pub const DEFAULT_MIN_REQUEST_INTERVAL: Duration = Duration::from_millis(1000);

/// Default hard bound on pages followed within one pagination walk.
pub const DEFAULT_MAX_PAGES: u32 = 1000;

/// Empirically observed ceiling on results returned by one filtered view.
pub const DEFAULT_RESULT_CAP: u64 = 5400;

/// Rating count above which the dictionary pass kicks in at rigor >= 2.
pub const DEFAULT_DICTIONARY_TRIGGER: u64 = 3000;

/// Dictionary wall-clock budget granted per rigor level (level 2 => 2 min).
pub const DEFAULT_DICTIONARY_BUDGET_PER_LEVEL: Duration = Duration::from_secs(60);

/// Configuration errors surfaced before any network traffic happens.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A numeric setting that must be positive was zero.
    #[error("{setting} must be greater than zero")]
    MustBePositive {
        /// Name of the offending setting.
        setting: &'static str,
    },

    /// The base URL cannot serve as a join base.
    #[error("base URL {url} cannot have paths joined onto it")]
    UnusableBaseUrl {
        /// The offending URL.
        url: String,
    },
}

/// Escalation thresholds tuned against the source's undocumented behavior.
///
/// These are empirical constants, not invariants; the external caps may
/// drift, so they stay configurable.
#[derive(Debug, Clone)]
pub struct RigorThresholds {
    /// Per-sub-query result ceiling imposed by the source.
    pub result_cap: u64,
    /// Total rating count above which the dictionary pass runs.
    pub dictionary_trigger: u64,
    /// Wall-clock budget granted per rigor level for the dictionary pass.
    pub budget_per_level: Duration,
}

impl Default for RigorThresholds {
    fn default() -> Self {
        Self {
            result_cap: DEFAULT_RESULT_CAP,
            dictionary_trigger: DEFAULT_DICTIONARY_TRIGGER,
            budget_per_level: DEFAULT_DICTIONARY_BUDGET_PER_LEVEL,
        }
    }
}

/// Everything the engine needs for one run.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Root URL of the source site.
    pub base_url: Url,
    /// Directory holding cached pages.
    pub cache_root: PathBuf,
    /// Age beyond which a cached page is treated as a miss.
    pub cache_ttl: Duration,
    /// Optional path to the cookie credential file.
    pub credential_path: Option<PathBuf>,
    /// Default dictionary word list for the rigor >= 2 fallback.
    pub dictionary_path: Option<PathBuf>,
    /// Minimum spacing between outbound requests.
    pub min_request_interval: Duration,
    /// Backoff policy for transient failures.
    pub retry: RetryPolicy,
    /// Hard bound on pages followed within one pagination walk.
    pub max_pages: u32,
    /// Escalation thresholds for reviewer enumeration.
    pub thresholds: RigorThresholds,
    /// User-Agent header sent with every request.
    pub user_agent: String,
}

impl EngineConfig {
    /// Creates a configuration with defaults for everything but the base URL.
    ///
    /// The cache lands under the system temp directory so independent tools
    /// built on the engine share one page cache.
    #[must_use]
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            cache_root: std::env::temp_dir().join("shelfgraph-cache"),
            cache_ttl: Duration::from_secs(DEFAULT_TTL_DAYS * 24 * 60 * 60),
            credential_path: None,
            dictionary_path: None,
            min_request_interval: DEFAULT_MIN_REQUEST_INTERVAL,
            retry: RetryPolicy::with_max_attempts(DEFAULT_MAX_ATTEMPTS),
            max_pages: DEFAULT_MAX_PAGES,
            thresholds: RigorThresholds::default(),
            user_agent: concat!("shelfgraph/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }

    /// Sets the cache TTL in days.
    #[must_use]
    pub fn with_cache_ttl_days(mut self, days: u64) -> Self {
        self.cache_ttl = Duration::from_secs(days * 24 * 60 * 60);
        self
    }

    /// Sets the credential file path.
    #[must_use]
    pub fn with_credential_path(mut self, path: PathBuf) -> Self {
        self.credential_path = Some(path);
        self
    }

    /// Checks the configuration for settings that can never work.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] describing the first violation found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.base_url.cannot_be_a_base() {
            return Err(ConfigError::UnusableBaseUrl {
                url: self.base_url.to_string(),
            });
        }
        if self.max_pages == 0 {
            return Err(ConfigError::MustBePositive {
                setting: "max_pages",
            });
        }
        if self.cache_ttl.is_zero() {
            return Err(ConfigError::MustBePositive {
                setting: "cache_ttl",
            });
        }
        if self.thresholds.result_cap == 0 {
            return Err(ConfigError::MustBePositive {
                setting: "thresholds.result_cap",
            });
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://books.example").unwrap()
    }

    #[test]
    fn test_defaults_validate() {
        let config = EngineConfig::new(base());
        assert!(config.validate().is_ok());
        assert_eq!(config.cache_ttl, Duration::from_secs(31 * 24 * 60 * 60));
        assert_eq!(config.thresholds.result_cap, 5400);
        assert_eq!(config.thresholds.dictionary_trigger, 3000);
    }

    #[test]
    fn test_zero_max_pages_rejected() {
        let mut config = EngineConfig::new(base());
        config.max_pages = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MustBePositive { setting: "max_pages" })
        ));
    }

    #[test]
    fn test_non_base_url_rejected() {
        let config = EngineConfig::new(Url::parse("data:text/plain,hi").unwrap());
        assert!(matches!(
            config.validate(),
            Err(ConfigError::UnusableBaseUrl { .. })
        ));
    }

    #[test]
    fn test_with_cache_ttl_days() {
        let config = EngineConfig::new(base()).with_cache_ttl_days(2);
        assert_eq!(config.cache_ttl, Duration::from_secs(2 * 24 * 60 * 60));
    }
}
