//! Environment-driven settings
//!
//! Read once at startup (after `.env` has been loaded) and handed to the
//! composition root. Nothing else in the crate reads the environment.

use crate::market_data::FallbackPolicy;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_POLICY_DB_PATH: &str = "data/policies.json";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_MARKET_DATA_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// `USE_SAMPLE_DATA=1`: never touch the live provider
    pub use_sample_data: bool,
    /// `ALLOW_SAMPLE_FALLBACK` (default `1`)
    pub allow_sample_fallback: bool,
    pub policy_db_path: PathBuf,
    pub port: u16,
    pub log_level: String,
    pub market_data_timeout: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            use_sample_data: false,
            allow_sample_fallback: true,
            policy_db_path: PathBuf::from(DEFAULT_POLICY_DB_PATH),
            port: DEFAULT_PORT,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            market_data_timeout: Duration::from_secs(DEFAULT_MARKET_DATA_TIMEOUT_SECS),
        }
    }
}

impl Settings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build settings from any key → value source
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let use_sample_data = lookup("USE_SAMPLE_DATA").as_deref() == Some("1");
        let allow_sample_fallback = lookup("ALLOW_SAMPLE_FALLBACK")
            .map(|v| v == "1")
            .unwrap_or(defaults.allow_sample_fallback);

        let policy_db_path = lookup("POLICY_DB_PATH")
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or(defaults.policy_db_path);

        let port = lookup("PORT")
            .or_else(|| lookup("API_PORT"))
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(defaults.port);

        let log_level = lookup("FINAGENT_LOG_LEVEL")
            .filter(|v| !v.trim().is_empty())
            .map(|v| v.trim().to_lowercase())
            .unwrap_or(defaults.log_level);

        let market_data_timeout = lookup("MARKET_DATA_TIMEOUT_SECS")
            .and_then(|v| v.trim().parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
            .unwrap_or(defaults.market_data_timeout);

        Self {
            use_sample_data,
            allow_sample_fallback,
            policy_db_path,
            port,
            log_level,
            market_data_timeout,
        }
    }

    pub fn fallback_policy(&self) -> FallbackPolicy {
        FallbackPolicy {
            use_sample: self.use_sample_data,
            allow_fallback: self.use_sample_data || self.allow_sample_fallback,
        }
    }
}
