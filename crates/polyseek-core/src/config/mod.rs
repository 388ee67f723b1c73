//! Configuration management
//!
//! All runtime configuration is environment-driven. Every struct is also
//! constructible directly so tests never need to touch the process
//! environment.

use crate::error::{PolyseekError, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Time unit for rate-limit windows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    Second,
    Minute,
    Hour,
}

impl TimeUnit {
    /// Length of the unit in seconds
    pub fn seconds(self) -> u64 {
        match self {
            TimeUnit::Second => 1,
            TimeUnit::Minute => 60,
            TimeUnit::Hour => 3600,
        }
    }
}

impl FromStr for TimeUnit {
    type Err = PolyseekError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "second" => Ok(TimeUnit::Second),
            "minute" => Ok(TimeUnit::Minute),
            "hour" => Ok(TimeUnit::Hour),
            other => Err(PolyseekError::Config(format!(
                "unknown rate-limit time unit: {}",
                other
            ))),
        }
    }
}

/// Rate-limit policy for one service channel
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Maximum calls per `time_unit` (sliding window)
    pub rate_limit: u32,

    /// Window unit for `rate_limit`
    pub time_unit: TimeUnit,

    /// Minimum interval between consecutive calls, in seconds
    pub min_interval_seconds: f64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            rate_limit: 60,
            time_unit: TimeUnit::Minute,
            min_interval_seconds: 0.1,
        }
    }
}

impl RateLimitConfig {
    /// Read the `{PREFIX}_RATE_LIMIT*` triple from the environment
    pub fn from_env(prefix: &str) -> Result<Self> {
        let mut config = Self::default();
        if let Ok(value) = std::env::var(format!("{}_RATE_LIMIT", prefix)) {
            config.rate_limit = value
                .parse()
                .map_err(|_| PolyseekError::Config(format!("{}_RATE_LIMIT: {}", prefix, value)))?;
        }
        if let Ok(value) = std::env::var(format!("{}_RATE_LIMIT_TIME_UNIT", prefix)) {
            config.time_unit = value.parse()?;
        }
        if let Ok(value) = std::env::var(format!("{}_RATE_LIMIT_MIN_INTERVAL_SECONDS", prefix)) {
            config.min_interval_seconds = value.parse().map_err(|_| {
                PolyseekError::Config(format!(
                    "{}_RATE_LIMIT_MIN_INTERVAL_SECONDS: {}",
                    prefix, value
                ))
            })?;
        }
        Ok(config)
    }
}

/// Search engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Dimension of stored chunk embeddings
    pub embedding_dimension: usize,

    /// Store vectors as half-precision floats
    pub use_half_vec: bool,

    /// Rows fetched per store page
    pub knowledge_base_search_batch_size: usize,

    /// Retry attempts for store queries and service calls
    pub max_retries: u32,

    /// Base delay between retries in seconds (exponential backoff)
    pub retry_delay_seconds: f64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            embedding_dimension: 1024,
            use_half_vec: true,
            knowledge_base_search_batch_size: 10000,
            max_retries: 3,
            retry_delay_seconds: 1.0,
        }
    }
}

impl SearchConfig {
    /// Load from environment variables
    ///
    /// `EMBEDDING_DIMENSION` is required; everything else has defaults.
    pub fn from_env() -> Result<Self> {
        let embedding_dimension = std::env::var("EMBEDDING_DIMENSION")
            .map_err(|_| PolyseekError::Config("EMBEDDING_DIMENSION is required".to_string()))?
            .parse()
            .map_err(|_| PolyseekError::Config("EMBEDDING_DIMENSION must be an integer".into()))?;

        let mut config = Self {
            embedding_dimension,
            ..Self::default()
        };
        if let Ok(value) = std::env::var("USE_HALF_VEC") {
            config.use_half_vec = matches!(value.as_str(), "1" | "true" | "True" | "TRUE");
        }
        if let Ok(value) = std::env::var("KNOWLEDGE_BASE_SEARCH_BATCH_SIZE") {
            config.knowledge_base_search_batch_size = value.parse().map_err(|_| {
                PolyseekError::Config(format!("KNOWLEDGE_BASE_SEARCH_BATCH_SIZE: {}", value))
            })?;
        }
        if let Ok(value) = std::env::var("POLYSEEK_MAX_RETRIES") {
            config.max_retries = value
                .parse()
                .map_err(|_| PolyseekError::Config(format!("POLYSEEK_MAX_RETRIES: {}", value)))?;
        }
        if let Ok(value) = std::env::var("POLYSEEK_RETRY_DELAY_SECONDS") {
            config.retry_delay_seconds = value.parse().map_err(|_| {
                PolyseekError::Config(format!("POLYSEEK_RETRY_DELAY_SECONDS: {}", value))
            })?;
        }
        Ok(config)
    }

    /// Base retry delay as a `Duration`
    pub fn retry_delay(&self) -> std::time::Duration {
        std::time::Duration::from_secs_f64(self.retry_delay_seconds)
    }
}

/// Configuration for one external HTTP service channel
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Base URL of the service
    pub url: String,

    /// Model name sent with each request
    pub model: String,

    /// API key (optional, for authenticated services)
    #[serde(default)]
    pub api_key: Option<String>,

    /// Extra routing header for header-addressed services (translator)
    #[serde(default)]
    pub entry_point: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_timeout() -> u64 {
    30
}

impl ServiceConfig {
    /// Read the `{PREFIX}_BASE_URL` / `{PREFIX}_API_KEY` / `{PREFIX}_MODEL_NAME`
    /// quadruple from the environment
    pub fn from_env(prefix: &str) -> Result<Self> {
        let url = std::env::var(format!("{}_BASE_URL", prefix)).map_err(|_| {
            PolyseekError::Config(format!("{}_BASE_URL is required", prefix))
        })?;
        let model = std::env::var(format!("{}_MODEL_NAME", prefix)).map_err(|_| {
            PolyseekError::Config(format!("{}_MODEL_NAME is required", prefix))
        })?;
        let api_key = std::env::var(format!("{}_API_KEY", prefix)).ok();
        let entry_point = std::env::var(format!("{}_ENTRY_POINT", prefix)).ok();
        let timeout_secs = match std::env::var(format!("{}_TIMEOUT_SECONDS", prefix)) {
            Ok(value) => value
                .parse()
                .map_err(|_| PolyseekError::Config(format!("{}_TIMEOUT_SECONDS: {}", prefix, value)))?,
            Err(_) => default_timeout(),
        };
        Ok(Self {
            url,
            model,
            api_key,
            entry_point,
            timeout_secs,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn time_unit_parsing() {
        assert_eq!("second".parse::<TimeUnit>().unwrap(), TimeUnit::Second);
        assert_eq!("minute".parse::<TimeUnit>().unwrap(), TimeUnit::Minute);
        assert_eq!("hour".parse::<TimeUnit>().unwrap(), TimeUnit::Hour);
        assert!("fortnight".parse::<TimeUnit>().is_err());
    }

    #[test]
    fn time_unit_seconds() {
        assert_eq!(TimeUnit::Second.seconds(), 1);
        assert_eq!(TimeUnit::Minute.seconds(), 60);
        assert_eq!(TimeUnit::Hour.seconds(), 3600);
    }

    #[test]
    fn search_config_defaults() {
        let config = SearchConfig::default();
        assert_eq!(config.knowledge_base_search_batch_size, 10000);
        assert_eq!(config.max_retries, 3);
        assert!(config.use_half_vec);
    }
}
