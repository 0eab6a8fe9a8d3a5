use chrono::NaiveTime;
use chrono_tz::Tz;
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::adapters::RateLimiter;
use crate::cache::RefreshPolicy;
use crate::services::RetryPolicy;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub cache: CacheConfig,
    pub refresh: RefreshConfig,
    pub upstream: UpstreamConfig,
    pub retry: RetryConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Cache document location. Defaults to the platform cache directory.
    pub path: Option<PathBuf>,
}

impl CacheConfig {
    /// Resolved cache file path
    pub fn resolved_path(&self) -> PathBuf {
        if let Some(path) = &self.path {
            return path.clone();
        }
        match dirs::cache_dir() {
            Some(base) => base.join("front-office").join("nba_cache.json"),
            None => PathBuf::from("data/nba_cache.json"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RefreshConfig {
    /// Daily game-log invalidation times ("HH:MM") in the reference zone
    pub boundaries: Vec<String>,
    /// IANA name of the reference time zone
    pub timezone: String,
    /// Schedule partition time-to-live
    pub schedule_ttl_hours: u64,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            // 01:00 after the late games end, 15:00 before the first tip-off
            boundaries: vec!["01:00".to_string(), "15:00".to_string()],
            timezone: "America/Los_Angeles".to_string(),
            schedule_ttl_hours: 24,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Base URL of the stats endpoints (league game log)
    pub stats_base_url: String,
    /// Full URL of the league schedule document
    pub schedule_url: String,
    /// Season label such as "2025-26". Derived from the current date when unset.
    pub season: Option<String>,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
    /// Minimum spacing between stats requests in milliseconds
    pub min_interval_ms: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            stats_base_url: "https://stats.nba.com/stats".to_string(),
            schedule_url: "https://cdn.nba.com/static/json/staticData/scheduleLeagueV2.json"
                .to_string(),
            season: None,
            timeout_secs: 15,
            min_interval_ms: 600,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Retries after the first failed game-log attempt
    pub max_retries: u32,
    /// Base delay for exponential backoff
    pub base_delay_ms: u64,
    /// Flat pause added after any failed attempt
    pub error_pause_ms: u64,
    /// Upper bound for a single backoff sleep
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay_ms: 1000,
            error_pause_ms: 2000,
            max_delay_ms: 30_000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Enable JSON formatted logs
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from a directory, then the environment
    pub fn load_from<P: AsRef<Path>>(config_dir: P) -> Result<Self, ConfigError> {
        let config_dir = config_dir.as_ref();

        let builder = Config::builder()
            .set_default("logging.level", "info")?
            .set_default("logging.json", false)?
            // Load default config file
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            // Load environment-specific config (e.g., config/production.toml)
            .add_source(
                File::from(config_dir.join(
                    std::env::var("FRONT_OFFICE_ENV").unwrap_or_else(|_| "development".to_string()),
                ))
                .required(false),
            )
            // Override with environment variables (FRONT_OFFICE__CACHE__PATH, etc.)
            .add_source(
                Environment::with_prefix("FRONT_OFFICE")
                    .separator("__")
                    .try_parsing(true),
            );

        builder.build()?.try_deserialize()
    }

    /// Game-log boundaries, zone and schedule TTL
    pub fn refresh_policy(&self) -> Result<RefreshPolicy, String> {
        let boundaries = self
            .refresh
            .boundaries
            .iter()
            .map(|b| {
                NaiveTime::parse_from_str(b, "%H:%M")
                    .map_err(|e| format!("invalid refresh boundary {b:?}: {e}"))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let zone: Tz = self
            .refresh
            .timezone
            .parse()
            .map_err(|e| format!("unknown timezone {:?}: {}", self.refresh.timezone, e))?;

        Ok(RefreshPolicy::new(
            boundaries,
            zone,
            chrono::Duration::hours(self.refresh.schedule_ttl_hours as i64),
        ))
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.retry.max_retries,
            base_delay: Duration::from_millis(self.retry.base_delay_ms),
            error_pause: Duration::from_millis(self.retry.error_pause_ms),
            max_delay: Duration::from_millis(self.retry.max_delay_ms),
        }
    }

    pub fn rate_limiter(&self) -> RateLimiter {
        RateLimiter::new(Duration::from_millis(self.upstream.min_interval_ms))
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if let Err(e) = self.refresh_policy() {
            errors.push(e);
        }

        if self.refresh.schedule_ttl_hours == 0 {
            errors.push("schedule_ttl_hours must be positive".to_string());
        }

        if self.upstream.timeout_secs == 0 {
            errors.push("upstream timeout_secs must be positive".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
