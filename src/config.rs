//! Configuration management for the security gateway

use anyhow::{Context, Result};
use config::{Config, File};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub redis: RedisConfig,
    pub auth: AuthConfig,
    pub limits: RateLimitsConfig,
    pub detection: DetectionConfig,
    pub logging: LoggingConfig,
}

/// Redis connection configuration for the persistent event backend
#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    /// Redis server URL
    pub url: String,
    /// Key namespace prefix for security event lists
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
    /// Bound on every backend call; a timed-out call counts as backend
    /// unavailable
    #[serde(default = "default_redis_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_key_prefix() -> String {
    "security_events".to_string()
}

fn default_redis_timeout_ms() -> u64 {
    2000
}

/// Token issuance configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Server-held HMAC secret for token signatures
    pub secret_key: String,
    /// Access token lifetime in seconds
    #[serde(default = "default_token_ttl_secs")]
    pub token_ttl_secs: u64,
}

fn default_token_ttl_secs() -> u64 {
    1800
}

/// Per-route request ceilings
#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitsConfig {
    #[serde(default = "default_login_limit")]
    pub login: RouteLimit,
    #[serde(default = "default_detect_limit")]
    pub detect: RouteLimit,
    #[serde(default = "default_admin_limit")]
    pub admin: RouteLimit,
}

/// A (max count, window) pair declared by a route
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
pub struct RouteLimit {
    pub max_requests: u32,
    pub window_secs: u64,
}

impl RouteLimit {
    pub fn new(max_requests: u32, window_secs: u64) -> Self {
        Self {
            max_requests,
            window_secs,
        }
    }

    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}

fn default_login_limit() -> RouteLimit {
    RouteLimit::new(5, 60)
}

fn default_detect_limit() -> RouteLimit {
    RouteLimit::new(10, 60)
}

fn default_admin_limit() -> RouteLimit {
    RouteLimit::new(20, 60)
}

/// Anomaly detection configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DetectionConfig {
    /// Retention of per-subject event lists in the backend
    #[serde(default = "default_event_ttl_secs")]
    pub event_ttl_secs: u64,
    /// Retention of recorded alerts
    #[serde(default = "default_alert_retention_secs")]
    pub alert_retention_secs: u64,
    /// Reserved threshold for a continuous pattern score. Declared for
    /// parity with the rule table but no producer reports such a score yet.
    #[serde(default = "default_suspicious_pattern_score")]
    pub suspicious_pattern_score: f64,
}

fn default_event_ttl_secs() -> u64 {
    3600
}

fn default_alert_retention_secs() -> u64 {
    86400
}

fn default_suspicious_pattern_score() -> f64 {
    0.8
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log format (json, pretty)
    pub format: String,
}

impl AppConfig {
    /// Load configuration from the default file location
    pub fn load() -> Result<Self> {
        Self::load_from_path("config/config.toml")
    }

    /// Load configuration from a specific path
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from(path.as_ref()))
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            redis: RedisConfig {
                url: "redis://localhost:6379".to_string(),
                key_prefix: default_key_prefix(),
                timeout_ms: default_redis_timeout_ms(),
            },
            auth: AuthConfig {
                secret_key: "change-me-in-production".to_string(),
                token_ttl_secs: default_token_ttl_secs(),
            },
            limits: RateLimitsConfig {
                login: default_login_limit(),
                detect: default_detect_limit(),
                admin: default_admin_limit(),
            },
            detection: DetectionConfig {
                event_ttl_secs: default_event_ttl_secs(),
                alert_retention_secs: default_alert_retention_secs(),
                suspicious_pattern_score: default_suspicious_pattern_score(),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.redis.url, "redis://localhost:6379");
        assert_eq!(config.auth.token_ttl_secs, 1800);
        assert_eq!(config.limits.login, RouteLimit::new(5, 60));
        assert_eq!(config.limits.detect, RouteLimit::new(10, 60));
        assert_eq!(config.limits.admin, RouteLimit::new(20, 60));
        assert_eq!(config.detection.event_ttl_secs, 3600);
    }

    #[test]
    fn test_route_limit_window() {
        let limit = RouteLimit::new(5, 60);
        assert_eq!(limit.window(), Duration::from_secs(60));
    }
}
