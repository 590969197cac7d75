//! Server configuration management.
//!
//! Consolidates all environment variable reads and provides validated configuration.

use std::net::SocketAddr;

/// Development fallback signing secrets. Deliberately non-production
/// defaults: real deployments must override them via `MOBILE_JWT_SECRET`
/// and `DESKTOP_JWT_SECRET`.
const DEV_MOBILE_SECRET: &str = "harmony_mobile_dev_secret_change_in_production";
const DEV_DESKTOP_SECRET: &str = "harmony_desktop_dev_secret_change_in_production";

/// Complete server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server bind address
    pub bind: SocketAddr,
    /// Optional Prometheus exporter bind address
    pub metrics_bind: Option<SocketAddr>,
    /// Public base URL handed to mobile clients at pairing time
    pub api_url: String,
    /// Security configuration
    pub security: SecurityConfig,
    /// Pairing behavior configuration
    pub pairing: PairingConfig,
}

/// Security-related configuration
#[derive(Debug, Clone)]
pub struct SecurityConfig {
    /// Mobile token signing secret
    pub mobile_jwt_secret: String,
    /// Desktop identity token verification secret
    pub desktop_jwt_secret: String,
    /// Expected issuer of desktop identity tokens
    pub desktop_token_issuer: String,
}

/// Pairing behavior configuration
#[derive(Debug, Clone)]
pub struct PairingConfig {
    /// Connection code TTL applied when the caller omits `expiresIn`
    pub default_code_ttl_secs: i64,
    /// Upper bound a caller-requested TTL is clamped to
    pub max_code_ttl_secs: i64,
    /// Sweeper tick interval
    pub sweep_interval_secs: u64,
    /// Redemption attempts allowed per client address per window
    pub connect_rate_limit: usize,
    /// Redemption rate limit window
    pub connect_rate_window_secs: u64,
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Arguments
    ///
    /// * `bind_override` - Optional bind address override (from CLI args)
    ///
    /// # Errors
    ///
    /// Returns error if variables are present but invalid
    pub fn from_env(bind_override: Option<SocketAddr>) -> Result<Self, ConfigError> {
        let bind = bind_override
            .or_else(|| {
                std::env::var("SERVER_BIND")
                    .ok()
                    .and_then(|s| s.parse().ok())
            })
            .unwrap_or_else(|| {
                "127.0.0.1:4000"
                    .parse()
                    .expect("Default bind address is valid")
            });

        let metrics_bind = match std::env::var("METRICS_BIND") {
            Ok(s) => Some(s.parse().map_err(|_| ConfigError::Invalid {
                var: "METRICS_BIND".to_string(),
                reason: "Must be an IP:PORT address".to_string(),
            })?),
            Err(_) => None,
        };

        let api_url = std::env::var("API_URL").unwrap_or_else(|_| format!("http://{bind}"));

        let mobile_jwt_secret = std::env::var("MOBILE_JWT_SECRET").unwrap_or_else(|_| {
            tracing::warn!("MOBILE_JWT_SECRET not set, using development fallback");
            DEV_MOBILE_SECRET.to_string()
        });
        let desktop_jwt_secret = std::env::var("DESKTOP_JWT_SECRET").unwrap_or_else(|_| {
            tracing::warn!("DESKTOP_JWT_SECRET not set, using development fallback");
            DEV_DESKTOP_SECRET.to_string()
        });
        let desktop_token_issuer =
            std::env::var("DESKTOP_TOKEN_ISSUER").unwrap_or_else(|_| "conductor-web".to_string());

        let security = SecurityConfig {
            mobile_jwt_secret,
            desktop_jwt_secret,
            desktop_token_issuer,
        };

        let pairing = PairingConfig {
            default_code_ttl_secs: parse_env_or("PAIRING_DEFAULT_TTL_SECS", 600),
            max_code_ttl_secs: parse_env_or("PAIRING_MAX_TTL_SECS", 3600),
            sweep_interval_secs: parse_env_or("PAIRING_SWEEP_INTERVAL_SECS", 60),
            connect_rate_limit: parse_env_or("CONNECT_RATE_LIMIT", 20),
            connect_rate_window_secs: parse_env_or("CONNECT_RATE_WINDOW_SECS", 60),
        };

        Ok(ServerConfig {
            bind,
            metrics_bind,
            api_url,
            security,
            pairing,
        })
    }

    /// Validate configuration after loading
    ///
    /// # Errors
    ///
    /// Returns a validation error naming the offending variable
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.security.mobile_jwt_secret.len() < 32 {
            return Err(ConfigError::Invalid {
                var: "MOBILE_JWT_SECRET".to_string(),
                reason: "Must be at least 32 characters (128-bit security)".to_string(),
            });
        }

        if self.security.desktop_jwt_secret.len() < 32 {
            return Err(ConfigError::Invalid {
                var: "DESKTOP_JWT_SECRET".to_string(),
                reason: "Must be at least 32 characters (128-bit security)".to_string(),
            });
        }

        if self.pairing.default_code_ttl_secs <= 0 {
            return Err(ConfigError::Invalid {
                var: "PAIRING_DEFAULT_TTL_SECS".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        if self.pairing.max_code_ttl_secs < self.pairing.default_code_ttl_secs {
            return Err(ConfigError::Invalid {
                var: "PAIRING_MAX_TTL_SECS".to_string(),
                reason: format!(
                    "Must be at least the default TTL ({})",
                    self.pairing.default_code_ttl_secs
                ),
            });
        }

        if self.pairing.sweep_interval_secs == 0 {
            return Err(ConfigError::Invalid {
                var: "PAIRING_SWEEP_INTERVAL_SECS".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        if self.pairing.connect_rate_limit == 0 {
            return Err(ConfigError::Invalid {
                var: "CONNECT_RATE_LIMIT".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        if self.api_url.is_empty() {
            return Err(ConfigError::Invalid {
                var: "API_URL".to_string(),
                reason: "Must not be empty".to_string(),
            });
        }

        Ok(())
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

/// Helper to parse environment variable with default fallback
fn parse_env_or<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> ServerConfig {
        ServerConfig {
            bind: "127.0.0.1:4000".parse().unwrap(),
            metrics_bind: None,
            api_url: "http://localhost:4000".to_string(),
            security: SecurityConfig {
                mobile_jwt_secret: "a".repeat(32),
                desktop_jwt_secret: "b".repeat(32),
                desktop_token_issuer: "conductor-web".to_string(),
            },
            pairing: PairingConfig {
                default_code_ttl_secs: 600,
                max_code_ttl_secs: 3600,
                sweep_interval_secs: 60,
                connect_rate_limit: 20,
                connect_rate_window_secs: 60,
            },
        }
    }

    #[test]
    fn test_valid_config_passes_validation() {
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::Invalid {
            var: "PAIRING_MAX_TTL_SECS".to_string(),
            reason: "Must be at least the default TTL (600)".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("PAIRING_MAX_TTL_SECS"));
        assert!(msg.contains("600"));
    }

    #[test]
    fn test_config_validation_short_secret() {
        let mut config = valid_config();
        config.security.mobile_jwt_secret = "short".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("MOBILE_JWT_SECRET"));
    }

    #[test]
    fn test_config_validation_max_ttl_below_default() {
        let mut config = valid_config();
        config.pairing.max_code_ttl_secs = 60;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("PAIRING_MAX_TTL_SECS"));
    }

    #[test]
    fn test_config_validation_zero_sweep_interval() {
        let mut config = valid_config();
        config.pairing.sweep_interval_secs = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("PAIRING_SWEEP_INTERVAL_SECS"));
    }

    #[test]
    fn test_config_validation_zero_rate_limit() {
        let mut config = valid_config();
        config.pairing.connect_rate_limit = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("CONNECT_RATE_LIMIT"));
    }
}
