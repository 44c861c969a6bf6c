use std::collections::BTreeMap;
use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use crate::workflows::assessment::{InvokerSettings, FALLBACK_SIGNAL_SCORE};

const PRODUCER_PREFIX: &str = "APP_PRODUCER_";
const PRODUCER_SUFFIX: &str = "_URL";

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub assessment: AssessmentSettings,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            assessment: AssessmentSettings::from_env()?,
        })
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Producer wiring and per-call limits for the signal invoker.
#[derive(Debug, Clone, PartialEq)]
pub struct AssessmentSettings {
    /// Optional JSON risk policy; the built-in standard policy applies when unset.
    pub policy_path: Option<PathBuf>,
    pub signal_timeout: Duration,
    pub fallback_score: f64,
    /// Remote producer URL keyed by lower-case signal name.
    pub producer_endpoints: BTreeMap<String, String>,
}

impl Default for AssessmentSettings {
    fn default() -> Self {
        let invoker = InvokerSettings::default();
        Self {
            policy_path: None,
            signal_timeout: invoker.timeout,
            fallback_score: FALLBACK_SIGNAL_SCORE,
            producer_endpoints: BTreeMap::new(),
        }
    }
}

impl AssessmentSettings {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let policy_path = env::var("APP_POLICY_PATH")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from);

        let signal_timeout = match env::var("APP_SIGNAL_TIMEOUT_MS") {
            Ok(raw) => match raw.trim().parse::<u64>() {
                Ok(millis) if millis > 0 => Duration::from_millis(millis),
                _ => return Err(ConfigError::InvalidSignalTimeout),
            },
            Err(_) => defaults.signal_timeout,
        };

        let fallback_score = match env::var("APP_SIGNAL_FALLBACK_SCORE") {
            Ok(raw) => match raw.trim().parse::<f64>() {
                Ok(score) if (0.0..=1.0).contains(&score) => score,
                _ => return Err(ConfigError::InvalidFallbackScore),
            },
            Err(_) => defaults.fallback_score,
        };

        let producer_endpoints = env::vars()
            .filter_map(|(key, value)| {
                let signal = key
                    .strip_prefix(PRODUCER_PREFIX)?
                    .strip_suffix(PRODUCER_SUFFIX)?;
                let value = value.trim();
                if signal.is_empty() || value.is_empty() {
                    return None;
                }
                Some((signal.to_ascii_lowercase(), value.to_string()))
            })
            .collect();

        Ok(Self {
            policy_path,
            signal_timeout,
            fallback_score,
            producer_endpoints,
        })
    }

    pub fn invoker_settings(&self) -> InvokerSettings {
        InvokerSettings {
            timeout: self.signal_timeout,
            fallback_score: self.fallback_score,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidSignalTimeout,
    InvalidFallbackScore,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidSignalTimeout => {
                write!(f, "APP_SIGNAL_TIMEOUT_MS must be a positive number of milliseconds")
            }
            ConfigError::InvalidFallbackScore => {
                write!(f, "APP_SIGNAL_FALLBACK_SCORE must be a number in [0, 1]")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidSignalTimeout
            | ConfigError::InvalidFallbackScore => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::{Mutex, OnceLock};

    fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    fn reset_env() {
        env::remove_var("APP_ENV");
        env::remove_var("APP_HOST");
        env::remove_var("APP_PORT");
        env::remove_var("APP_LOG_LEVEL");
        env::remove_var("APP_POLICY_PATH");
        env::remove_var("APP_SIGNAL_TIMEOUT_MS");
        env::remove_var("APP_SIGNAL_FALLBACK_SCORE");
        for (key, _) in env::vars() {
            if key.starts_with(PRODUCER_PREFIX) {
                env::remove_var(key);
            }
        }
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.telemetry.log_level, "info");
        assert_eq!(config.assessment, AssessmentSettings::default());
        assert_eq!(config.assessment.signal_timeout, Duration::from_secs(5));
        assert_eq!(config.assessment.fallback_score, 0.3);
    }

    #[test]
    fn accepts_localhost_host() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_HOST", "localhost");
        let config = AppConfig::load().expect("config loads");
        let addr = config.server.socket_addr().expect("localhost resolves");
        assert_eq!(addr, SocketAddr::new(IpAddr::from([127, 0, 0, 1]), 3000));
        reset_env();
    }

    #[test]
    fn reads_assessment_settings_and_producer_endpoints() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_SIGNAL_TIMEOUT_MS", "750");
        env::set_var("APP_SIGNAL_FALLBACK_SCORE", "0.4");
        env::set_var("APP_PRODUCER_ENTITY_URL", "http://entity.internal/score");
        env::set_var("APP_PRODUCER_NETWORK_URL", "  ");

        let config = AppConfig::load().expect("config loads");
        let settings = config.assessment.invoker_settings();
        assert_eq!(settings.timeout, Duration::from_millis(750));
        assert_eq!(settings.fallback_score, 0.4);
        assert_eq!(
            config.assessment.producer_endpoints.get("entity").map(String::as_str),
            Some("http://entity.internal/score")
        );
        assert!(!config.assessment.producer_endpoints.contains_key("network"));
        reset_env();
    }

    #[test]
    fn rejects_invalid_assessment_settings() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_SIGNAL_TIMEOUT_MS", "0");
        assert!(matches!(
            AppConfig::load(),
            Err(ConfigError::InvalidSignalTimeout)
        ));

        reset_env();
        env::set_var("APP_SIGNAL_FALLBACK_SCORE", "1.5");
        assert!(matches!(
            AppConfig::load(),
            Err(ConfigError::InvalidFallbackScore)
        ));
        reset_env();
    }
}
