use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

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

/// Longest statistics cache lifetime accepted from the environment (one year).
pub const MAX_STATISTICS_CACHE_TTL_SECS: u64 = 365 * 24 * 60 * 60;

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub risk: RiskConfig,
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

        let defaults = RiskConfig::default();
        let overdue_monitoring_days = parse_var(
            "APP_OVERDUE_MONITORING_DAYS",
            defaults.overdue_monitoring_days,
        )?;
        let cache_ttl_secs = parse_var(
            "APP_STATISTICS_CACHE_TTL_SECS",
            defaults.statistics_cache_ttl.as_secs(),
        )?;
        let dashboard_list_limit =
            parse_var("APP_DASHBOARD_LIST_LIMIT", defaults.dashboard_list_limit)?;
        let high_severity_threshold = parse_var(
            "APP_HIGH_SEVERITY_THRESHOLD",
            defaults.high_severity_threshold,
        )?;

        if overdue_monitoring_days < 0 {
            return Err(ConfigError::InvalidValue {
                key: "APP_OVERDUE_MONITORING_DAYS",
            });
        }
        if cache_ttl_secs > MAX_STATISTICS_CACHE_TTL_SECS {
            return Err(ConfigError::InvalidValue {
                key: "APP_STATISTICS_CACHE_TTL_SECS",
            });
        }
        if !(1.0..=10.0).contains(&high_severity_threshold) {
            return Err(ConfigError::InvalidValue {
                key: "APP_HIGH_SEVERITY_THRESHOLD",
            });
        }

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig {
                log_level,
                ansi: environment == AppEnvironment::Development,
            },
            risk: RiskConfig {
                overdue_monitoring_days,
                statistics_cache_ttl: Duration::from_secs(cache_ttl_secs),
                dashboard_list_limit,
                high_severity_threshold,
            },
        })
    }
}

fn parse_var<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidValue { key }),
        Err(_) => Ok(default),
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
    /// Colored output, only enabled for local development.
    pub ansi: bool,
}

/// Tunables for the risk management engine, injected into the service at start-up.
#[derive(Debug, Clone, PartialEq)]
pub struct RiskConfig {
    /// An active employee without monitoring inside this many days is overdue.
    pub overdue_monitoring_days: i64,
    pub statistics_cache_ttl: Duration,
    /// Cap applied to each dashboard list.
    pub dashboard_list_limit: usize,
    pub high_severity_threshold: f64,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            overdue_monitoring_days: 7,
            statistics_cache_ttl: Duration::from_secs(3600),
            dashboard_list_limit: 10,
            high_severity_threshold: 8.0,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidValue { key: &'static str },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidValue { key } => write!(f, "{key} has an invalid value"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidPort | ConfigError::InvalidValue { .. } => None,
            ConfigError::InvalidHost { source } => Some(source),
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
        env::remove_var("APP_OVERDUE_MONITORING_DAYS");
        env::remove_var("APP_STATISTICS_CACHE_TTL_SECS");
        env::remove_var("APP_DASHBOARD_LIST_LIMIT");
        env::remove_var("APP_HIGH_SEVERITY_THRESHOLD");
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
        assert!(config.telemetry.ansi);
        assert_eq!(config.risk, RiskConfig::default());
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
    fn reads_risk_overrides() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_ENV", "production");
        env::set_var("APP_OVERDUE_MONITORING_DAYS", "14");
        env::set_var("APP_STATISTICS_CACHE_TTL_SECS", "60");
        env::set_var("APP_DASHBOARD_LIST_LIMIT", "5");
        let config = AppConfig::load().expect("config loads");
        assert_eq!(config.environment, AppEnvironment::Production);
        assert!(!config.telemetry.ansi);
        assert_eq!(config.risk.overdue_monitoring_days, 14);
        assert_eq!(config.risk.statistics_cache_ttl, Duration::from_secs(60));
        assert_eq!(config.risk.dashboard_list_limit, 5);
        reset_env();
    }

    #[test]
    fn rejects_malformed_risk_values() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_HIGH_SEVERITY_THRESHOLD", "eleven");
        match AppConfig::load() {
            Err(ConfigError::InvalidValue { key }) => {
                assert_eq!(key, "APP_HIGH_SEVERITY_THRESHOLD")
            }
            other => panic!("expected invalid value, got {other:?}"),
        }

        env::set_var("APP_HIGH_SEVERITY_THRESHOLD", "12");
        assert!(matches!(
            AppConfig::load(),
            Err(ConfigError::InvalidValue { .. })
        ));
        reset_env();
    }

    #[test]
    fn rejects_cache_ttl_beyond_one_year() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_STATISTICS_CACHE_TTL_SECS", u64::MAX.to_string());
        match AppConfig::load() {
            Err(ConfigError::InvalidValue { key }) => {
                assert_eq!(key, "APP_STATISTICS_CACHE_TTL_SECS")
            }
            other => panic!("expected invalid value, got {other:?}"),
        }

        env::set_var(
            "APP_STATISTICS_CACHE_TTL_SECS",
            MAX_STATISTICS_CACHE_TTL_SECS.to_string(),
        );
        let config = AppConfig::load().expect("one year is accepted");
        assert_eq!(
            config.risk.statistics_cache_ttl,
            Duration::from_secs(MAX_STATISTICS_CACHE_TTL_SECS)
        );
        reset_env();
    }
}
