//! Application configuration loaded from environment variables.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Default values used when a variable is not set.
pub mod defaults {
    pub const DEV_HOST: &str = "127.0.0.1";
    pub const DEV_PORT: u16 = 8080;
    pub const HISTORY_LIMIT: usize = crate::services::DEFAULT_HISTORY_LIMIT;
    pub const CHECK_INTERVAL_SECS: u64 = 60;
}

/// Runtime environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    /// Parse environment from string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "development" | "dev" => Some(Self::Development),
            "production" | "prod" => Some(Self::Production),
            _ => None,
        }
    }

    /// Check if this is a development environment.
    pub fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }

    /// Check if this is a production environment.
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Development => write!(f, "development"),
            Self::Production => write!(f, "production"),
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Runtime environment
    pub environment: Environment,
    /// Server host address
    pub host: String,
    /// Server port
    pub port: u16,
    /// Directory for the static dashboard, served under `/ui`
    pub static_dir: Option<PathBuf>,
    /// History entries kept per job
    pub history_limit: usize,
    /// Interval between scheduled runs of the built-in checks
    pub check_interval: Duration,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `RUST_ENV`: Environment (development/production) - REQUIRED
    /// - `E2E_HOST`: Server host (default: 127.0.0.1)
    /// - `E2E_PORT`: Server port (default: 8080)
    /// - `E2E_STATIC_DIR`: Dashboard assets directory (optional)
    /// - `E2E_HISTORY_LIMIT`: History entries kept per job (default: 100)
    /// - `E2E_CHECK_INTERVAL_SECS`: Seconds between check runs (default: 60)
    pub fn from_env() -> Result<Self, ConfigError> {
        let env_str = env::var("RUST_ENV").map_err(|_| ConfigError::MissingEnvVar("RUST_ENV"))?;

        let environment = Environment::parse(&env_str).ok_or(ConfigError::InvalidValue(
            "RUST_ENV must be 'development' or 'production'",
        ))?;

        let host = env::var("E2E_HOST").unwrap_or_else(|_| defaults::DEV_HOST.to_string());

        let port = env::var("E2E_PORT")
            .unwrap_or_else(|_| defaults::DEV_PORT.to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidValue("E2E_PORT must be a valid port number"))?;

        let static_dir = env::var("E2E_STATIC_DIR").ok().map(PathBuf::from);

        let history_limit = env::var("E2E_HISTORY_LIMIT")
            .unwrap_or_else(|_| defaults::HISTORY_LIMIT.to_string())
            .parse::<usize>()
            .map_err(|_| ConfigError::InvalidValue("E2E_HISTORY_LIMIT must be a valid number"))?;

        let check_interval_secs = env::var("E2E_CHECK_INTERVAL_SECS")
            .unwrap_or_else(|_| defaults::CHECK_INTERVAL_SECS.to_string())
            .parse::<u64>()
            .map_err(|_| {
                ConfigError::InvalidValue("E2E_CHECK_INTERVAL_SECS must be a valid number")
            })?;

        let config = Config {
            environment,
            host,
            port,
            static_dir,
            history_limit,
            check_interval: Duration::from_secs(check_interval_secs),
        };

        if environment.is_production() {
            config.validate_production()?;
        }

        Ok(config)
    }

    /// Reject settings that only make sense while developing.
    fn validate_production(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        if self.history_limit == 0 {
            errors.push(
                "E2E_HISTORY_LIMIT is 0. History would never be recorded; set a positive limit."
                    .to_string(),
            );
        }

        if self.check_interval.is_zero() {
            errors.push(
                "E2E_CHECK_INTERVAL_SECS is 0. Checks would never be scheduled.".to_string(),
            );
        }

        if let Some(ref dir) = self.static_dir
            && !dir.is_dir()
        {
            errors.push(format!(
                "E2E_STATIC_DIR '{}' is not a directory.",
                dir.display()
            ));
        }

        if !errors.is_empty() {
            return Err(ConfigError::ProductionValidation(errors));
        }

        Ok(())
    }

    /// Get the server bind address.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Check if running in development mode.
    pub fn is_development(&self) -> bool {
        self.environment.is_development()
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(&'static str),

    #[error("Production configuration validation failed:\n{}", .0.iter().map(|e| format!("  - {}", e)).collect::<Vec<_>>().join("\n"))]
    ProductionValidation(Vec<String>),
}
