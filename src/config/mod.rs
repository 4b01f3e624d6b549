use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
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

/// Top-level configuration for the portal engine.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub scheduler: SchedulerConfig,
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
            scheduler: SchedulerConfig::load()?,
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

/// Tracing and metrics controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Tick intervals for the reconciliation jobs plus the grace window the
/// auto-processing job honors before touching a submitted application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerConfig {
    pub application_processing_interval: Duration,
    pub eligibility_check_interval: Duration,
    pub document_verification_interval: Duration,
    pub notification_cleanup_interval: Duration,
    pub health_check_interval: Duration,
    pub grace_period: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            application_processing_interval: Duration::from_secs(300),
            eligibility_check_interval: Duration::from_secs(600),
            document_verification_interval: Duration::from_secs(900),
            notification_cleanup_interval: Duration::from_secs(3600),
            health_check_interval: Duration::from_secs(30),
            grace_period: Duration::from_secs(300),
        }
    }
}

impl SchedulerConfig {
    fn load() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            application_processing_interval: interval_var(
                "SCHEDULER_APPLICATION_INTERVAL_SECS",
                defaults.application_processing_interval,
            )?,
            eligibility_check_interval: interval_var(
                "SCHEDULER_ELIGIBILITY_INTERVAL_SECS",
                defaults.eligibility_check_interval,
            )?,
            document_verification_interval: interval_var(
                "SCHEDULER_DOCUMENT_INTERVAL_SECS",
                defaults.document_verification_interval,
            )?,
            notification_cleanup_interval: interval_var(
                "SCHEDULER_CLEANUP_INTERVAL_SECS",
                defaults.notification_cleanup_interval,
            )?,
            health_check_interval: interval_var(
                "SCHEDULER_HEALTH_INTERVAL_SECS",
                defaults.health_check_interval,
            )?,
            grace_period: interval_var("SCHEDULER_GRACE_PERIOD_SECS", defaults.grace_period)?,
        })
    }
}

fn interval_var(name: &'static str, default: Duration) -> Result<Duration, ConfigError> {
    match env::var(name) {
        Ok(raw) => {
            let secs = raw
                .trim()
                .parse::<u64>()
                .map_err(|_| ConfigError::InvalidInterval { name })?;
            if secs == 0 {
                return Err(ConfigError::InvalidInterval { name });
            }
            Ok(Duration::from_secs(secs))
        }
        Err(_) => Ok(default),
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidInterval { name: &'static str },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidInterval { name } => {
                write!(f, "{name} must be a positive number of seconds")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidPort | ConfigError::InvalidInterval { .. } => None,
            ConfigError::InvalidHost { source } => Some(source),
        }
    }
}
