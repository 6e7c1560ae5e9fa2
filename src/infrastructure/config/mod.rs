use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

use crate::presentation::middleware::edge::EdgeConfig;
use crate::presentation::middleware::security::SecurityConfig;

/// Runtime mode for the application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeMode {
    Local,
    Production,
}

impl std::fmt::Display for RuntimeMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Local => write!(f, "local"),
            Self::Production => write!(f, "production"),
        }
    }
}

impl std::str::FromStr for RuntimeMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "production" | "prod" => Ok(Self::Production),
            _ => Err(format!("Invalid runtime mode: {s}. Valid values: local, production")),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub mode: RuntimeMode,
    pub server: ServerConfig,
    pub edge: EdgeSettings,
    pub auth: AuthServiceConfig,
    pub logging: LoggingConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Edge pipeline settings as read from the environment.
///
/// Captured once at startup; the middleware never reads environment flags at
/// branch points.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeSettings {
    /// Global rate-limiting switch
    pub rate_limiting_enabled: bool,
    /// Set when the deployment platform already enforces equivalent limits
    pub platform_managed_limits: bool,
    /// Origin allowed by CORS headers on API responses
    pub allowed_origin: String,
    /// External media storage origin admitted into the CSP
    pub storage_origin: Option<String>,
    /// HSTS max age in seconds
    pub hsts_max_age: u64,
}

/// External auth session service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthServiceConfig {
    pub base_url: String,
    pub refresh_path: String,
    pub request_timeout_seconds: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub filter: Option<String>,
}

impl AppConfig {
    /// Load configuration based on runtime mode
    ///
    /// # Errors
    /// Returns an error if required environment variables are missing or invalid
    pub fn load() -> Result<Self, config::ConfigError> {
        let mode = std::env::var("RUN_MODE")
            .unwrap_or_else(|_| "local".to_string())
            .parse::<RuntimeMode>()
            .map_err(config::ConfigError::Message)?;

        Self::load_for_mode(mode)
    }

    /// Load configuration for a specific runtime mode
    ///
    /// # Errors
    /// Returns an error if required environment variables are missing or invalid
    pub fn load_for_mode(mode: RuntimeMode) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();

        // For local mode only, load .env.local file (if it exists)
        if mode == RuntimeMode::Local {
            builder = builder.add_source(config::File::with_name(".env.local").required(false));
        }
        // Production mode relies solely on environment variables

        builder = builder
            .add_source(config::Environment::with_prefix("FORUM_EDGE").separator("__"))
            .add_source(config::Environment::default());

        let (allowed_origin, auth_base_url) = match mode {
            RuntimeMode::Local => ("http://localhost:3000", "http://localhost:9999"),
            RuntimeMode::Production => {
                ("https://forum.example.com", "https://auth.forum.example.com")
            }
        };

        let settings = builder
            .set_default("mode", mode.to_string())?
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 3000)?
            .set_default("edge.rate_limiting_enabled", true)?
            .set_default("edge.platform_managed_limits", false)?
            .set_default("edge.allowed_origin", allowed_origin)?
            .set_default("edge.storage_origin", None::<String>)?
            .set_default("edge.hsts_max_age", 31_536_000)?
            .set_default("auth.base_url", auth_base_url)?
            .set_default("auth.refresh_path", "/session/refresh")?
            .set_default("auth.request_timeout_seconds", 5)?
            .set_default("logging.level", "info")?
            .set_default("logging.filter", None::<String>)?
            .build()?;

        settings.try_deserialize()
    }

    /// Assemble the middleware configuration from the loaded settings
    #[must_use]
    pub fn edge_config(&self) -> EdgeConfig {
        EdgeConfig {
            rate_limiting_enabled: self.edge.rate_limiting_enabled,
            platform_managed_limits: self.edge.platform_managed_limits,
            security: SecurityConfig {
                development_mode: self.mode == RuntimeMode::Local,
                storage_origin: self.edge.storage_origin.clone(),
                allowed_origin: self.edge.allowed_origin.clone(),
                hsts_max_age: self.edge.hsts_max_age,
            },
        }
    }
}

impl ServerConfig {
    /// Get the socket address for binding
    ///
    /// # Panics
    /// Panics if the host/port configuration cannot be parsed into a valid socket address
    #[must_use]
    pub fn socket_addr(&self) -> SocketAddr {
        format!("{}:{}", self.host, self.port).parse().expect("Invalid host/port configuration")
    }
}
