//! Configuration module
//!
//! Server, upload and session-store settings, read from the environment
//! (and an optional `.env` file) at startup.

use std::env;
use std::str::FromStr;

const SERVER_PORT: u16 = 5000;
const SERVER_HOST: &str = "0.0.0.0";
const MAX_UPLOAD_MB: usize = 20;
const MAX_SESSIONS: usize = 1000;
const SESSION_IDLE_TTL_SECS: u64 = 3600;
const SESSION_SWEEP_INTERVAL_SECS: u64 = 60;
const REQUEST_TIMEOUT_SECS: u64 = 60;
const HTTP_CONCURRENCY_LIMIT: usize = 256;
const SESSION_SHARD_COUNT: usize = 16;
const MAX_HISTORY_DEPTH: usize = 50;
const ALLOWED_EXTENSIONS: &str = "png,jpg,jpeg,bmp,tif,tiff,webp";
const ALLOWED_CONTENT_TYPES: &str =
    "image/png,image/jpeg,image/bmp,image/x-ms-bmp,image/tiff,image/webp,application/octet-stream";

/// Console output format for the tracing subscriber.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

impl FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "compact" | "pretty" | "text" => Ok(LogFormat::Compact),
            "json" => Ok(LogFormat::Json),
            other => Err(anyhow::anyhow!(
                "LOG_FORMAT must be 'compact' or 'json', got '{}'",
                other
            )),
        }
    }
}

/// Engine configuration
#[derive(Clone, Debug)]
pub struct EngineConfig {
    pub server_host: String,
    pub server_port: u16,
    pub cors_origins: Vec<String>,
    pub environment: String,
    pub log_format: LogFormat,
    // Upload limits
    pub max_upload_bytes: usize,
    pub allowed_extensions: Vec<String>,
    pub allowed_content_types: Vec<String>,
    // Session store
    pub max_sessions: usize,
    pub session_idle_ttl_secs: u64,
    /// 0 disables the background sweeper.
    pub session_sweep_interval_secs: u64,
    pub session_shard_count: usize,
    /// Applies allowed per session before an undo or reset is required.
    pub max_history_depth: usize,
    // HTTP
    pub request_timeout_secs: u64,
    pub http_concurrency_limit: usize,
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            server_host: SERVER_HOST.to_string(),
            server_port: SERVER_PORT,
            cors_origins: vec!["*".to_string()],
            environment: "development".to_string(),
            log_format: LogFormat::Compact,
            max_upload_bytes: MAX_UPLOAD_MB * 1024 * 1024,
            allowed_extensions: split_list(ALLOWED_EXTENSIONS),
            allowed_content_types: split_list(ALLOWED_CONTENT_TYPES),
            max_sessions: MAX_SESSIONS,
            session_idle_ttl_secs: SESSION_IDLE_TTL_SECS,
            session_sweep_interval_secs: SESSION_SWEEP_INTERVAL_SECS,
            session_shard_count: SESSION_SHARD_COUNT,
            max_history_depth: MAX_HISTORY_DEPTH,
            request_timeout_secs: REQUEST_TIMEOUT_SECS,
            http_concurrency_limit: HTTP_CONCURRENCY_LIMIT,
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let cors_origins: Vec<String> = env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "*".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let server_port = env::var("PORT")
            .unwrap_or_else(|_| SERVER_PORT.to_string())
            .parse()
            .map_err(|_| anyhow::anyhow!("PORT must be a valid number"))?;

        let log_format = match env::var("LOG_FORMAT") {
            Ok(raw) => raw.parse()?,
            Err(_) => LogFormat::default(),
        };

        let config = EngineConfig {
            server_host: env::var("HOST").unwrap_or_else(|_| SERVER_HOST.to_string()),
            server_port,
            cors_origins,
            environment,
            log_format,
            max_upload_bytes: env_or("MAX_UPLOAD_MB", MAX_UPLOAD_MB) * 1024 * 1024,
            allowed_extensions: split_list(
                &env::var("ALLOWED_EXTENSIONS").unwrap_or_else(|_| ALLOWED_EXTENSIONS.to_string()),
            ),
            allowed_content_types: split_list(
                &env::var("ALLOWED_CONTENT_TYPES")
                    .unwrap_or_else(|_| ALLOWED_CONTENT_TYPES.to_string()),
            ),
            max_sessions: env_or("MAX_SESSIONS", MAX_SESSIONS),
            session_idle_ttl_secs: env_or("SESSION_IDLE_TTL_SECS", SESSION_IDLE_TTL_SECS),
            session_sweep_interval_secs: env_or(
                "SESSION_SWEEP_INTERVAL_SECS",
                SESSION_SWEEP_INTERVAL_SECS,
            ),
            session_shard_count: env_or("SESSION_SHARD_COUNT", SESSION_SHARD_COUNT),
            max_history_depth: env_or("MAX_HISTORY_DEPTH", MAX_HISTORY_DEPTH),
            request_timeout_secs: env_or("REQUEST_TIMEOUT_SECS", REQUEST_TIMEOUT_SECS),
            http_concurrency_limit: env_or("HTTP_CONCURRENCY_LIMIT", HTTP_CONCURRENCY_LIMIT),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn is_production(&self) -> bool {
        matches!(
            self.environment.to_lowercase().as_str(),
            "production" | "prod"
        )
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.is_production() && self.cors_origins.iter().any(|o| o == "*") {
            return Err(anyhow::anyhow!(
                "CORS_ORIGINS cannot be '*' in production. Please specify explicit origins."
            ));
        }
        if self.max_upload_bytes == 0 {
            return Err(anyhow::anyhow!("MAX_UPLOAD_MB must be greater than 0"));
        }
        if self.max_sessions == 0 {
            return Err(anyhow::anyhow!("MAX_SESSIONS must be greater than 0"));
        }
        if self.session_idle_ttl_secs == 0 {
            return Err(anyhow::anyhow!(
                "SESSION_IDLE_TTL_SECS must be greater than 0"
            ));
        }
        if self.session_shard_count == 0 {
            return Err(anyhow::anyhow!(
                "SESSION_SHARD_COUNT must be greater than 0"
            ));
        }
        if self.max_history_depth == 0 {
            return Err(anyhow::anyhow!("MAX_HISTORY_DEPTH must be greater than 0"));
        }
        if self.request_timeout_secs == 0 {
            return Err(anyhow::anyhow!("REQUEST_TIMEOUT_SECS must be greater than 0"));
        }
        if self.http_concurrency_limit == 0 {
            return Err(anyhow::anyhow!(
                "HTTP_CONCURRENCY_LIMIT must be greater than 0"
            ));
        }
        if self.allowed_extensions.is_empty() {
            return Err(anyhow::anyhow!("ALLOWED_EXTENSIONS must not be empty"));
        }
        Ok(())
    }
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config(pub Box<EngineConfig>);

impl Config {
    fn as_engine(&self) -> &EngineConfig {
        &self.0
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        let config = EngineConfig::from_env()?;
        Ok(Config(Box::new(config)))
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        self.as_engine().validate()
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        self.as_engine().is_production()
    }

    pub fn server_host(&self) -> &str {
        &self.as_engine().server_host
    }

    pub fn server_port(&self) -> u16 {
        self.as_engine().server_port
    }

    pub fn cors_origins(&self) -> &[String] {
        &self.as_engine().cors_origins
    }

    pub fn environment(&self) -> &str {
        &self.as_engine().environment
    }

    pub fn log_format(&self) -> LogFormat {
        self.as_engine().log_format
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.as_engine().max_upload_bytes
    }

    pub fn allowed_extensions(&self) -> &[String] {
        &self.as_engine().allowed_extensions
    }

    pub fn allowed_content_types(&self) -> &[String] {
        &self.as_engine().allowed_content_types
    }

    pub fn max_sessions(&self) -> usize {
        self.as_engine().max_sessions
    }

    pub fn session_idle_ttl_secs(&self) -> u64 {
        self.as_engine().session_idle_ttl_secs
    }

    pub fn session_sweep_interval_secs(&self) -> u64 {
        self.as_engine().session_sweep_interval_secs
    }

    pub fn session_shard_count(&self) -> usize {
        self.as_engine().session_shard_count
    }

    pub fn max_history_depth(&self) -> usize {
        self.as_engine().max_history_depth
    }

    pub fn request_timeout_secs(&self) -> u64 {
        self.as_engine().request_timeout_secs
    }

    pub fn http_concurrency_limit(&self) -> usize {
        self.as_engine().http_concurrency_limit
    }
}

impl From<EngineConfig> for Config {
    fn from(config: EngineConfig) -> Self {
        Config(Box::new(config))
    }
}
