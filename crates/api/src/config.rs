use std::path::PathBuf;

use pictura_pipeline::config::{env_or, ConfigError};

/// Server configuration loaded from environment variables.
///
/// All fields have defaults suitable for local development.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Upper bound on the post-listener pipeline drain, in seconds (default: `10`).
    pub shutdown_timeout_secs: u64,
    /// Directory uploaded image payloads are written under (default: `./media`).
    pub media_root: PathBuf,
    /// Largest accepted upload body, in bytes (default: 20 MiB).
    pub max_upload_bytes: usize,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                 | Default                 |
    /// |-------------------------|-------------------------|
    /// | `HOST`                  | `0.0.0.0`               |
    /// | `PORT`                  | `3000`                  |
    /// | `CORS_ORIGINS`          | `http://localhost:5173` |
    /// | `REQUEST_TIMEOUT_SECS`  | `30`                    |
    /// | `SHUTDOWN_TIMEOUT_SECS` | `10`                    |
    /// | `MEDIA_ROOT`            | `./media`               |
    /// | `MAX_UPLOAD_BYTES`      | `20971520`              |
    pub fn from_env() -> Result<Self, ConfigError> {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let media_root = std::env::var("MEDIA_ROOT")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./media"));

        let config = Self {
            host,
            port: env_or("PORT", 3000)?,
            cors_origins,
            request_timeout_secs: env_or("REQUEST_TIMEOUT_SECS", 30)?,
            shutdown_timeout_secs: env_or("SHUTDOWN_TIMEOUT_SECS", 10)?,
            media_root,
            max_upload_bytes: env_or("MAX_UPLOAD_BYTES", 20 * 1024 * 1024)?,
        };

        if config.max_upload_bytes == 0 {
            return Err(ConfigError::Inconsistent(
                "MAX_UPLOAD_BYTES must be at least 1".to_string(),
            ));
        }
        Ok(config)
    }
}
