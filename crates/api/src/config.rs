use casecard_core::lock::{validate_lock_duration, DEFAULT_LOCK_DURATION_MINS};

use crate::auth::jwt::JwtConfig;

/// Server configuration loaded from environment variables.
///
/// All fields except the JWT secret have defaults suitable for local
/// development. In production, override via environment variables.
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
    /// Upper bound on graceful shutdown drain, in seconds (default: `30`).
    pub shutdown_timeout_secs: u64,
    /// Edit lock window in minutes (default: `30`).
    pub lock_duration_mins: i64,
    /// JWT token configuration (secret, expiry).
    pub jwt: JwtConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                        | Default                 |
    /// |--------------------------------|-------------------------|
    /// | `HOST`                         | `0.0.0.0`               |
    /// | `PORT`                         | `3000`                  |
    /// | `CORS_ORIGINS`                 | `http://localhost:5173` |
    /// | `REQUEST_TIMEOUT_SECS`         | `30`                    |
    /// | `SHUTDOWN_TIMEOUT_SECS`        | `30`                    |
    /// | `CASE_CARD_LOCK_DURATION_MINS` | `30`                    |
    ///
    /// # Panics
    ///
    /// Panics on unparseable values or a lock duration outside 1..=240, so
    /// misconfiguration fails at startup.
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let shutdown_timeout_secs: u64 = std::env::var("SHUTDOWN_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("SHUTDOWN_TIMEOUT_SECS must be a valid u64");

        let lock_duration_mins: i64 = std::env::var("CASE_CARD_LOCK_DURATION_MINS")
            .unwrap_or_else(|_| DEFAULT_LOCK_DURATION_MINS.to_string())
            .parse()
            .expect("CASE_CARD_LOCK_DURATION_MINS must be a valid i64");
        if let Err(msg) = validate_lock_duration(lock_duration_mins) {
            panic!("CASE_CARD_LOCK_DURATION_MINS: {msg}");
        }

        let jwt = JwtConfig::from_env();

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            shutdown_timeout_secs,
            lock_duration_mins,
            jwt,
        }
    }
}
