//! Server configuration loaded from environment variables.
//!
//! All settings have sensible defaults so the server can start with zero
//! configuration for local development.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use flavors_shared::constants::{APP_NAME, DEFAULT_HTTP_PORT, MAX_UPLOAD_SIZE};

/// Free IP geolocation endpoint answering `{"lat": .., "lon": ..}`.
pub const DEFAULT_GEO_LOOKUP_URL: &str = "http://ip-api.com/json/";

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Socket address for the HTTP (axum) API server.
    /// Env: `HTTP_ADDR`
    /// Default: `0.0.0.0:8080`
    pub http_addr: SocketAddr,

    /// SQLite database holding the recipes.
    /// Env: `DATABASE_PATH`
    /// Default: `<data dir>/recipes.db`
    pub database_path: PathBuf,

    /// JSON credential file.
    /// Env: `USERS_FILE`
    /// Default: `<data dir>/users.json`
    pub users_file: PathBuf,

    /// Human-readable name for this instance.
    /// Env: `INSTANCE_NAME`
    pub instance_name: String,

    /// Maximum request body size in bytes (50 MiB).
    /// Env: `MAX_UPLOAD_SIZE`
    pub max_upload_size: usize,

    /// IP geolocation endpoint. Empty disables auto-location.
    /// Env: `GEO_LOOKUP_URL`
    pub geo_lookup_url: Option<String>,

    /// Speech-to-text endpoint. Unset disables transcription.
    /// Env: `TRANSCRIBE_URL`
    pub transcribe_url: Option<String>,

    /// Request timeout for the geolocation and transcription services.
    /// Env: `COLLABORATOR_TIMEOUT_SECS`
    /// Default: 10 seconds
    pub collaborator_timeout: Duration,

    /// How long a login session stays valid.
    /// Env: `SESSION_TTL_SECS`
    /// Default: 24 hours
    pub session_ttl: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        let data_dir = PathBuf::from("./data");
        Self {
            http_addr: ([0, 0, 0, 0], DEFAULT_HTTP_PORT).into(),
            database_path: data_dir.join("recipes.db"),
            users_file: data_dir.join("users.json"),
            instance_name: APP_NAME.to_string(),
            max_upload_size: MAX_UPLOAD_SIZE,
            geo_lookup_url: Some(DEFAULT_GEO_LOOKUP_URL.to_string()),
            transcribe_url: None,
            collaborator_timeout: Duration::from_secs(10),
            session_ttl: Duration::from_secs(24 * 60 * 60),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    pub fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(addr) = var("HTTP_ADDR") {
            match addr.parse::<SocketAddr>() {
                Ok(parsed) => config.http_addr = parsed,
                Err(_) => tracing::warn!(value = %addr, "Invalid HTTP_ADDR, using default"),
            }
        }

        let data_dir = match var("DATA_DIR") {
            Some(dir) => Some(PathBuf::from(dir)),
            None => match flavors_store::database::default_data_dir() {
                Ok(dir) => Some(dir),
                Err(e) => {
                    tracing::warn!(error = %e, "No platform data directory, using ./data");
                    None
                }
            },
        };
        if let Some(dir) = data_dir {
            config.database_path = dir.join("recipes.db");
            config.users_file = dir.join("users.json");
        }

        if let Some(path) = var("DATABASE_PATH") {
            config.database_path = PathBuf::from(path);
        }

        if let Some(path) = var("USERS_FILE") {
            config.users_file = PathBuf::from(path);
        }

        if let Some(name) = var("INSTANCE_NAME") {
            config.instance_name = name;
        }

        if let Some(val) = var("MAX_UPLOAD_SIZE") {
            match val.parse::<usize>() {
                Ok(n) if n > 0 => config.max_upload_size = n,
                _ => tracing::warn!(value = %val, "Invalid MAX_UPLOAD_SIZE, using default"),
            }
        }

        if let Some(url) = var("GEO_LOOKUP_URL") {
            config.geo_lookup_url = non_empty(url);
        }

        if let Some(url) = var("TRANSCRIBE_URL") {
            config.transcribe_url = non_empty(url);
        }

        if let Some(val) = var("COLLABORATOR_TIMEOUT_SECS") {
            match val.parse::<u64>() {
                Ok(secs) if secs > 0 => config.collaborator_timeout = Duration::from_secs(secs),
                _ => {
                    tracing::warn!(value = %val, "Invalid COLLABORATOR_TIMEOUT_SECS, using default")
                }
            }
        }

        if let Some(val) = var("SESSION_TTL_SECS") {
            match val.parse::<u64>() {
                Ok(secs) if secs > 0 => config.session_ttl = Duration::from_secs(secs),
                _ => tracing::warn!(value = %val, "Invalid SESSION_TTL_SECS, using default"),
            }
        }

        // RUST_LOG is handled directly by tracing-subscriber's EnvFilter.

        config
    }
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
