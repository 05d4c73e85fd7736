//! Server configuration loaded from environment variables.
//!
//! All settings have defaults so the server can start with zero
//! configuration for local development.

use std::net::SocketAddr;
use std::path::PathBuf;

use chrono::Duration;
use haven_core::CoreConfig;
use haven_shared::constants::{DEFAULT_HTTP_PORT, DEFAULT_SESSION_TTL_HOURS, MAX_PHOTO_SIZE};

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Env: `HTTP_ADDR`. Default: `0.0.0.0:8080`
    pub http_addr: SocketAddr,

    /// SQLite database file.
    /// Env: `DATABASE_PATH`
    /// Default: `haven.db` in the platform data directory.
    pub database_path: Option<PathBuf>,

    /// Root directory of the photo object store.
    /// Env: `BLOB_STORAGE_PATH`. Default: `./blobs`
    pub blob_storage_path: PathBuf,

    /// Env: `MAX_BLOB_SIZE` (bytes). Default: 5 MiB
    pub max_blob_size: usize,

    /// Externally visible base URL, used to build durable photo URLs.
    /// Env: `PUBLIC_BASE_URL`. Default: `http://localhost:8080`
    pub public_base_url: String,

    /// Env: `SESSION_TTL_HOURS`. Default: 720
    pub session_ttl_hours: i64,

    /// Env: `REGISTRATION_OPEN` (true/false). Default: `true`
    pub registration_open: bool,

    /// Env: `INSTANCE_NAME`. Default: `"Haven"`
    pub instance_name: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: ([0, 0, 0, 0], DEFAULT_HTTP_PORT).into(),
            database_path: None,
            blob_storage_path: PathBuf::from("./blobs"),
            max_blob_size: MAX_PHOTO_SIZE,
            public_base_url: format!("http://localhost:{DEFAULT_HTTP_PORT}"),
            session_ttl_hours: DEFAULT_SESSION_TTL_HOURS,
            registration_open: true,
            instance_name: haven_shared::constants::APP_NAME.to_string(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(addr) = var("HTTP_ADDR") {
            match addr.parse::<SocketAddr>() {
                Ok(parsed) => config.http_addr = parsed,
                Err(_) => tracing::warn!(value = %addr, "Invalid HTTP_ADDR, using default"),
            }
        }

        if let Some(path) = var("DATABASE_PATH").filter(|p| !p.is_empty()) {
            config.database_path = Some(PathBuf::from(path));
        }

        if let Some(path) = var("BLOB_STORAGE_PATH") {
            config.blob_storage_path = PathBuf::from(path);
        }

        if let Some(val) = var("MAX_BLOB_SIZE") {
            match val.parse::<usize>() {
                Ok(n) if n > 0 => config.max_blob_size = n,
                _ => tracing::warn!(value = %val, "Invalid MAX_BLOB_SIZE, using default"),
            }
        }

        if let Some(url) = var("PUBLIC_BASE_URL") {
            config.public_base_url = url.trim_end_matches('/').to_string();
        }

        if let Some(val) = var("SESSION_TTL_HOURS") {
            match val.parse::<i64>() {
                Ok(n) if n > 0 => config.session_ttl_hours = n,
                _ => tracing::warn!(value = %val, "Invalid SESSION_TTL_HOURS, using default"),
            }
        }

        if let Some(val) = var("REGISTRATION_OPEN") {
            config.registration_open = val != "false" && val != "0";
        }

        if let Some(name) = var("INSTANCE_NAME") {
            config.instance_name = name;
        }

        // RUST_LOG is handled directly by tracing-subscriber's EnvFilter.

        config
    }

    pub fn core_config(&self) -> CoreConfig {
        CoreConfig {
            session_ttl: Duration::hours(self.session_ttl_hours),
            registration_open: self.registration_open,
            ..CoreConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn from_pairs(pairs: &[(&str, &str)]) -> ServerConfig {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.http_addr, ([0, 0, 0, 0], 8080).into());
        assert_eq!(config.max_blob_size, 5 * 1024 * 1024);
        assert!(config.registration_open);
        assert!(config.database_path.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = from_pairs(&[
            ("HTTP_ADDR", "127.0.0.1:9000"),
            ("PUBLIC_BASE_URL", "https://haven.example.org/"),
            ("SESSION_TTL_HOURS", "12"),
            ("REGISTRATION_OPEN", "0"),
            ("DATABASE_PATH", "/var/lib/haven/haven.db"),
        ]);
        assert_eq!(config.http_addr, ([127, 0, 0, 1], 9000).into());
        assert_eq!(config.public_base_url, "https://haven.example.org");
        assert_eq!(config.core_config().session_ttl, Duration::hours(12));
        assert!(!config.core_config().registration_open);
        assert_eq!(
            config.database_path,
            Some(PathBuf::from("/var/lib/haven/haven.db"))
        );
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let config = from_pairs(&[
            ("HTTP_ADDR", "nowhere"),
            ("MAX_BLOB_SIZE", "-1"),
            ("SESSION_TTL_HOURS", "forever"),
        ]);
        let defaults = ServerConfig::default();
        assert_eq!(config.http_addr, defaults.http_addr);
        assert_eq!(config.max_blob_size, defaults.max_blob_size);
        assert_eq!(config.session_ttl_hours, defaults.session_ttl_hours);
    }
}
