//! Server configuration loaded from environment variables.
//!
//! All settings have sensible defaults so the server can start with zero
//! configuration for local use.

use std::net::SocketAddr;
use std::path::PathBuf;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Socket address for the HTTP (axum) server.
    /// Env: `HTTP_ADDR`
    /// Default: `127.0.0.1:3000`
    pub http_addr: SocketAddr,

    /// Filesystem path of the shared directory (attachments + ledger).
    /// Env: `SHARED_DIR`
    /// Default: `./shared`
    pub shared_dir: PathBuf,

    /// Maximum accepted request body size in bytes (caps uploads).
    /// Env: `MAX_UPLOAD_SIZE`
    /// Default: 25 MiB
    pub max_upload_size: usize,

    /// Human-readable name for this instance, shown by `/health`.
    /// Env: `INSTANCE_NAME`
    /// Default: `"Corkboard"`
    pub instance_name: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: ([127, 0, 0, 1], 3000).into(),
            shared_dir: PathBuf::from("./shared"),
            max_upload_size: 25 * 1024 * 1024, // 25 MiB
            instance_name: "Corkboard".to_string(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables, falling back to
    /// defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(addr) = std::env::var("HTTP_ADDR") {
            if let Ok(parsed) = addr.parse::<SocketAddr>() {
                config.http_addr = parsed;
            } else {
                tracing::warn!(value = %addr, "Invalid HTTP_ADDR, using default");
            }
        }

        if let Ok(path) = std::env::var("SHARED_DIR") {
            if !path.is_empty() {
                config.shared_dir = PathBuf::from(path);
            }
        }

        if let Ok(val) = std::env::var("MAX_UPLOAD_SIZE") {
            if let Ok(n) = val.parse::<usize>() {
                config.max_upload_size = n;
            } else {
                tracing::warn!(value = %val, "Invalid MAX_UPLOAD_SIZE, using default");
            }
        }

        if let Ok(name) = std::env::var("INSTANCE_NAME") {
            if !name.is_empty() {
                config.instance_name = name;
            }
        }

        // RUST_LOG is handled directly by tracing-subscriber's EnvFilter,
        // so we do not store it here.

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.http_addr, ([127, 0, 0, 1], 3000).into());
        assert_eq!(config.shared_dir, PathBuf::from("./shared"));
        assert_eq!(config.max_upload_size, 25 * 1024 * 1024);
        assert_eq!(config.instance_name, "Corkboard");
    }
}
