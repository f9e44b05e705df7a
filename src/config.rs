//! Configuration module for the image service.

use serde::Deserialize;
use std::path::Path;

use crate::{Result, ServiceError};

/// Listener and request-size configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind both listeners to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port for the HTTP API.
    #[serde(default = "default_http_port")]
    pub http_port: u16,
    /// Port for the gRPC API.
    #[serde(default = "default_grpc_port")]
    pub grpc_port: u16,
    /// Maximum upload size in bytes.
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_http_port() -> u16 {
    8080
}

fn default_grpc_port() -> u16 {
    9090
}

fn default_max_file_size() -> u64 {
    10 * 1024 * 1024
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            http_port: default_http_port(),
            grpc_port: default_grpc_port(),
            max_file_size: default_max_file_size(),
        }
    }
}

/// Storage configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Directory holding uploaded files.
    #[serde(default = "default_upload_dir")]
    pub upload_dir: String,
    /// Media types accepted by upload, compared against the sniffed type.
    #[serde(default = "default_allowed_types")]
    pub allowed_types: Vec<String>,
}

fn default_upload_dir() -> String {
    "uploads".to_string()
}

fn default_allowed_types() -> Vec<String> {
    ["image/jpeg", "image/png", "image/gif", "image/webp"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            upload_dir: default_upload_dir(),
            allowed_types: default_allowed_types(),
        }
    }
}

/// Concurrency limits shared by both front-ends.
#[derive(Debug, Clone, Deserialize)]
pub struct LimitsConfig {
    /// Concurrent uploads and downloads.
    #[serde(default = "default_transfer_permits")]
    pub transfer_permits: usize,
    /// Concurrent directory listings.
    #[serde(default = "default_list_permits")]
    pub list_permits: usize,
}

fn default_transfer_permits() -> usize {
    10
}

fn default_list_permits() -> usize {
    100
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            transfer_permits: default_transfer_permits(),
            list_permits: default_list_permits(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Path to the log file.
    #[serde(default = "default_log_file")]
    pub file: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file() -> String {
    "logs/image-service.log".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: default_log_file(),
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Storage configuration.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Admission limits.
    #[serde(default)]
    pub limits: LimitsConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(ServiceError::Io)?;
        Self::parse(&content)
    }

    /// Load configuration from a TOML file and apply environment variable overrides.
    pub fn load_with_env<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| ServiceError::Config(format!("config parse error: {e}")))
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Supported environment variables:
    /// - `IMAGE_SERVICE_UPLOAD_DIR`: storage directory
    /// - `IMAGE_SERVICE_HTTP_PORT`: HTTP listen port
    /// - `IMAGE_SERVICE_GRPC_PORT`: gRPC listen port
    ///
    /// Empty or unparsable values are ignored.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(dir) = std::env::var("IMAGE_SERVICE_UPLOAD_DIR") {
            if !dir.is_empty() {
                self.storage.upload_dir = dir;
            }
        }
        if let Some(port) = env_port("IMAGE_SERVICE_HTTP_PORT") {
            self.server.http_port = port;
        }
        if let Some(port) = env_port("IMAGE_SERVICE_GRPC_PORT") {
            self.server.grpc_port = port;
        }
    }

    /// Validate the configuration.
    ///
    /// Returns an error if:
    /// - `max_file_size` is zero
    /// - both front-ends are configured on the same non-ephemeral port
    pub fn validate(&self) -> Result<()> {
        if self.server.max_file_size == 0 {
            return Err(ServiceError::Config(
                "server.max_file_size must be greater than zero".to_string(),
            ));
        }
        if self.server.http_port != 0 && self.server.http_port == self.server.grpc_port {
            return Err(ServiceError::Config(format!(
                "server.http_port and server.grpc_port are both {}",
                self.server.http_port
            )));
        }
        Ok(())
    }

    /// `host:http_port`.
    pub fn http_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.http_port)
    }

    /// `host:grpc_port`.
    pub fn grpc_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.grpc_port)
    }
}

fn env_port(key: &str) -> Option<u16> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}
