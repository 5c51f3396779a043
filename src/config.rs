//! # Configuration Management
//!
//! This module handles loading and managing gateway configuration from multiple sources:
//! - TOML configuration files (config.toml)
//! - Environment variables (with APP_ prefix)
//! - Default values (built into the code)
//!
//! ## Key Rust Concepts Used:
//! - **Serde**: Serialization/deserialization library for converting between Rust structs and data formats
//! - **derive macros**: Automatically generate code for common traits (Debug, Clone, Serialize, Deserialize)
//! - **Result<T, E>**: Error handling that forces you to handle potential failures
//!
//! ## Configuration Priority (highest to lowest):
//! 1. `HOST` / `PORT` (deployment platforms)
//! 2. Environment variables (`APP_SERVER__PORT`, `APP_UPLOAD__MAX_BODY_BYTES`, ...)
//! 3. Configuration file (config.toml)
//! 4. Default values (defined in the Default impl)
//!
//! Nested keys are separated by a double underscore because field names
//! themselves contain single underscores.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Default request body limit: 16 MiB.
pub const DEFAULT_MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

/// Analyzer backends the gateway knows how to build.
pub const KNOWN_BACKENDS: &[&str] = &["canned"];

/// Main gateway configuration.
///
/// Breaking configuration into logical groups (server, upload, analysis)
/// keeps each concern in one place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub upload: UploadConfig,
    pub analysis: AnalysisConfig,
}

/// Server-specific configuration settings.
///
/// ## Common values:
/// - `host = "127.0.0.1"`: Only accept connections from localhost (development)
/// - `host = "0.0.0.0"`: Accept connections from any IP address (production)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Limits and storage for uploaded recordings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Largest accepted request body, in bytes
    pub max_body_bytes: usize,
    /// Where in-flight uploads are written. Empty means the OS temp
    /// directory plus `tajweed-uploads`.
    pub temp_dir: String,
}

/// Settings for the analysis step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Which analyzer to build at startup (see [`KNOWN_BACKENDS`])
    pub backend: String,
    /// How long one analysis may run before it is abandoned
    pub timeout_seconds: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
            },
            upload: UploadConfig {
                max_body_bytes: DEFAULT_MAX_BODY_BYTES,
                temp_dir: String::new(),
            },
            analysis: AnalysisConfig {
                backend: "canned".to_string(),
                timeout_seconds: 60,
            },
        }
    }
}

impl UploadConfig {
    /// Resolve `temp_dir`, falling back to the OS temp directory.
    pub fn temp_dir_path(&self) -> PathBuf {
        if self.temp_dir.trim().is_empty() {
            env::temp_dir().join("tajweed-uploads")
        } else {
            PathBuf::from(&self.temp_dir)
        }
    }
}

impl AppConfig {
    /// Load configuration from multiple sources in priority order.
    ///
    /// ## Configuration Loading Process:
    /// 1. Start with built-in defaults
    /// 2. Override with values from config.toml (if it exists)
    /// 3. Override with environment variables prefixed with APP_
    /// 4. Handle special cases for HOST and PORT environment variables
    ///
    /// ## Environment Variable Examples:
    /// - `APP_SERVER__HOST=0.0.0.0`: Override server host
    /// - `APP_UPLOAD__MAX_BODY_BYTES=8388608`: Lower the upload limit to 8 MiB
    /// - `APP_ANALYSIS__TIMEOUT_SECONDS=30`: Shorter analysis timeout
    /// - `PORT=3000`: Special case for deployment platforms
    pub fn load() -> Result<Self> {
        let mut settings = config::Config::builder()
            .add_source(config::Config::try_from(&AppConfig::default())?)
            // required(false) means "don't error if missing"
            .add_source(config::File::with_name("config").required(false))
            .add_source(
                config::Environment::with_prefix("APP")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );

        if let Ok(host) = env::var("HOST") {
            settings = settings.set_override("server.host", host)?;
        }

        if let Ok(port) = env::var("PORT") {
            settings = settings.set_override("server.port", port)?;
        }

        let config = settings.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Validate that the configuration values make sense.
    ///
    /// ## What this checks:
    /// - Server port is not 0
    /// - The body limit allows at least one byte
    /// - The analysis timeout is at least one second
    /// - The analyzer backend is one we can build
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(anyhow::anyhow!("Server port cannot be 0"));
        }

        if self.upload.max_body_bytes == 0 {
            return Err(anyhow::anyhow!("Upload body limit must be greater than 0"));
        }

        if self.analysis.timeout_seconds == 0 {
            return Err(anyhow::anyhow!("Analysis timeout must be greater than 0"));
        }

        if !KNOWN_BACKENDS.contains(&self.analysis.backend.as_str()) {
            return Err(anyhow::anyhow!(
                "Unknown analysis backend '{}' (expected one of: {})",
                self.analysis.backend,
                KNOWN_BACKENDS.join(", ")
            ));
        }

        Ok(())
    }

    /// Update configuration from a JSON string (used for runtime config updates).
    ///
    /// ## Partial updates:
    /// Only the fields present in the JSON change. For example,
    /// `{"upload": {"max_body_bytes": 1048576}}` changes only the body limit.
    ///
    /// `analysis.backend` is fixed at startup because the analyzer is built
    /// once. `upload.temp_dir` is fixed too, so uploads can't be redirected
    /// through the API. A runtime request to change either is rejected.
    pub fn update_from_json(&mut self, json_str: &str) -> Result<()> {
        let partial_config: serde_json::Value = serde_json::from_str(json_str)?;
        let mut updated = self.clone();

        if let Some(server) = partial_config.get("server") {
            if let Some(host) = server.get("host").and_then(|v| v.as_str()) {
                updated.server.host = host.to_string();
            }
            if let Some(port) = server.get("port").and_then(|v| v.as_u64()) {
                updated.server.port = u16::try_from(port)
                    .map_err(|_| anyhow::anyhow!("Server port {} is out of range", port))?;
            }
        }

        if let Some(upload) = partial_config.get("upload") {
            if let Some(limit) = upload.get("max_body_bytes").and_then(|v| v.as_u64()) {
                updated.upload.max_body_bytes = limit as usize;
            }
            if let Some(dir) = upload.get("temp_dir").and_then(|v| v.as_str()) {
                if dir != self.upload.temp_dir {
                    return Err(anyhow::anyhow!(
                        "upload.temp_dir cannot be changed at runtime"
                    ));
                }
            }
        }

        if let Some(analysis) = partial_config.get("analysis") {
            if let Some(backend) = analysis.get("backend").and_then(|v| v.as_str()) {
                if backend != self.analysis.backend {
                    return Err(anyhow::anyhow!(
                        "analysis.backend cannot be changed at runtime"
                    ));
                }
            }
            if let Some(timeout) = analysis.get("timeout_seconds").and_then(|v| v.as_u64()) {
                updated.analysis.timeout_seconds = timeout;
            }
        }

        // Only commit once the whole update is known to be valid
        updated.validate()?;
        *self = updated;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.upload.max_body_bytes, 16 * 1024 * 1024);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = AppConfig::default();
        config.server.port = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.analysis.backend = "gemini".to_string();
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.upload.max_body_bytes = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_temp_dir_resolution() {
        let mut config = AppConfig::default();
        assert!(config.upload.temp_dir_path().ends_with("tajweed-uploads"));

        config.upload.temp_dir = "/var/tmp/recitations".to_string();
        assert_eq!(config.upload.temp_dir_path(), PathBuf::from("/var/tmp/recitations"));
    }

    #[test]
    fn test_config_update() {
        let mut config = AppConfig::default();
        let json = r#"{"server": {"port": 9090}, "analysis": {"timeout_seconds": 5}}"#;
        assert!(config.update_from_json(json).is_ok());
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.analysis.timeout_seconds, 5);
        assert_eq!(config.server.host, "127.0.0.1");
    }

    #[test]
    fn test_invalid_update_leaves_config_untouched() {
        let mut config = AppConfig::default();
        let json = r#"{"server": {"port": 9090}, "upload": {"max_body_bytes": 0}}"#;
        assert!(config.update_from_json(json).is_err());
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.upload.max_body_bytes, DEFAULT_MAX_BODY_BYTES);

        assert!(config
            .update_from_json(r#"{"analysis": {"backend": "other"}}"#)
            .is_err());
        assert!(config.update_from_json(r#"{"server": {"port": 70000}}"#).is_err());
    }

    #[test]
    fn test_temp_dir_fixed_at_runtime() {
        let mut config = AppConfig::default();
        config.upload.temp_dir = "/srv/uploads".to_string();

        let err = config
            .update_from_json(r#"{"upload": {"temp_dir": "/etc"}, "server": {"port": 9090}}"#)
            .unwrap_err();
        assert!(err.to_string().contains("upload.temp_dir"));
        assert_eq!(config.upload.temp_dir, "/srv/uploads");
        assert_eq!(config.server.port, 8080);

        // Echoing the current value back is allowed
        assert!(config
            .update_from_json(r#"{"upload": {"temp_dir": "/srv/uploads", "max_body_bytes": 2048}}"#)
            .is_ok());
        assert_eq!(config.upload.max_body_bytes, 2048);
    }
}
