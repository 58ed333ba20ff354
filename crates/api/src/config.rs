//! Server configuration
//!
//! TOML file (optional) layered under `FRAUD_`-prefixed environment
//! variables, e.g. `FRAUD_SERVER__ADDR=127.0.0.1:9000`.

use crate::rate_limit::RateLimitConfig;
use ::config::{Config, ConfigError, Environment, File};
use data_validator::ValidationConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Full server configuration
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub server: HttpConfig,
    pub artifacts: ArtifactsConfig,
    pub validation: ValidationConfig,
    pub rate_limit: RateLimitConfig,
    pub metrics: MetricsConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Socket address to listen on
    pub addr: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            addr: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Directory holding the trained run; the manifest names the format
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ArtifactsConfig {
    pub dir: PathBuf,
}

impl Default for ArtifactsConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("artifacts"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Install the Prometheus recorder and serve `/metrics`
    pub enabled: bool,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is unset
    pub level: String,
    /// `pretty` or `json`
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "json".to_string(),
        }
    }
}

impl ServerConfig {
    /// Load configuration, layering the environment over an optional file
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        }
        builder
            .add_source(
                Environment::with_prefix("FRAUD")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.server.addr, "0.0.0.0:8080");
        assert_eq!(config.artifacts.dir, PathBuf::from("artifacts"));
        assert!(!config.rate_limit.enabled);
        assert!(config.metrics.enabled);
        assert_eq!(config.validation, ValidationConfig::default());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[server]
addr = "127.0.0.1:9000"

[artifacts]
dir = "/srv/fraud/artifacts"

[rate_limit]
enabled = true

[logging]
format = "pretty"
"#
        )
        .unwrap();

        let config = ServerConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.server.addr, "127.0.0.1:9000");
        assert_eq!(config.artifacts.dir, PathBuf::from("/srv/fraud/artifacts"));
        assert!(config.rate_limit.enabled);
        assert_eq!(config.rate_limit.burst_size, 50);
        assert_eq!(config.logging.format, "pretty");
        assert_eq!(config.logging.level, "info");
    }
}
