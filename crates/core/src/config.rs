//! Configuration management
//!
//! Configuration lives in a TOML file. The location is `$BUCKETFS_CONFIG_DIR/config.toml`
//! when the variable is set, otherwise `<config dir>/bucketfs/config.toml`.
//! A missing file yields the defaults (in-memory backend).

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Environment variable overriding the configuration directory
pub const CONFIG_DIR_ENV: &str = "BUCKETFS_CONFIG_DIR";

const CONFIG_FILE: &str = "config.toml";

/// Connection settings for an S3-compatible endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct S3Config {
    /// Endpoint URL, e.g. `http://localhost:9000`
    pub endpoint: String,

    #[serde(default = "default_region")]
    pub region: String,

    pub access_key: String,

    pub secret_key: String,

    /// Bucket lookup style: auto, path, or dns
    #[serde(default = "default_bucket_lookup")]
    pub bucket_lookup: String,
}

fn default_region() -> String {
    "us-east-1".to_string()
}

fn default_bucket_lookup() -> String {
    "auto".to_string()
}

/// Which storage backend serves the namespace
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum BackendConfig {
    S3(S3Config),
    Local {
        root: PathBuf,
    },
    #[default]
    Memory,
}

/// Retry settings for transient storage failures
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff_ms: 100,
            max_backoff_ms: 10_000,
        }
    }
}

/// Directory listing settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListingConfig {
    /// Records requested per backend page
    pub page_size: i32,
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self { page_size: 1000 }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub backend: BackendConfig,

    #[serde(default)]
    pub retry: RetryConfig,

    #[serde(default)]
    pub listing: ListingConfig,
}

impl Config {
    /// Check settings that serde cannot
    pub fn validate(&self) -> Result<()> {
        if let BackendConfig::S3(s3) = &self.backend {
            let url = url::Url::parse(&s3.endpoint)
                .map_err(|e| Error::Config(format!("Invalid endpoint '{}': {e}", s3.endpoint)))?;
            if !matches!(url.scheme(), "http" | "https") {
                return Err(Error::Config(format!(
                    "Endpoint must use http or https: {}",
                    s3.endpoint
                )));
            }
            if !matches!(s3.bucket_lookup.as_str(), "auto" | "path" | "dns") {
                return Err(Error::Config(format!(
                    "Invalid bucket_lookup '{}': expected auto, path, or dns",
                    s3.bucket_lookup
                )));
            }
        }
        if self.retry.max_attempts == 0 {
            return Err(Error::Config("retry.max_attempts must be at least 1".into()));
        }
        if self.listing.page_size <= 0 {
            return Err(Error::Config("listing.page_size must be positive".into()));
        }
        Ok(())
    }
}

/// Locates and loads the configuration file
#[derive(Debug, Clone)]
pub struct ConfigManager {
    path: PathBuf,
}

impl ConfigManager {
    /// Use the default configuration location
    pub fn new() -> Result<Self> {
        let dir = match std::env::var_os(CONFIG_DIR_ENV) {
            Some(dir) => PathBuf::from(dir),
            None => dirs::config_dir()
                .ok_or_else(|| Error::Config("Cannot determine config directory".into()))?
                .join("bucketfs"),
        };
        Ok(Self::with_path(dir.join(CONFIG_FILE)))
    }

    /// Use an explicit configuration file
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the configuration, falling back to defaults when the file is absent
    pub fn load(&self) -> Result<Config> {
        if !self.path.exists() {
            tracing::debug!(path = %self.path.display(), "no config file, using defaults");
            return Ok(Config::default());
        }

        let content = std::fs::read_to_string(&self.path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let manager = ConfigManager::with_path(dir.path().join("config.toml"));
        let config = manager.load().unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.backend, BackendConfig::Memory);
        assert_eq!(config.listing.page_size, 1000);
    }

    #[test]
    fn test_parse_s3_backend() {
        let config: Config = toml::from_str(
            r#"
            [backend]
            type = "s3"
            endpoint = "http://localhost:9000"
            access_key = "ak"
            secret_key = "sk"

            [retry]
            max_attempts = 5
            "#,
        )
        .unwrap();

        let BackendConfig::S3(s3) = &config.backend else {
            panic!("expected s3 backend");
        };
        assert_eq!(s3.region, "us-east-1");
        assert_eq!(s3.bucket_lookup, "auto");
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.retry.initial_backoff_ms, 100);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_local_backend() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[backend]\ntype = \"local\"\nroot = \"/srv/data\"\n").unwrap();

        let config = ConfigManager::with_path(&path).load().unwrap();
        assert_eq!(
            config.backend,
            BackendConfig::Local {
                root: PathBuf::from("/srv/data"),
            }
        );
    }

    #[test]
    fn test_validate_rejects_bad_endpoint() {
        let mut config = Config {
            backend: BackendConfig::S3(S3Config {
                endpoint: "not a url".into(),
                region: default_region(),
                access_key: "ak".into(),
                secret_key: "sk".into(),
                bucket_lookup: default_bucket_lookup(),
            }),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        if let BackendConfig::S3(s3) = &mut config.backend {
            s3.endpoint = "ftp://example.com".into();
        }
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_validate_rejects_zero_page_size() {
        let config = Config {
            listing: ListingConfig { page_size: 0 },
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
