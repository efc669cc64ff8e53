//! Backend selection
//!
//! Loads the configuration, applies command-line overrides and connects the
//! configured storage client.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use bucketfs_core::{
    BackendConfig, Config, ConfigManager, LocalClient, MemoryClient, ObjectFs, StorageClient,
};
use bucketfs_s3::S3Client;

use crate::exit_code::ExitCode;
use crate::output::Formatter;

/// Command-line overrides for backend selection
#[derive(Debug, Clone, Default)]
pub struct ConnectOptions {
    /// Explicit configuration file
    pub config: Option<PathBuf>,
    /// Serve a local directory instead of the configured backend
    pub local_root: Option<PathBuf>,
}

/// Load the configuration file and apply overrides
///
/// A backend must be chosen explicitly, either in the file or with `--local-root`.
pub fn load_config(options: &ConnectOptions) -> anyhow::Result<Config> {
    let manager = match &options.config {
        Some(path) => ConfigManager::with_path(path),
        None => ConfigManager::new()?,
    };

    if options.local_root.is_none() && !manager.path().exists() {
        anyhow::bail!(
            "No backend configured: create {} with a [backend] section or pass --local-root <dir>",
            manager.path().display()
        );
    }

    let mut config = manager
        .load()
        .with_context(|| format!("Failed to load config from {}", manager.path().display()))?;

    if let Some(root) = &options.local_root {
        config.backend = BackendConfig::Local { root: root.clone() };
    }

    Ok(config)
}

/// Build the storage client for the configured backend
pub async fn connect(config: &Config) -> anyhow::Result<Arc<dyn StorageClient>> {
    let client: Arc<dyn StorageClient> = match &config.backend {
        BackendConfig::S3(s3) => Arc::new(
            S3Client::new(s3, config.retry.clone())
                .await
                .with_context(|| format!("Failed to create S3 client for {}", s3.endpoint))?,
        ),
        BackendConfig::Local { root } => Arc::new(
            LocalClient::new(root)
                .with_context(|| format!("Failed to open local root {}", root.display()))?,
        ),
        BackendConfig::Memory => {
            tracing::warn!("using the in-memory backend; it starts empty and is discarded on exit");
            Arc::new(MemoryClient::new())
        }
    };
    Ok(client)
}

/// Open the filesystem view, reporting failures through the formatter
pub async fn open_fs(options: &ConnectOptions, formatter: &Formatter) -> Result<ObjectFs, ExitCode> {
    let config = match load_config(options) {
        Ok(c) => c,
        Err(e) => {
            formatter.error(&format!("{e:#}"));
            return Err(ExitCode::UsageError);
        }
    };

    match connect(&config).await {
        Ok(client) => Ok(ObjectFs::new(client).with_page_size(config.listing.page_size)),
        Err(e) => {
            formatter.error(&format!("{e:#}"));
            Err(ExitCode::GeneralError)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_config_requires_explicit_backend() {
        let temp = TempDir::new().unwrap();
        let options = ConnectOptions {
            config: Some(temp.path().join("absent.toml")),
            local_root: None,
        };
        let err = load_config(&options).unwrap_err();
        assert!(err.to_string().contains("No backend configured"), "{err}");
    }

    #[test]
    fn test_missing_config_with_local_root() {
        let temp = TempDir::new().unwrap();
        let options = ConnectOptions {
            config: Some(temp.path().join("absent.toml")),
            local_root: Some(temp.path().to_path_buf()),
        };
        let config = load_config(&options).unwrap();
        assert_eq!(
            config.backend,
            BackendConfig::Local {
                root: temp.path().to_path_buf()
            }
        );
    }

    #[test]
    fn test_explicit_memory_backend() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(&path, "[backend]\ntype = \"memory\"\n").unwrap();

        let options = ConnectOptions {
            config: Some(path),
            local_root: None,
        };
        assert_eq!(load_config(&options).unwrap().backend, BackendConfig::Memory);
    }

    #[test]
    fn test_local_root_overrides_backend() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(
            &path,
            "[backend]\ntype = \"s3\"\nendpoint = \"http://localhost:9000\"\naccess_key = \"a\"\nsecret_key = \"b\"\n",
        )
        .unwrap();

        let options = ConnectOptions {
            config: Some(path),
            local_root: Some(temp.path().to_path_buf()),
        };
        let config = load_config(&options).unwrap();
        assert_eq!(
            config.backend,
            BackendConfig::Local {
                root: temp.path().to_path_buf()
            }
        );
    }

    #[test]
    fn test_load_config_reports_path_on_parse_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(&path, "[backend\n").unwrap();

        let options = ConnectOptions {
            config: Some(path.clone()),
            local_root: None,
        };
        let err = load_config(&options).unwrap_err();
        assert!(format!("{err:#}").contains(&path.display().to_string()));
    }

    #[tokio::test]
    async fn test_connect_local_rejects_missing_root() {
        let temp = TempDir::new().unwrap();
        let config = Config {
            backend: BackendConfig::Local {
                root: temp.path().join("missing"),
            },
            ..Default::default()
        };
        assert!(connect(&config).await.is_err());
    }
}
