//! Migration settings, read from a TOML file.
//!
//! ```toml
//! legacy_dir = "/tmp/op-dump"
//! multi_cluster = true
//!
//! [store]
//! kind = "kube"
//! kubeconfig = "/root/.kube/config"
//!
//! [blob]
//! kind = "s3"
//! endpoint = "http://minio.kubesphere-system.svc:9000"
//! bucket = "app-store"
//!
//! [retry]
//! attempts = 5
//! backoff_ms = 1000
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::blob::S3Options;
use crate::error::{Error, Result};

pub const DEFAULT_LEGACY_DIR: &str = "/tmp/op-dump";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct MigrateConfig {
    /// Directory holding the dumped tables and attachments.
    pub legacy_dir: PathBuf,
    /// Resolve release workspaces on member clusters.
    pub multi_cluster: bool,
    /// Deadline for the whole run.
    pub timeout_secs: Option<u64>,
    pub store: StoreConfig,
    pub blob: BlobConfig,
    pub retry: RetryConfig,
}

impl Default for MigrateConfig {
    fn default() -> Self {
        Self {
            legacy_dir: PathBuf::from(DEFAULT_LEGACY_DIR),
            multi_cluster: false,
            timeout_secs: None,
            store: StoreConfig::default(),
            blob: BlobConfig::default(),
            retry: RetryConfig::default(),
        }
    }
}

impl MigrateConfig {
    /// Loads `path`, or the defaults when it does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::parse(&fs::read_to_string(path)?)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.retry.attempts == 0 {
            return Err(Error::Config("retry.attempts must be at least 1".to_string()));
        }
        if self.legacy_dir.as_os_str().is_empty() {
            return Err(Error::Config("legacy_dir must not be empty".to_string()));
        }
        Ok(())
    }

    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum StoreConfig {
    Kube(KubeStoreConfig),
    Sqlite { path: PathBuf },
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::Kube(KubeStoreConfig::default())
    }
}

/// How to reach the Kubernetes API. Without a kubeconfig the client is
/// inferred from `KUBECONFIG` or the in-cluster service account.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct KubeStoreConfig {
    pub kubeconfig: Option<PathBuf>,
    /// Overrides the server of the selected context.
    pub server: Option<String>,
    pub token: Option<String>,
    pub token_file: Option<PathBuf>,
    pub insecure_skip_tls_verify: bool,
}

impl KubeStoreConfig {
    /// The bearer token to use instead of the context's credentials, if any.
    pub fn token(&self) -> Result<Option<String>> {
        if let Some(token) = &self.token {
            return Ok(Some(token.clone()));
        }
        match &self.token_file {
            Some(path) => Ok(Some(fs::read_to_string(path)?.trim().to_string())),
            None => Ok(None),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum BlobConfig {
    Fs { root: PathBuf },
    S3(S3Options),
}

impl Default for BlobConfig {
    fn default() -> Self {
        Self::S3(S3Options::default())
    }
}

/// Budget for status writes that hit version conflicts.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub attempts: u32,
    pub backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            attempts: 5,
            backoff_ms: 1000,
        }
    }
}

impl RetryConfig {
    #[must_use]
    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = MigrateConfig::parse("").unwrap();
        assert_eq!(config, MigrateConfig::default());
        assert_eq!(config.legacy_dir, PathBuf::from("/tmp/op-dump"));
        assert_eq!(config.retry.attempts, 5);
        assert_eq!(config.retry.backoff(), Duration::from_secs(1));
        assert!(matches!(config.store, StoreConfig::Kube(_)));
        assert!(matches!(config.blob, BlobConfig::S3(ref s3) if s3.region == "us-east-1"));
        assert!(config.timeout().is_none());
    }

    #[test]
    fn test_parse_full() {
        let config = MigrateConfig::parse(
            r#"
legacy_dir = "/data/dump"
multi_cluster = true
timeout_secs = 600

[store]
kind = "sqlite"
path = "/data/resources.db"

[blob]
kind = "fs"
root = "/data/blobs"

[retry]
attempts = 3
backoff_ms = 10
"#,
        )
        .unwrap();

        assert_eq!(config.legacy_dir, PathBuf::from("/data/dump"));
        assert!(config.multi_cluster);
        assert_eq!(config.timeout(), Some(Duration::from_secs(600)));
        assert_eq!(
            config.store,
            StoreConfig::Sqlite {
                path: PathBuf::from("/data/resources.db")
            }
        );
        assert_eq!(
            config.blob,
            BlobConfig::Fs {
                root: PathBuf::from("/data/blobs")
            }
        );
        assert_eq!(config.retry.attempts, 3);
    }

    #[test]
    fn test_parse_s3_blob() {
        let config = MigrateConfig::parse(
            r#"
[blob]
kind = "s3"
endpoint = "http://minio:9000"
bucket = "app-store"
access_key_id = "ak"
secret_access_key = "sk"
"#,
        )
        .unwrap();

        let BlobConfig::S3(s3) = config.blob else {
            panic!("expected s3 blob config");
        };
        assert_eq!(s3.endpoint, "http://minio:9000");
        assert_eq!(s3.region, "us-east-1");
        assert!(s3.force_path_style);
    }

    #[test]
    fn test_invalid_config() {
        assert!(matches!(
            MigrateConfig::parse("[retry]\nattempts = 0\n"),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            MigrateConfig::parse("[store]\nkind = \"etcd\"\n"),
            Err(Error::Toml(_))
        ));
    }

    #[test]
    fn test_missing_file_means_defaults() {
        let temp = TempDir::new().unwrap();
        let config = MigrateConfig::load(&temp.path().join("absent.toml")).unwrap();
        assert_eq!(config, MigrateConfig::default());
    }

    #[test]
    fn test_kube_store_token_sources() {
        let temp = TempDir::new().unwrap();
        let token_file = temp.path().join("token");
        fs::write(&token_file, "secret-token\n").unwrap();

        let from_file = KubeStoreConfig {
            server: Some("https://k8s.local:6443".to_string()),
            token_file: Some(token_file.clone()),
            ..Default::default()
        };
        assert_eq!(from_file.token().unwrap().as_deref(), Some("secret-token"));

        let explicit = KubeStoreConfig {
            token: Some("inline".to_string()),
            token_file: Some(token_file),
            ..Default::default()
        };
        assert_eq!(explicit.token().unwrap().as_deref(), Some("inline"));

        assert_eq!(KubeStoreConfig::default().token().unwrap(), None);
    }

    #[test]
    fn test_kube_store_missing_token_file_is_an_error() {
        let temp = TempDir::new().unwrap();
        let config = KubeStoreConfig {
            token_file: Some(temp.path().join("absent")),
            ..Default::default()
        };
        assert!(matches!(config.token(), Err(Error::Io(_))));
    }
}
