//! Wiring of configuration into backends and a [`Workflow`].

mod commands;

pub use commands::Commands;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::blob::{BlobStore, FsBlobStore, S3BlobStore};
use crate::config::{BlobConfig, MigrateConfig, StoreConfig};
use crate::context::CallContext;
use crate::runtime::BlockingRuntime;
use crate::store::{KubeClient, ResourceStore, SqliteStore};
use crate::workflow::{Report, RetryPolicy, Source, Workflow};

/// Options shared by every command.
#[derive(Debug, Clone, Default)]
pub struct GlobalOptions {
    pub config: PathBuf,
    pub kubeconfig: Option<PathBuf>,
    pub master: Option<String>,
}

/// Reads the config file and applies the connection flags on top.
pub fn load_config(options: &GlobalOptions) -> anyhow::Result<MigrateConfig> {
    let mut config = MigrateConfig::load(&options.config)?;
    debug!("loaded config from {}", options.config.display());

    if options.kubeconfig.is_some() || options.master.is_some() {
        let StoreConfig::Kube(kube) = &mut config.store else {
            anyhow::bail!("--kubeconfig and --master need a kube store");
        };
        if let Some(path) = &options.kubeconfig {
            kube.kubeconfig = Some(path.clone());
        }
        if let Some(server) = &options.master {
            kube.server = Some(server.clone());
        }
    }
    Ok(config)
}

pub fn open_store(
    config: &StoreConfig,
    runtime: &BlockingRuntime,
) -> anyhow::Result<Arc<dyn ResourceStore>> {
    match config {
        StoreConfig::Kube(kube) => {
            let client = KubeClient::new(kube, runtime.clone())?;
            info!("using kubernetes store");
            Ok(Arc::new(client))
        }
        StoreConfig::Sqlite { path } => {
            create_parent(path)?;
            let store = SqliteStore::new(path)?;
            store.initialize()?;
            info!("using sqlite store at {}", path.display());
            Ok(Arc::new(store))
        }
    }
}

pub fn open_blobs(
    config: &BlobConfig,
    runtime: &BlockingRuntime,
) -> anyhow::Result<Arc<dyn BlobStore>> {
    match config {
        BlobConfig::Fs { root } => {
            fs::create_dir_all(root)?;
            info!("using blob directory {}", root.display());
            Ok(Arc::new(FsBlobStore::new(root)))
        }
        BlobConfig::S3(options) => {
            info!("using s3 bucket {} at {}", options.bucket, options.endpoint);
            Ok(Arc::new(S3BlobStore::new(options, runtime.clone())?))
        }
    }
}

fn create_parent(path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

fn call_context(timeout: Option<Duration>) -> CallContext {
    match timeout {
        Some(timeout) => CallContext::with_timeout(timeout),
        None => CallContext::background(),
    }
}

/// Runs one command to completion.
pub fn run(command: Commands, options: &GlobalOptions) -> anyhow::Result<Report> {
    let mut config = load_config(options)?;

    let source = match command {
        Commands::Convert {
            legacy_dir,
            multi_cluster_enable,
            timeout,
        } => {
            if let Some(dir) = legacy_dir {
                config.legacy_dir = dir;
            }
            config.multi_cluster |= multi_cluster_enable;
            config.timeout_secs = timeout.or(config.timeout_secs);
            Source::LegacyDir(config.legacy_dir.clone())
        }
        Commands::Import {
            chart_list_url,
            chart_path,
            timeout,
        } => {
            config.timeout_secs = timeout.or(config.timeout_secs);
            match chart_path {
                Some(path) => Source::ChartPath(path),
                None => Source::ChartList(chart_list_url),
            }
        }
    };

    let runtime = BlockingRuntime::new()?;
    let workflow = Workflow::new(
        open_store(&config.store, &runtime)?,
        open_blobs(&config.blob, &runtime)?,
    )
        .with_retry(RetryPolicy::from(&config.retry))
        .with_multi_cluster(config.multi_cluster);
    let ctx = call_context(config.timeout());

    Ok(workflow.run(&ctx, &source)?)
}
