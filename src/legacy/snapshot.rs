use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use tracing::{error, info};

use super::models::*;
use crate::error::Result;

pub const APPS_FILE: &str = "apps.json";
pub const APP_VERSIONS_FILE: &str = "app_versions.json";
pub const CATEGORIES_FILE: &str = "categories.json";
pub const CATEGORY_RESOURCES_FILE: &str = "category_resources.json";
pub const CLUSTERS_FILE: &str = "clusters.json";
pub const REPOS_FILE: &str = "repos.json";
pub const REPO_LABELS_FILE: &str = "repo_labels.json";

/// Every table of the legacy dump, in file order.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub apps: Vec<App>,
    pub app_versions: Vec<AppVersion>,
    pub categories: Vec<Category>,
    pub category_resources: Vec<CategoryResource>,
    pub clusters: Vec<Cluster>,
    pub repos: Vec<Repo>,
    pub repo_labels: Vec<RepoLabel>,
}

impl Snapshot {
    /// Loads all seven dump files. Any missing or malformed file fails the
    /// whole load.
    pub fn load(legacy_dir: &Path) -> Result<Self> {
        let snapshot = Self {
            apps: load_table(legacy_dir, APPS_FILE)?,
            app_versions: load_table(legacy_dir, APP_VERSIONS_FILE)?,
            categories: load_table(legacy_dir, CATEGORIES_FILE)?,
            category_resources: load_table(legacy_dir, CATEGORY_RESOURCES_FILE)?,
            repos: load_table(legacy_dir, REPOS_FILE)?,
            repo_labels: load_table(legacy_dir, REPO_LABELS_FILE)?,
            clusters: load_table(legacy_dir, CLUSTERS_FILE)?,
        };
        Ok(snapshot)
    }
}

fn load_table<T: DeserializeOwned>(legacy_dir: &Path, file: &str) -> Result<Vec<T>> {
    let path: PathBuf = legacy_dir.join(file);
    let rows = read_rows(&path).inspect_err(|e| {
        error!("load {} failed: {e}", path.display());
    })?;
    info!("load {file} success, {} rows", rows.len());
    Ok(rows)
}

fn read_rows<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let data = fs::read(path)?;
    // The dumper writes `null` for an empty table.
    let rows: Option<Vec<T>> = serde_json::from_slice(&data)?;
    Ok(rows.unwrap_or_default())
}
