//! Helm charts: the manifest, loading from a directory or archive, packaging,
//! and resolving chart identity for legacy app versions.

mod archive;
mod resolve;

pub use archive::{digest, load_archive, load_dir};
pub use resolve::{ChartInfo, ChartResolver, parse_chart_file_name, parse_version_name};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub const CHART_FILE: &str = "Chart.yaml";

/// Contents of `Chart.yaml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChartMetadata {
    pub api_version: String,
    pub name: String,
    pub version: String,
    pub app_version: String,
    pub description: String,
    pub icon: String,
    pub home: String,
    pub keywords: Vec<String>,
    pub sources: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChartFile {
    /// Slash separated path relative to the chart root.
    pub path: String,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Chart {
    pub metadata: ChartMetadata,
    /// Every file of the chart, `Chart.yaml` included, in path order.
    pub files: Vec<ChartFile>,
}

impl Chart {
    pub fn from_files(mut files: Vec<ChartFile>) -> Result<Self> {
        files.sort_by(|a, b| a.path.cmp(&b.path));
        let manifest = files
            .iter()
            .find(|f| f.path == CHART_FILE)
            .ok_or_else(|| Error::Chart(format!("{CHART_FILE} is missing")))?;
        let metadata: ChartMetadata = serde_yaml::from_slice(&manifest.data)?;

        if metadata.name.is_empty() {
            return Err(Error::Chart("chart name is empty".to_string()));
        }
        if metadata.version.is_empty() {
            return Err(Error::Chart(format!(
                "chart {} has no version",
                metadata.name
            )));
        }

        Ok(Self { metadata, files })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    #[must_use]
    pub fn version(&self) -> &str {
        &self.metadata.version
    }

    #[must_use]
    pub fn app_version(&self) -> &str {
        &self.metadata.app_version
    }
}
