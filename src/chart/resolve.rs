use std::path::{Path, PathBuf};

use tracing::debug;

use super::{Chart, load_dir};
use crate::error::{Error, Result};
use crate::legacy::{ATTACHMENT_PREFIX, AppVersion};

/// Chart identity of a legacy app version. All fields are empty when it
/// could not be resolved.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChartInfo {
    pub name: String,
    pub version: String,
    pub app_version: String,
}

impl ChartInfo {
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        !self.name.is_empty()
    }
}

impl From<&Chart> for ChartInfo {
    fn from(chart: &Chart) -> Self {
        Self {
            name: chart.name().to_string(),
            version: chart.version().to_string(),
            app_version: chart.app_version().to_string(),
        }
    }
}

/// Finds the chart behind a legacy app version, reading packaged charts from
/// the dump's attachment directory.
#[derive(Debug, Clone)]
pub struct ChartResolver {
    legacy_dir: PathBuf,
}

impl ChartResolver {
    pub fn new(legacy_dir: impl Into<PathBuf>) -> Self {
        Self {
            legacy_dir: legacy_dir.into(),
        }
    }

    #[must_use]
    pub fn legacy_dir(&self) -> &Path {
        &self.legacy_dir
    }

    /// Directory of an attachment in the dump. Ids that would escape the
    /// dump directory are rejected.
    pub fn attachment_dir(&self, attachment_id: &str) -> Result<PathBuf> {
        if attachment_id.is_empty()
            || attachment_id.contains(['/', '\\'])
            || attachment_id == "."
            || attachment_id == ".."
        {
            return Err(Error::Chart(format!(
                "invalid attachment id {attachment_id:?}"
            )));
        }
        Ok(self.legacy_dir.join(attachment_id))
    }

    /// Loads the unpacked chart stored under `{legacy_dir}/{attachment_id}/`.
    pub fn load_attachment(&self, attachment_id: &str) -> Result<Chart> {
        load_dir(&self.attachment_dir(attachment_id)?)
    }

    /// Resolves the chart name, version and app version.
    ///
    /// Attachment packages are authoritative. Otherwise the package name and
    /// the version display name are parsed, which is a best-effort heuristic:
    /// the chart name is everything before the first occurrence of the version
    /// string in the file name, so a name that itself contains the version
    /// string is split too early.
    #[must_use]
    pub fn resolve(&self, version: &AppVersion) -> ChartInfo {
        if version.package_name.starts_with(ATTACHMENT_PREFIX) {
            match self.load_attachment(&version.package_name) {
                Ok(chart) => return ChartInfo::from(&chart),
                Err(e) => debug!(
                    "load package {} of version {} failed, falling back to name parsing: {e}",
                    version.package_name, version.version_id
                ),
            }
        }

        split_package_name(&version.package_name, &version.name)
    }
}

fn split_package_name(package_name: &str, version_name: &str) -> ChartInfo {
    let Some(file_name) = package_name.rsplit('/').next() else {
        return ChartInfo::default();
    };
    let (version, app_version) = parse_version_name(version_name);
    match file_name.find(&version) {
        Some(index) if index > 0 => ChartInfo {
            name: file_name[..index].to_string(),
            version,
            app_version,
        },
        _ => ChartInfo::default(),
    }
}

/// Splits a version display name like `1.2.0 [app-1.0]` into the chart
/// version and the optional bracketed app version.
#[must_use]
pub fn parse_version_name(name: &str) -> (String, String) {
    let name = name.trim();
    if name.is_empty() {
        return (String::new(), String::new());
    }

    let mut parts = name.split('[');
    let version = parts.next().unwrap_or_default();
    match parts.next() {
        None => (version.to_string(), String::new()),
        Some(app_version) => (
            version.trim().to_string(),
            app_version.trim_matches(']').trim().to_string(),
        ),
    }
}

/// Parses `<name>-<version>.<ext>` from the last segment of a chart URL or
/// path, splitting on the last dash and the last dot.
pub fn parse_chart_file_name(location: &str) -> Result<(String, String)> {
    let invalid = || Error::Chart(format!("cannot parse chart name and version from {location}"));

    let slash = location.rfind('/').ok_or_else(invalid)?;
    let file_name = &location[slash + 1..];

    let dash = file_name.rfind('-').filter(|&i| i > 0).ok_or_else(invalid)?;
    let name = &file_name[..dash];

    let rest = &file_name[dash + 1..];
    let dot = rest.rfind('.').filter(|&i| i > 0).ok_or_else(invalid)?;

    Ok((name.to_string(), rest[..dot].to_string()))
}
