//! Rows of the legacy application store as they appear in the dump files.
//!
//! Field names follow the dumper's output. The dumper was not consistent about
//! casing (`RepoId` vs `RepoID`), so both spellings are accepted. Every field
//! defaults to its zero value when absent.

use serde::{Deserialize, Serialize};

pub const STATE_ACTIVE: &str = "active";
pub const STATE_SUSPENDED: &str = "suspended";

/// A row is stale when it was once released (active or suspended) but has
/// since been replaced or soft-deleted, which the legacy store records by
/// clearing `Active` while leaving the status alone.
#[must_use]
pub fn is_live(active: bool, status: &str) -> bool {
    active || !(status == STATE_ACTIVE || status == STATE_SUSPENDED)
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct App {
    #[serde(rename = "AppId", alias = "AppID", alias = "app_id")]
    pub app_id: String,
    #[serde(rename = "Name", alias = "name")]
    pub name: String,
    #[serde(rename = "Active")]
    pub active: bool,
    #[serde(rename = "Status")]
    pub status: String,
    #[serde(rename = "RepoId", alias = "RepoID")]
    pub repo_id: String,
    #[serde(rename = "Abstraction")]
    pub abstraction: String,
    #[serde(rename = "Description")]
    pub description: String,
    #[serde(rename = "Home")]
    pub home: String,
    #[serde(rename = "Icon")]
    pub icon: String,
    /// Workspace of the ISV that published the app; empty for built-ins.
    #[serde(rename = "Isv")]
    pub isv: String,
    #[serde(rename = "Owner")]
    pub owner: String,
    /// Comma separated attachment ids.
    #[serde(rename = "Screenshots")]
    pub screenshots: String,
    #[serde(rename = "ChartName")]
    pub chart_name: String,
}

impl App {
    #[must_use]
    pub fn is_live(&self) -> bool {
        is_live(self.active, &self.status)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppVersion {
    #[serde(rename = "VersionId", alias = "VersionID")]
    pub version_id: String,
    #[serde(rename = "AppId", alias = "AppID")]
    pub app_id: String,
    /// Display name, e.g. `1.2.0 [app-1.0]`.
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Active")]
    pub active: bool,
    #[serde(rename = "Status")]
    pub status: String,
    #[serde(rename = "PackageName")]
    pub package_name: String,
    #[serde(rename = "Description")]
    pub description: String,
    #[serde(rename = "Home")]
    pub home: String,
    #[serde(rename = "Icon")]
    pub icon: String,
    #[serde(rename = "Owner")]
    pub owner: String,
    #[serde(rename = "Type")]
    pub kind: String,
}

impl AppVersion {
    #[must_use]
    pub fn is_live(&self) -> bool {
        is_live(self.active, &self.status)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Category {
    #[serde(rename = "CategoryID", alias = "CategoryId")]
    pub category_id: String,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Description")]
    pub description: String,
    #[serde(rename = "Icon")]
    pub icon: String,
    /// i18n names as a JSON string, e.g. `{"zh_cn": "数据库", "en": "database"}`.
    #[serde(rename = "Locale")]
    pub locale: String,
    #[serde(rename = "Owner")]
    pub owner: String,
}

pub const CATEGORY_RESOURCE_ENABLED: &str = "enabled";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoryResource {
    #[serde(rename = "CategoryId", alias = "CategoryID")]
    pub category_id: String,
    #[serde(rename = "ResourceId", alias = "ResourceID")]
    pub resource_id: String,
    /// `enabled` or `disabled`.
    #[serde(rename = "status", alias = "Status")]
    pub status: String,
}

/// A deployed instance of an app version in some namespace.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Cluster {
    #[serde(rename = "ClusterId", alias = "ClusterID")]
    pub cluster_id: String,
    #[serde(rename = "AppId", alias = "AppID")]
    pub app_id: String,
    #[serde(rename = "VersionId", alias = "VersionID")]
    pub version_id: String,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Description")]
    pub description: String,
    /// Release values as a JSON document.
    #[serde(rename = "Env")]
    pub env: String,
    #[serde(rename = "Owner")]
    pub owner: String,
    /// Name of the member cluster the release runs in.
    #[serde(rename = "RuntimeId", alias = "RuntimeID")]
    pub runtime_id: String,
    #[serde(rename = "Status")]
    pub status: String,
    /// Namespace of the release.
    #[serde(rename = "Zone")]
    pub zone: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Repo {
    #[serde(rename = "RepoID", alias = "RepoId")]
    pub repo_id: String,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "URL", alias = "Url")]
    pub url: String,
    #[serde(rename = "Description")]
    pub description: String,
    /// JSON `{"access_key_id": .., "secret_key_id": ..}`, or `{}` when unset.
    #[serde(rename = "Credential")]
    pub credential: String,
    #[serde(rename = "Owner")]
    pub owner: String,
    #[serde(rename = "Type")]
    pub kind: String,
    #[serde(rename = "status", alias = "Status")]
    pub status: String,
    #[serde(rename = "Visibility", alias = "visibility")]
    pub visibility: String,
}

pub const REPO_LABEL_WORKSPACE: &str = "workspace";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RepoLabel {
    #[serde(rename = "RepoLabelId")]
    pub repo_label_id: String,
    #[serde(rename = "RepoId", alias = "RepoID")]
    pub repo_id: String,
    #[serde(rename = "LabelKey")]
    pub label_key: String,
    #[serde(rename = "LabelValue")]
    pub label_value: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_liveness_rule() {
        assert!(is_live(true, STATE_ACTIVE));
        assert!(is_live(true, STATE_SUSPENDED));
        assert!(!is_live(false, STATE_ACTIVE));
        assert!(!is_live(false, STATE_SUSPENDED));
        assert!(is_live(false, "draft"));
        assert!(is_live(false, ""));
    }

    #[test]
    fn test_app_accepts_both_casings_and_missing_fields() {
        let apps: Vec<App> = serde_json::from_str(
            r#"[{"AppId": "app-A", "RepoID": "repo-1"}, {"AppID": "app-B", "name": "nginx"}]"#,
        )
        .unwrap();
        assert_eq!(apps[0].app_id, "app-A");
        assert_eq!(apps[0].repo_id, "repo-1");
        assert!(!apps[0].active);
        assert_eq!(apps[1].app_id, "app-B");
        assert_eq!(apps[1].name, "nginx");
        assert_eq!(apps[1].status, "");
    }
}
