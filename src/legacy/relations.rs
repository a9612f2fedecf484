use std::collections::HashMap;

use super::models::*;

/// Lookup indexes derived from the flat dump tables.
///
/// Built once per run and read-only afterwards. Stale apps and versions (see
/// [`is_live`]) are dropped before any index is populated.
#[derive(Debug, Clone, Default)]
pub struct Relations {
    version_id_to_version: HashMap<String, AppVersion>,
    app_id_to_versions: HashMap<String, Vec<AppVersion>>,
    app_id_to_app: HashMap<String, App>,
    repo_id_to_app_ids: HashMap<String, Vec<String>>,
    app_id_to_category_id: HashMap<String, String>,
    repo_workspace: HashMap<String, String>,
}

impl Relations {
    #[must_use]
    pub fn build(
        apps: &[App],
        versions: &[AppVersion],
        category_resources: &[CategoryResource],
        repo_labels: &[RepoLabel],
    ) -> Self {
        let mut relations = Self::default();

        for ver in versions.iter().filter(|v| v.is_live()) {
            relations
                .version_id_to_version
                .insert(ver.version_id.clone(), ver.clone());
            relations
                .app_id_to_versions
                .entry(ver.app_id.clone())
                .or_default()
                .push(ver.clone());
        }

        for app in apps.iter().filter(|a| a.is_live()) {
            relations
                .app_id_to_app
                .insert(app.app_id.clone(), app.clone());
            if !app.repo_id.is_empty() {
                relations
                    .repo_id_to_app_ids
                    .entry(app.repo_id.clone())
                    .or_default()
                    .push(app.app_id.clone());
            }
        }

        for res in category_resources
            .iter()
            .filter(|r| r.status == CATEGORY_RESOURCE_ENABLED)
        {
            relations
                .app_id_to_category_id
                .insert(res.resource_id.clone(), res.category_id.clone());
        }

        for label in repo_labels
            .iter()
            .filter(|l| l.label_key == REPO_LABEL_WORKSPACE && !l.label_value.is_empty())
        {
            relations
                .repo_workspace
                .insert(label.repo_id.clone(), label.label_value.clone());
        }

        relations
    }

    #[must_use]
    pub fn version(&self, version_id: &str) -> Option<&AppVersion> {
        self.version_id_to_version.get(version_id)
    }

    /// Live versions of an app in dump order.
    #[must_use]
    pub fn versions_of(&self, app_id: &str) -> &[AppVersion] {
        self.app_id_to_versions
            .get(app_id)
            .map_or(&[], Vec::as_slice)
    }

    #[must_use]
    pub fn app(&self, app_id: &str) -> Option<&App> {
        self.app_id_to_app.get(app_id)
    }

    #[must_use]
    pub fn app_ids_in_repo(&self, repo_id: &str) -> &[String] {
        self.repo_id_to_app_ids
            .get(repo_id)
            .map_or(&[], Vec::as_slice)
    }

    #[must_use]
    pub fn category_of(&self, app_id: &str) -> Option<&str> {
        self.app_id_to_category_id.get(app_id).map(String::as_str)
    }

    #[must_use]
    pub fn repo_workspace(&self, repo_id: &str) -> Option<&str> {
        self.repo_workspace.get(repo_id).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn app(id: &str, repo: &str, active: bool, status: &str) -> App {
        App {
            app_id: id.to_string(),
            repo_id: repo.to_string(),
            active,
            status: status.to_string(),
            ..Default::default()
        }
    }

    fn version(id: &str, app_id: &str, active: bool, status: &str) -> AppVersion {
        AppVersion {
            version_id: id.to_string(),
            app_id: app_id.to_string(),
            active,
            status: status.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_stale_records_are_excluded_everywhere() {
        let apps = vec![
            app("app-live", "repo-1", true, STATE_ACTIVE),
            app("app-gone", "repo-1", false, STATE_ACTIVE),
            app("app-parked", "repo-1", false, STATE_SUSPENDED),
            app("app-draft", "", false, "draft"),
        ];
        let versions = vec![
            version("ver-1", "app-live", true, STATE_ACTIVE),
            version("ver-2", "app-live", false, STATE_SUSPENDED),
            version("ver-3", "app-draft", false, "draft"),
        ];

        let rel = Relations::build(&apps, &versions, &[], &[]);

        assert!(rel.app("app-live").is_some());
        assert!(rel.app("app-gone").is_none());
        assert!(rel.app("app-parked").is_none());
        assert!(rel.app("app-draft").is_some());
        assert_eq!(rel.app_ids_in_repo("repo-1"), ["app-live".to_string()]);

        assert!(rel.version("ver-1").is_some());
        assert!(rel.version("ver-2").is_none());
        assert!(rel.version("ver-3").is_some());
        let ids: Vec<_> = rel
            .versions_of("app-live")
            .iter()
            .map(|v| v.version_id.as_str())
            .collect();
        assert_eq!(ids, ["ver-1"]);
    }

    #[test]
    fn test_versions_keep_dump_order_and_latest_wins() {
        let mut dup = version("ver-1", "app-1", true, STATE_ACTIVE);
        dup.name = "second".to_string();
        let versions = vec![
            version("ver-1", "app-1", true, STATE_ACTIVE),
            version("ver-0", "app-1", true, "draft"),
            dup,
        ];

        let rel = Relations::build(&[], &versions, &[], &[]);

        assert_eq!(rel.version("ver-1").unwrap().name, "second");
        let ids: Vec<_> = rel
            .versions_of("app-1")
            .iter()
            .map(|v| v.version_id.as_str())
            .collect();
        assert_eq!(ids, ["ver-1", "ver-0", "ver-1"]);
    }

    #[test]
    fn test_only_enabled_categories_are_linked() {
        let resources = vec![
            CategoryResource {
                category_id: "ctg-A".to_string(),
                resource_id: "app-1".to_string(),
                status: "enabled".to_string(),
            },
            CategoryResource {
                category_id: "ctg-B".to_string(),
                resource_id: "app-2".to_string(),
                status: "disabled".to_string(),
            },
        ];

        let rel = Relations::build(&[], &[], &resources, &[]);
        assert_eq!(rel.category_of("app-1"), Some("ctg-A"));
        assert_eq!(rel.category_of("app-2"), None);
    }

    #[test]
    fn test_empty_workspace_label_means_no_workspace() {
        let labels = vec![
            RepoLabel {
                repo_id: "repo-1".to_string(),
                label_key: "workspace".to_string(),
                label_value: "ws-a".to_string(),
                ..Default::default()
            },
            RepoLabel {
                repo_id: "repo-2".to_string(),
                label_key: "workspace".to_string(),
                label_value: String::new(),
                ..Default::default()
            },
            RepoLabel {
                repo_id: "repo-3".to_string(),
                label_key: "team".to_string(),
                label_value: "x".to_string(),
                ..Default::default()
            },
        ];

        let rel = Relations::build(&[], &[], &[], &labels);
        assert_eq!(rel.repo_workspace("repo-1"), Some("ws-a"));
        assert_eq!(rel.repo_workspace("repo-2"), None);
        assert_eq!(rel.repo_workspace("repo-3"), None);
    }
}
