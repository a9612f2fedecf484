use std::collections::BTreeMap;

use tracing::{error, info, warn};

use super::{Conversion, object_meta};
use crate::error::Result;
use crate::legacy;
use crate::types::*;

/// Renders the legacy JSON environment of a release as a YAML values
/// document. An empty environment gives empty values.
pub(super) fn env_to_values(env: &str) -> Result<String> {
    if env.trim().is_empty() {
        return Ok(String::new());
    }
    let value: serde_json::Value = serde_json::from_str(env)?;
    Ok(serde_yaml::to_string(&value)?)
}

impl Conversion<'_> {
    /// Creates a release per legacy cluster. Releases whose workspace, version
    /// or values cannot be worked out are skipped with a warning.
    pub(super) fn create_releases(&mut self) -> Result<()> {
        let snapshot = self.snapshot;
        info!("convert {} releases", snapshot.clusters.len());

        for cluster in &snapshot.clusters {
            self.ctx.check()?;
            self.create_release(cluster)?;
        }
        Ok(())
    }

    fn create_release(&mut self, cluster: &legacy::Cluster) -> Result<()> {
        let name = cluster.cluster_id.to_lowercase();

        let Some(version) = self.relations.version(&cluster.version_id) else {
            warn!(
                "version {} of release {} not found, skipped",
                cluster.version_id, cluster.cluster_id
            );
            self.report.releases.skipped += 1;
            return Ok(());
        };

        let mut labels = BTreeMap::from([
            (APP_ID_LABEL_KEY.to_string(), cluster.app_id.to_lowercase()),
            (
                APP_VERSION_ID_LABEL_KEY.to_string(),
                cluster.version_id.to_lowercase(),
            ),
            (NAMESPACE_LABEL_KEY.to_string(), cluster.zone.clone()),
        ]);

        let mut repo_id = String::new();
        match self.relations.app(&cluster.app_id) {
            Some(app) if !app.repo_id.is_empty() => {
                repo_id = app.repo_id.to_lowercase();
                labels.insert(REPO_ID_LABEL_KEY.to_string(), repo_id.clone());
            }
            Some(_) => {}
            None => warn!(
                "app {} of release {} not found",
                cluster.app_id, cluster.cluster_id
            ),
        }
        if self.multi_cluster {
            labels.insert(
                CLUSTER_NAME_LABEL_KEY.to_string(),
                cluster.runtime_id.clone(),
            );
        }

        let workspace = match self.release_workspace(cluster) {
            Ok(workspace) => workspace,
            Err(e) if e.is_interrupted() => return Err(e),
            Err(e) => {
                warn!(
                    "get workspace of release {} in namespace {} failed, skipped: {e}",
                    cluster.cluster_id, cluster.zone
                );
                self.report.releases.skipped += 1;
                return Ok(());
            }
        };
        if !workspace.is_empty() {
            labels.insert(WORKSPACE_LABEL_KEY.to_string(), workspace);
        }

        let chart = self.resolver.resolve(version);
        if !chart.is_resolved() {
            warn!(
                "chart of version {} for release {} is unresolved",
                version.version_id, cluster.cluster_id
            );
        }

        let values = match env_to_values(&cluster.env) {
            Ok(values) => values,
            Err(e) => {
                warn!(
                    "convert env of release {} failed, skipped: {e}",
                    cluster.cluster_id
                );
                self.report.releases.skipped += 1;
                return Ok(());
            }
        };

        let mut metadata = object_meta(name.as_str(), &cluster.owner);
        metadata.labels = labels;
        let release = Release {
            metadata,
            spec: ReleaseSpec {
                name: cluster.name.clone(),
                description: cluster.description.clone(),
                chart_name: chart.name,
                chart_version: chart.version,
                chart_app_version: chart.app_version,
                application_id: cluster.app_id.to_lowercase(),
                application_version_id: cluster.version_id.to_lowercase(),
                repo_id,
                version: 1,
                values,
            },
        };

        match self.store.create_release(self.ctx, &release) {
            Ok(_) => {
                info!("create release {name} success");
                self.report.releases.created += 1;
                Ok(())
            }
            Err(e) if e.is_already_exists() => {
                info!("release {name} already exists");
                self.report.releases.existing += 1;
                Ok(())
            }
            Err(e) => {
                error!("create release {} failed: {e}", cluster.cluster_id);
                Err(e)
            }
        }
    }

    /// Workspace label of the namespace the release runs in. With multiple
    /// clusters the namespace is looked up on the release's own cluster; a
    /// cluster that no longer exists gives no workspace.
    fn release_workspace(&mut self, cluster: &legacy::Cluster) -> Result<String> {
        if !self.multi_cluster {
            let namespace = self.store.get_namespace(self.ctx, &cluster.zone)?;
            return Ok(namespace.workspace().to_string());
        }

        if !self.members.contains_key(&cluster.runtime_id) {
            let member = match self.store.get_cluster(self.ctx, &cluster.runtime_id) {
                Ok(member) => member,
                Err(e) if e.is_not_found() => {
                    warn!(
                        "cluster {} of release {} not found, no workspace",
                        cluster.runtime_id, cluster.cluster_id
                    );
                    return Ok(String::new());
                }
                Err(e) => return Err(e),
            };
            if member.is_host() {
                let namespace = self.store.get_namespace(self.ctx, &cluster.zone)?;
                return Ok(namespace.workspace().to_string());
            }
            let client = self.store.connect_cluster(self.ctx, &member)?;
            self.members.insert(cluster.runtime_id.clone(), client);
        }

        let namespace = match self.members.get(&cluster.runtime_id) {
            Some(client) => client.get_namespace(self.ctx, &cluster.zone)?,
            None => self.store.get_namespace(self.ctx, &cluster.zone)?,
        };
        Ok(namespace.workspace().to_string())
    }
}
