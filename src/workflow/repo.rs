use chrono::Utc;
use serde::Deserialize;
use tracing::{debug, error, info};

use super::status::reconcile_status;
use super::{Conversion, object_meta};
use crate::error::{Error, Result};
use crate::legacy::Repo;
use crate::types::*;

/// Repositories the legacy store ships with; they have no counterpart.
const BUILTIN_REPOS: [&str; 2] = ["repo-vmbased", "repo-helm"];

/// Credential as stored by the legacy store.
#[derive(Debug, Deserialize)]
struct LegacyCredential {
    #[serde(default)]
    access_key_id: String,
    #[serde(default)]
    secret_key_id: String,
}

/// Re-shapes a legacy credential. Anything of two characters or less (`{}`,
/// `""`) is an unset credential.
pub(super) fn convert_credential(raw: &str) -> Result<RepoCredential> {
    if raw.len() <= 2 {
        return Ok(RepoCredential::default());
    }
    let legacy: LegacyCredential =
        serde_json::from_str(raw).map_err(|e| Error::InvalidCredential(e.to_string()))?;
    Ok(RepoCredential {
        s3_config: S3Config {
            access_key_id: legacy.access_key_id,
            secret_access_key: legacy.secret_key_id,
        },
        ..Default::default()
    })
}

impl Conversion<'_> {
    /// Creates the repositories, then writes each one's index into its
    /// status.
    pub(super) fn create_repos(&mut self) -> Result<()> {
        let snapshot = self.snapshot;
        info!("convert {} repos", snapshot.repos.len());

        for repo in &snapshot.repos {
            self.ctx.check()?;
            if BUILTIN_REPOS.contains(&repo.repo_id.as_str()) {
                debug!("skip builtin repo {}", repo.repo_id);
                self.report.repositories.skipped += 1;
                continue;
            }

            let resource = self.repo_resource(repo).inspect_err(|e| {
                error!("convert credential of repo {} failed: {e}", repo.repo_id);
            })?;
            match self.store.create_repository(self.ctx, &resource) {
                Ok(_) => {
                    info!("create repo {} success", resource.name());
                    self.report.repositories.created += 1;
                }
                Err(e) if e.is_already_exists() => {
                    info!("repo {} already exists", resource.name());
                    self.report.repositories.existing += 1;
                }
                Err(e) => {
                    error!("create repo {} failed: {e}", repo.repo_id);
                    return Err(e);
                }
            }

            self.update_repo_status(repo)?;
        }
        Ok(())
    }

    fn repo_resource(&self, repo: &Repo) -> Result<Repository> {
        let mut metadata = object_meta(repo.repo_id.to_lowercase(), &repo.owner);
        if let Some(workspace) = self.relations.repo_workspace(&repo.repo_id) {
            metadata
                .labels
                .insert(WORKSPACE_LABEL_KEY.to_string(), workspace.to_string());
        }

        Ok(Repository {
            metadata,
            spec: RepositorySpec {
                name: repo.name.clone(),
                url: repo.url.clone(),
                description: repo.description.clone(),
                credential: convert_credential(&repo.credential)?,
                version: 1,
            },
            status: RepositoryStatus::default(),
        })
    }

    /// Index of the live apps in a repo and their versions, keyed by app
    /// name.
    fn repo_index(&self, repo_id: &str) -> SavedIndex {
        let mut index = SavedIndex::new(Utc::now());
        for app_id in self.relations.app_ids_in_repo(repo_id) {
            let Some(app) = self.relations.app(app_id) else {
                continue;
            };

            let charts = self
                .relations
                .versions_of(app_id)
                .iter()
                .map(|version| {
                    let chart = self.resolver.resolve(version);
                    IndexChartVersion {
                        application_version_id: version.version_id.to_lowercase(),
                        name: chart.name,
                        version: chart.version,
                        app_version: chart.app_version,
                        description: version.description.clone(),
                        icon: version.icon.clone(),
                        urls: vec![version.package_name.clone()],
                    }
                })
                .collect();

            index.applications.insert(
                app.name.clone(),
                IndexApplication {
                    name: app.name.clone(),
                    application_id: app_id.to_lowercase(),
                    description: app.description.clone(),
                    status: app.status.clone(),
                    icon: app.icon.clone(),
                    charts,
                },
            );
        }
        index
    }

    fn update_repo_status(&mut self, repo: &Repo) -> Result<()> {
        let name = repo.repo_id.to_lowercase();
        let index = self.repo_index(&repo.repo_id);
        debug!(
            "repo {name} index has {} apps",
            index.applications.len()
        );
        let data = index.encode()?;

        let outcome = reconcile_status::<Repository>(
            self.store,
            self.ctx,
            self.retry,
            &name,
            |current| {
                current.status.state == REPO_STATE_SUCCESSFUL
                    && current.status.version == current.spec.version
                    && !current.status.data.is_empty()
            },
            |current| apply_index(&mut current.status, current.spec.version, &data),
        )
        .inspect_err(|e| error!("update repo {name} status failed: {e}"))?;

        info!("update repo {name} status: {outcome:?}");
        self.report.record_status(outcome);
        Ok(())
    }
}

fn apply_index(status: &mut RepositoryStatus, spec_version: i64, data: &str) {
    let now = Utc::now();
    status.data = data.to_string();
    status.version = spec_version;
    status.state = REPO_STATE_SUCCESSFUL.to_string();
    status.last_update_time = Some(now);
    status.push_sync_state(RepoSyncState {
        state: REPO_STATE_SUCCESSFUL.to_string(),
        message: String::new(),
        sync_time: Some(now),
    });
}
