use std::fs::File;

use chrono::Utc;
use tracing::{debug, error, info, warn};

use super::status::reconcile_status;
use super::{Conversion, object_meta};
use crate::blob::package_key;
use crate::chart::digest;
use crate::error::Result;
use crate::legacy::{self, ATTACHMENT_PREFIX, AppVersion, convert_creator};
use crate::store::owner_reference;
use crate::types::{
    APP_ID_LABEL_KEY, ATTACHMENT_ID_PREFIX, Application, ApplicationSpec, ApplicationVersion,
    ApplicationVersionSpec, BUILTIN_LABEL_KEY, CATEGORY_ID_LABEL_KEY, Resource,
    VersionMetadata, WORKSPACE_LABEL_KEY, new_id,
};

/// What the legacy store writes for an unset ISV.
const NULL_ISV: &str = "\u{0}";

impl Conversion<'_> {
    /// Creates standalone apps (those outside any repo) with their versions.
    /// Apps in a repo live in the repo's index instead.
    pub(super) fn create_apps(&mut self) -> Result<()> {
        let snapshot = self.snapshot;
        let relations = self.relations;
        info!("convert {} apps", snapshot.apps.len());

        for app in snapshot.apps.iter().filter(|app| app.repo_id.is_empty()) {
            self.ctx.check()?;
            let application = self.create_app(app)?;
            for version in relations.versions_of(&app.app_id) {
                self.ctx.check()?;
                if let Err(e) = self.create_app_version(&application, version) {
                    if e.is_interrupted() {
                        return Err(e);
                    }
                    error!(
                        "convert version {} of app {} failed, skipped: {e}",
                        version.version_id, app.app_id
                    );
                    self.report.versions.skipped += 1;
                }
            }
        }
        Ok(())
    }

    /// Creates the application for `app`, or returns the one an earlier run
    /// created. Attachments are only uploaded for a new application.
    fn create_app(&mut self, app: &legacy::App) -> Result<Application> {
        let name = app.app_id.to_lowercase();
        match self.store.get_application(self.ctx, &name) {
            Ok(existing) => {
                info!("app {name} already exists");
                self.report.applications.existing += 1;
                return Ok(existing);
            }
            Err(e) if e.is_not_found() => {}
            Err(e) => {
                error!("get app {name} failed: {e}");
                return Err(e);
            }
        }

        let mut metadata = object_meta(name.as_str(), &app.owner);
        if app.isv.is_empty() || app.isv == NULL_ISV {
            metadata
                .labels
                .insert(BUILTIN_LABEL_KEY.to_string(), "true".to_string());
        } else {
            metadata
                .labels
                .insert(WORKSPACE_LABEL_KEY.to_string(), app.isv.clone());
        }
        if let Some(category_id) = self.relations.category_of(&app.app_id) {
            metadata.labels.insert(
                CATEGORY_ID_LABEL_KEY.to_string(),
                category_id.to_lowercase(),
            );
        }

        let resource = Application {
            metadata,
            spec: ApplicationSpec {
                name: app.name.clone(),
                description: app.description.clone(),
                abstraction: app.abstraction.clone(),
                icon: self.convert_icon(&app.app_id, &app.icon),
                app_home: app.home.clone(),
                attachments: self.convert_screenshots(&app.app_id, &app.screenshots),
            },
        };

        match self.store.create_application(self.ctx, &resource) {
            Ok(created) => {
                info!("create app {name} success");
                self.report.applications.created += 1;
                Ok(created)
            }
            Err(e) if e.is_already_exists() => {
                info!("app {name} already exists");
                self.report.applications.existing += 1;
                self.store.get_application(self.ctx, &name)
            }
            Err(e) => {
                error!("create app {} failed: {e}", app.app_id);
                Err(e)
            }
        }
    }

    /// Re-uploads an attachment icon under a new id. Other icons (URLs) are
    /// kept as they are; a failed upload leaves the app without an icon.
    fn convert_icon(&self, app_id: &str, icon: &str) -> String {
        if !icon.starts_with(ATTACHMENT_PREFIX) {
            return icon.to_string();
        }
        match self.upload_attachment(icon) {
            Ok(id) => id,
            Err(e) => {
                warn!("upload icon {icon} of app {app_id} failed: {e}");
                String::new()
            }
        }
    }

    fn convert_screenshots(&self, app_id: &str, screenshots: &str) -> Vec<String> {
        screenshots
            .split(',')
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .filter_map(|id| match self.upload_attachment(id) {
                Ok(new_id) => Some(new_id),
                Err(e) => {
                    warn!("upload screenshot {id} of app {app_id} failed: {e}");
                    None
                }
            })
            .collect()
    }

    /// Uploads `{legacy_dir}/{id}/raw` under a fresh attachment id.
    fn upload_attachment(&self, legacy_id: &str) -> Result<String> {
        let path = self.resolver.attachment_dir(legacy_id)?.join("raw");
        let mut file = File::open(&path)?;
        let id = new_id(ATTACHMENT_ID_PREFIX);
        self.blobs.upload(self.ctx, &id, &id, &mut file)?;
        debug!("upload attachment {legacy_id} as {id}");
        Ok(id)
    }

    /// Packages and uploads the version's chart, creates the version owned by
    /// `app` and brings its status to the legacy state.
    fn create_app_version(&mut self, app: &Application, version: &AppVersion) -> Result<()> {
        let name = version.version_id.to_lowercase();
        let chart = self.resolver.load_attachment(&version.package_name)?;
        let package = chart.package()?;

        self.blobs.upload(
            self.ctx,
            &package_key(app.workspace(), &name),
            &name,
            &mut package.as_slice(),
        )?;

        let mut metadata = object_meta(name.as_str(), &version.owner);
        metadata
            .labels
            .insert(APP_ID_LABEL_KEY.to_string(), app.name().to_string());
        if !app.workspace().is_empty() {
            metadata
                .labels
                .insert(WORKSPACE_LABEL_KEY.to_string(), app.workspace().to_string());
        }
        metadata.owner_references.push(owner_reference(app));

        let resource = ApplicationVersion {
            metadata,
            spec: ApplicationVersionSpec {
                metadata: VersionMetadata {
                    name: chart.name().to_string(),
                    version: chart.version().to_string(),
                    app_version: chart.app_version().to_string(),
                    description: chart.metadata.description.clone(),
                    icon: chart.metadata.icon.clone(),
                    home: chart.metadata.home.clone(),
                },
                urls: Vec::new(),
                digest: digest(&package),
                data_key: name.clone(),
            },
            status: Default::default(),
        };

        match self.store.create_application_version(self.ctx, &resource) {
            Ok(_) => {
                info!("create app version {name} success");
                self.report.versions.created += 1;
            }
            Err(e) if e.is_already_exists() => {
                info!("app version {name} already exists");
                self.report.versions.existing += 1;
            }
            Err(e) => return Err(e),
        }

        let state = version.status.as_str();
        let operator = convert_creator(&version.owner);
        let outcome = reconcile_status::<ApplicationVersion>(
            self.store,
            self.ctx,
            self.retry,
            &name,
            |current| current.status.state == state,
            |current| {
                current.status.transition(state, operator, Utc::now());
            },
        )?;
        debug!("update app version {name} status: {outcome:?}");
        self.report.record_status(outcome);
        Ok(())
    }
}
