//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use chartshift::context::CallContext;
use chartshift::error::{Error, Result};
use chartshift::store::{NamespaceApi, ResourceStore, SqliteStore};
use chartshift::types::*;
use serde_json::{Value, json};

/// Writes a legacy dump: the seven table files plus attachment directories.
pub struct LegacyDump {
    apps: Vec<Value>,
    app_versions: Vec<Value>,
    categories: Vec<Value>,
    category_resources: Vec<Value>,
    clusters: Vec<Value>,
    repos: Vec<Value>,
    repo_labels: Vec<Value>,
}

impl LegacyDump {
    pub fn new() -> Self {
        Self {
            apps: Vec::new(),
            app_versions: Vec::new(),
            categories: Vec::new(),
            category_resources: Vec::new(),
            clusters: Vec::new(),
            repos: Vec::new(),
            repo_labels: Vec::new(),
        }
    }

    /// The dump most tests run against:
    ///
    /// - category `ctg-DB` holding the built-in app `app-NGINX`
    /// - `app-NGINX` with one live version and one replaced version
    /// - repo `repo-CHARTS` in workspace `ws-a` holding `app-REDIS`
    /// - the built-in repo `repo-helm`
    /// - release `cl-WEB` of nginx in namespace `demo`
    /// - release `cl-DANGLING` of a version that does not exist
    pub fn standard() -> Self {
        Self::new()
            .category("ctg-DB", "database")
            .category_resource("ctg-DB", "app-NGINX")
            .app(json!({
                "AppId": "app-NGINX",
                "Name": "nginx",
                "Active": true,
                "Status": "active",
                "Isv": "",
                "Owner": "system",
                "Icon": "att-ICON",
            }))
            .version(json!({
                "VersionId": "appv-NGINX1",
                "AppId": "app-NGINX",
                "Name": "1.0.0 [1.25]",
                "Active": true,
                "Status": "active",
                "PackageName": "att-PKG1",
                "Owner": "usr-dev",
            }))
            .version(json!({
                "VersionId": "appv-NGINX0",
                "AppId": "app-NGINX",
                "Name": "0.9.0",
                "Active": false,
                "Status": "active",
                "PackageName": "att-PKG0",
                "Owner": "usr-dev",
            }))
            .app(json!({
                "AppId": "app-REDIS",
                "Name": "redis",
                "Active": true,
                "Status": "active",
                "RepoId": "repo-CHARTS",
                "Owner": "usr-dev",
            }))
            .version(json!({
                "VersionId": "appv-REDIS1",
                "AppId": "app-REDIS",
                "Name": "6.0.0 [6.0]",
                "Active": true,
                "Status": "active",
                "PackageName": "redis-6.0.0.tgz",
                "Owner": "usr-dev",
            }))
            .repo(json!({
                "RepoID": "repo-CHARTS",
                "Name": "charts",
                "URL": "https://charts.example.com",
                "Credential": "{}",
                "Owner": "usr-dev",
            }))
            .repo(json!({ "RepoID": "repo-helm", "Name": "helm", "Owner": "system" }))
            .repo_label("repo-CHARTS", "workspace", "ws-a")
            .cluster(json!({
                "ClusterId": "cl-WEB",
                "AppId": "app-NGINX",
                "VersionId": "appv-NGINX1",
                "Name": "web",
                "Env": "{\"replicas\": 2}",
                "Owner": "usr-dev",
                "Zone": "demo",
            }))
            .cluster(json!({
                "ClusterId": "cl-DANGLING",
                "AppId": "app-NGINX",
                "VersionId": "appv-GONE",
                "Name": "old",
                "Zone": "demo",
            }))
    }

    pub fn app(mut self, row: Value) -> Self {
        self.apps.push(row);
        self
    }

    pub fn version(mut self, row: Value) -> Self {
        self.app_versions.push(row);
        self
    }

    pub fn category(mut self, id: &str, name: &str) -> Self {
        self.categories.push(json!({
            "CategoryID": id,
            "Name": name,
            "Locale": "{}",
            "Owner": "system",
        }));
        self
    }

    pub fn category_resource(mut self, category_id: &str, resource_id: &str) -> Self {
        self.category_resources.push(json!({
            "CategoryId": category_id,
            "ResourceId": resource_id,
            "status": "enabled",
        }));
        self
    }

    pub fn cluster(mut self, row: Value) -> Self {
        self.clusters.push(row);
        self
    }

    pub fn repo(mut self, row: Value) -> Self {
        self.repos.push(row);
        self
    }

    pub fn repo_label(mut self, repo_id: &str, key: &str, value: &str) -> Self {
        self.repo_labels.push(json!({
            "RepoLabelId": format!("repol-{repo_id}"),
            "RepoId": repo_id,
            "LabelKey": key,
            "LabelValue": value,
        }));
        self
    }

    /// Writes the tables, the `att-PKG1` chart and the `att-ICON` image.
    pub fn write(&self, dir: &Path) {
        let tables = [
            ("apps.json", &self.apps),
            ("app_versions.json", &self.app_versions),
            ("categories.json", &self.categories),
            ("category_resources.json", &self.category_resources),
            ("clusters.json", &self.clusters),
            ("repos.json", &self.repos),
            ("repo_labels.json", &self.repo_labels),
        ];
        for (file, rows) in tables {
            fs::write(dir.join(file), serde_json::to_vec(rows).unwrap()).unwrap();
        }

        write_chart(&dir.join("att-PKG1"), "nginx", "1.0.0", "1.25");
        let icon = dir.join("att-ICON");
        fs::create_dir_all(&icon).unwrap();
        fs::write(icon.join("raw"), b"\x89PNG").unwrap();
    }
}

pub fn write_chart(dir: &Path, name: &str, version: &str, app_version: &str) {
    fs::create_dir_all(dir.join("templates")).unwrap();
    fs::write(
        dir.join("Chart.yaml"),
        format!("apiVersion: v2\nname: {name}\nversion: {version}\nappVersion: \"{app_version}\"\n"),
    )
    .unwrap();
    fs::write(dir.join("values.yaml"), "replicas: 1\n").unwrap();
    fs::write(dir.join("templates").join("deployment.yaml"), "kind: Deployment\n").unwrap();
}

pub fn namespace(name: &str, workspace: &str) -> Namespace {
    let mut namespace = Namespace {
        metadata: ObjectMeta::named(name),
    };
    namespace
        .metadata
        .labels
        .insert(WORKSPACE_LABEL_KEY.to_string(), workspace.to_string());
    namespace
}

/// Store that fails the first `conflicts` status writes of each resource
/// with a version conflict and counts every fetch and write.
pub struct ConflictingStore {
    inner: SqliteStore,
    conflicts: usize,
    injected: AtomicUsize,
    pub fetches: AtomicUsize,
    pub writes: AtomicUsize,
}

impl ConflictingStore {
    pub fn new(inner: SqliteStore, conflicts: usize) -> Self {
        Self {
            inner,
            conflicts,
            injected: AtomicUsize::new(0),
            fetches: AtomicUsize::new(0),
            writes: AtomicUsize::new(0),
        }
    }

    pub fn inner(&self) -> &SqliteStore {
        &self.inner
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn write<R>(&self, name: &str, write: impl FnOnce() -> Result<R>) -> Result<R> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        if self.injected.load(Ordering::SeqCst) < self.conflicts {
            self.injected.fetch_add(1, Ordering::SeqCst);
            return Err(Error::Conflict(name.to_string()));
        }
        write()
    }
}

impl NamespaceApi for ConflictingStore {
    fn get_namespace(&self, ctx: &CallContext, name: &str) -> Result<Namespace> {
        self.inner.get_namespace(ctx, name)
    }
}

impl ResourceStore for ConflictingStore {
    fn create_category(&self, ctx: &CallContext, category: &Category) -> Result<Category> {
        self.inner.create_category(ctx, category)
    }

    fn get_category(&self, ctx: &CallContext, name: &str) -> Result<Category> {
        self.inner.get_category(ctx, name)
    }

    fn list_categories(
        &self,
        ctx: &CallContext,
        selector: &LabelSelector,
    ) -> Result<Vec<Category>> {
        self.inner.list_categories(ctx, selector)
    }

    fn create_repository(&self, ctx: &CallContext, repo: &Repository) -> Result<Repository> {
        self.inner.create_repository(ctx, repo)
    }

    fn get_repository(&self, ctx: &CallContext, name: &str) -> Result<Repository> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.inner.get_repository(ctx, name)
    }

    fn list_repositories(
        &self,
        ctx: &CallContext,
        selector: &LabelSelector,
    ) -> Result<Vec<Repository>> {
        self.inner.list_repositories(ctx, selector)
    }

    fn update_repository_status(
        &self,
        ctx: &CallContext,
        repo: &Repository,
    ) -> Result<Repository> {
        self.write(repo.name(), || self.inner.update_repository_status(ctx, repo))
    }

    fn create_application(&self, ctx: &CallContext, app: &Application) -> Result<Application> {
        self.inner.create_application(ctx, app)
    }

    fn get_application(&self, ctx: &CallContext, name: &str) -> Result<Application> {
        self.inner.get_application(ctx, name)
    }

    fn list_applications(
        &self,
        ctx: &CallContext,
        selector: &LabelSelector,
    ) -> Result<Vec<Application>> {
        self.inner.list_applications(ctx, selector)
    }

    fn create_application_version(
        &self,
        ctx: &CallContext,
        version: &ApplicationVersion,
    ) -> Result<ApplicationVersion> {
        self.inner.create_application_version(ctx, version)
    }

    fn get_application_version(
        &self,
        ctx: &CallContext,
        name: &str,
    ) -> Result<ApplicationVersion> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.inner.get_application_version(ctx, name)
    }

    fn list_application_versions(
        &self,
        ctx: &CallContext,
        selector: &LabelSelector,
    ) -> Result<Vec<ApplicationVersion>> {
        self.inner.list_application_versions(ctx, selector)
    }

    fn update_application_version_status(
        &self,
        ctx: &CallContext,
        version: &ApplicationVersion,
    ) -> Result<ApplicationVersion> {
        self.write(version.name(), || {
            self.inner.update_application_version_status(ctx, version)
        })
    }

    fn create_release(&self, ctx: &CallContext, release: &Release) -> Result<Release> {
        self.inner.create_release(ctx, release)
    }

    fn get_release(&self, ctx: &CallContext, name: &str) -> Result<Release> {
        self.inner.get_release(ctx, name)
    }

    fn list_releases(&self, ctx: &CallContext, selector: &LabelSelector) -> Result<Vec<Release>> {
        self.inner.list_releases(ctx, selector)
    }

    fn get_cluster(&self, ctx: &CallContext, name: &str) -> Result<Cluster> {
        self.inner.get_cluster(ctx, name)
    }

    fn connect_cluster(
        &self,
        ctx: &CallContext,
        cluster: &Cluster,
    ) -> Result<Box<dyn NamespaceApi>> {
        self.inner.connect_cluster(ctx, cluster)
    }
}
