//! The resource store the migration writes into.
//!
//! Names passed to `get_*` are resource names (lower-cased legacy ids). Missing
//! resources are reported as [`Error::NotFound`](crate::error::Error::NotFound),
//! duplicate creates as `AlreadyExists` and stale status writes as `Conflict`.

mod kubernetes;
mod schema;
mod sqlite;

pub use kubernetes::KubeClient;
pub use sqlite::SqliteStore;

use crate::context::CallContext;
use crate::error::Result;
use crate::types::*;

/// Namespace lookups, the only thing needed from a member cluster.
pub trait NamespaceApi: Send + Sync {
    fn get_namespace(&self, ctx: &CallContext, name: &str) -> Result<Namespace>;
}

/// CRUD and status writes for every resource kind the migration produces.
pub trait ResourceStore: NamespaceApi {
    // Category operations
    fn create_category(&self, ctx: &CallContext, category: &Category) -> Result<Category>;
    fn get_category(&self, ctx: &CallContext, name: &str) -> Result<Category>;
    fn list_categories(&self, ctx: &CallContext, selector: &LabelSelector)
    -> Result<Vec<Category>>;

    // Repository operations
    fn create_repository(&self, ctx: &CallContext, repo: &Repository) -> Result<Repository>;
    fn get_repository(&self, ctx: &CallContext, name: &str) -> Result<Repository>;
    fn list_repositories(
        &self,
        ctx: &CallContext,
        selector: &LabelSelector,
    ) -> Result<Vec<Repository>>;
    fn update_repository_status(&self, ctx: &CallContext, repo: &Repository)
    -> Result<Repository>;

    // Application operations
    fn create_application(&self, ctx: &CallContext, app: &Application) -> Result<Application>;
    fn get_application(&self, ctx: &CallContext, name: &str) -> Result<Application>;
    fn list_applications(
        &self,
        ctx: &CallContext,
        selector: &LabelSelector,
    ) -> Result<Vec<Application>>;

    // Application version operations
    fn create_application_version(
        &self,
        ctx: &CallContext,
        version: &ApplicationVersion,
    ) -> Result<ApplicationVersion>;
    fn get_application_version(&self, ctx: &CallContext, name: &str)
    -> Result<ApplicationVersion>;
    fn list_application_versions(
        &self,
        ctx: &CallContext,
        selector: &LabelSelector,
    ) -> Result<Vec<ApplicationVersion>>;
    fn update_application_version_status(
        &self,
        ctx: &CallContext,
        version: &ApplicationVersion,
    ) -> Result<ApplicationVersion>;

    // Release operations
    fn create_release(&self, ctx: &CallContext, release: &Release) -> Result<Release>;
    fn get_release(&self, ctx: &CallContext, name: &str) -> Result<Release>;
    fn list_releases(&self, ctx: &CallContext, selector: &LabelSelector) -> Result<Vec<Release>>;

    // Member clusters
    fn get_cluster(&self, ctx: &CallContext, name: &str) -> Result<Cluster>;
    /// Builds a client for the member cluster's own namespace API.
    fn connect_cluster(&self, ctx: &CallContext, cluster: &Cluster)
    -> Result<Box<dyn NamespaceApi>>;
}

/// Stamps the owner reference that makes `owner` cascade-delete its children.
#[must_use]
pub fn owner_reference<R: Resource>(owner: &R) -> OwnerReference {
    OwnerReference {
        api_version: R::API_VERSION.to_string(),
        kind: R::KIND.to_string(),
        name: owner.name().to_string(),
        uid: owner.metadata().uid.clone(),
    }
}
