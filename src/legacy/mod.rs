//! The legacy application store: dump rows, the dump loader and the
//! relationships rebuilt from them.

pub mod models;
mod relations;
mod snapshot;

pub use models::{App, AppVersion, Category, CategoryResource, Cluster, Repo, RepoLabel};
pub use relations::Relations;
pub use snapshot::{
    APP_VERSIONS_FILE, APPS_FILE, CATEGORIES_FILE, CATEGORY_RESOURCES_FILE, CLUSTERS_FILE,
    REPO_LABELS_FILE, REPOS_FILE, Snapshot,
};

/// Prefix of attachment ids in the legacy object store.
pub const ATTACHMENT_PREFIX: &str = "att-";

const LEGACY_CREATOR: &str = "system";
const NEW_CREATOR: &str = "admin";

/// Maps the legacy system user onto the new admin user.
#[must_use]
pub fn convert_creator(owner: &str) -> &str {
    if owner == LEGACY_CREATOR {
        NEW_CREATOR
    } else {
        owner
    }
}
