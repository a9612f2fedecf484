pub const APPLICATION_API_VERSION: &str = "application.kubesphere.io/v1alpha1";
pub const CLUSTER_API_VERSION: &str = "cluster.kubesphere.io/v1alpha1";

pub const WORKSPACE_LABEL_KEY: &str = "kubesphere.io/workspace";
pub const NAMESPACE_LABEL_KEY: &str = "kubesphere.io/namespace";
pub const CLUSTER_NAME_LABEL_KEY: &str = "kubesphere.io/cluster";
pub const REPO_ID_LABEL_KEY: &str = "application.kubesphere.io/repo-id";
pub const APP_ID_LABEL_KEY: &str = "application.kubesphere.io/app-id";
pub const APP_VERSION_ID_LABEL_KEY: &str = "application.kubesphere.io/app-version-id";
pub const CATEGORY_ID_LABEL_KEY: &str = "application.kubesphere.io/app-category-id";
pub const BUILTIN_LABEL_KEY: &str = "application.kubesphere.io/builtin-app";
pub const HOST_CLUSTER_LABEL_KEY: &str = "cluster-role.kubesphere.io/host";

pub const CREATOR_ANNOTATION_KEY: &str = "kubesphere.io/creator";

pub const ATTACHMENT_ID_PREFIX: &str = "att-";
pub const APPLICATION_ID_PREFIX: &str = "app-";
pub const APPLICATION_VERSION_ID_PREFIX: &str = "appv-";

pub const STATE_ACTIVE: &str = "active";
pub const REPO_STATE_SUCCESSFUL: &str = "successful";

/// Upper bound on the repository sync history.
pub const REPO_SYNC_STATE_LEN: usize = 10;
