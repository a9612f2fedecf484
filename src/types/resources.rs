use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::constants::*;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ObjectMeta {
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub uid: String,
    /// Optimistic concurrency token, opaque to clients.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub resource_version: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub owner_references: Vec<OwnerReference>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creation_timestamp: Option<DateTime<Utc>>,
}

impl ObjectMeta {
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn label(&self, key: &str) -> Option<&str> {
        self.labels.get(key).map(String::as_str)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OwnerReference {
    pub api_version: String,
    pub kind: String,
    pub name: String,
    pub uid: String,
}

/// A named object in the resource store.
pub trait Resource: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    const API_VERSION: &'static str;
    const KIND: &'static str;
    /// Path segment of the collection in the REST API.
    const PLURAL: &'static str;

    fn metadata(&self) -> &ObjectMeta;
    fn metadata_mut(&mut self) -> &mut ObjectMeta;

    fn name(&self) -> &str {
        &self.metadata().name
    }
}

macro_rules! impl_resource {
    ($ty:ty, $api:expr, $kind:literal, $plural:literal) => {
        impl Resource for $ty {
            const API_VERSION: &'static str = $api;
            const KIND: &'static str = $kind;
            const PLURAL: &'static str = $plural;

            fn metadata(&self) -> &ObjectMeta {
                &self.metadata
            }

            fn metadata_mut(&mut self) -> &mut ObjectMeta {
                &mut self.metadata
            }
        }
    };
}

// Category

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Category {
    pub metadata: ObjectMeta,
    pub spec: CategorySpec,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CategorySpec {
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub locale: String,
}

impl_resource!(Category, APPLICATION_API_VERSION, "HelmCategory", "helmcategories");

// Repository

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Repository {
    pub metadata: ObjectMeta,
    pub spec: RepositorySpec,
    pub status: RepositoryStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepositorySpec {
    pub name: String,
    pub url: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    pub credential: RepoCredential,
    pub version: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RepoCredential {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub username: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub password: String,
    #[serde(flatten)]
    pub s3_config: S3Config,
}

impl RepoCredential {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct S3Config {
    #[serde(rename = "accessKeyID", skip_serializing_if = "String::is_empty")]
    pub access_key_id: String,
    #[serde(rename = "secretAccessKey", skip_serializing_if = "String::is_empty")]
    pub secret_access_key: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RepositoryStatus {
    /// Encoded [`SavedIndex`](super::SavedIndex) of the repository contents.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub data: String,
    pub version: i64,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub state: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_update_time: Option<DateTime<Utc>>,
    /// Newest first, at most [`REPO_SYNC_STATE_LEN`] entries.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sync_state: Vec<RepoSyncState>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RepoSyncState {
    pub state: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sync_time: Option<DateTime<Utc>>,
}

impl RepositoryStatus {
    /// Prepends a sync record, dropping the oldest ones past the cap.
    pub fn push_sync_state(&mut self, entry: RepoSyncState) {
        self.sync_state.insert(0, entry);
        self.sync_state.truncate(REPO_SYNC_STATE_LEN);
    }
}

impl_resource!(Repository, APPLICATION_API_VERSION, "HelmRepo", "helmrepos");

// Application

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Application {
    pub metadata: ObjectMeta,
    pub spec: ApplicationSpec,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ApplicationSpec {
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub abstraction: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub icon: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub app_home: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<String>,
}

impl Application {
    /// Workspace label, empty for built-in apps.
    #[must_use]
    pub fn workspace(&self) -> &str {
        self.metadata.label(WORKSPACE_LABEL_KEY).unwrap_or_default()
    }

    /// The chart name the application was created from.
    #[must_use]
    pub fn true_name(&self) -> &str {
        &self.spec.name
    }
}

impl_resource!(
    Application,
    APPLICATION_API_VERSION,
    "HelmApplication",
    "helmapplications"
);

// ApplicationVersion

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicationVersion {
    pub metadata: ObjectMeta,
    pub spec: ApplicationVersionSpec,
    pub status: ApplicationVersionStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicationVersionSpec {
    #[serde(flatten)]
    pub metadata: VersionMetadata,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub urls: Vec<String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub digest: String,
    /// Key of the packaged chart in the blob store.
    #[serde(rename = "data_key", skip_serializing_if = "String::is_empty")]
    pub data_key: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VersionMetadata {
    pub name: String,
    pub version: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub app_version: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub icon: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub home: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicationVersionStatus {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub state: String,
    /// State transitions, newest first.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub audit: Vec<Audit>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Audit {
    pub state: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub message: String,
    pub time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub operator: String,
}

impl ApplicationVersionStatus {
    /// Moves to `state`, recording the transition. Returns false when the
    /// status is already there.
    pub fn transition(&mut self, state: &str, operator: &str, time: DateTime<Utc>) -> bool {
        if self.state == state {
            return false;
        }
        self.state = state.to_string();
        self.audit.insert(
            0,
            Audit {
                state: state.to_string(),
                message: String::new(),
                time: Some(time),
                operator: operator.to_string(),
            },
        );
        true
    }
}

impl ApplicationVersion {
    #[must_use]
    pub fn chart_version(&self) -> &str {
        &self.spec.metadata.version
    }
}

impl_resource!(
    ApplicationVersion,
    APPLICATION_API_VERSION,
    "HelmApplicationVersion",
    "helmapplicationversions"
);

// Release

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Release {
    pub metadata: ObjectMeta,
    pub spec: ReleaseSpec,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReleaseSpec {
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
    pub chart_name: String,
    pub chart_version: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub chart_app_version: String,
    pub application_id: String,
    pub application_version_id: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub repo_id: String,
    pub version: i64,
    /// Values document (YAML). Travels as base64 bytes on the wire.
    #[serde(with = "base64_text", skip_serializing_if = "String::is_empty")]
    pub values: String,
}

impl_resource!(Release, APPLICATION_API_VERSION, "HelmRelease", "helmreleases");

// Namespace

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Namespace {
    pub metadata: ObjectMeta,
}

impl Namespace {
    #[must_use]
    pub fn workspace(&self) -> &str {
        self.metadata.label(WORKSPACE_LABEL_KEY).unwrap_or_default()
    }
}

impl_resource!(Namespace, "v1", "Namespace", "namespaces");

// Cluster

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Cluster {
    pub metadata: ObjectMeta,
    pub spec: ClusterSpec,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterSpec {
    pub connection: Connection,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Connection {
    #[serde(rename = "type", skip_serializing_if = "String::is_empty")]
    pub kind: String,
    /// Kubeconfig document for reaching the member cluster.
    #[serde(rename = "kubeconfig", with = "base64_text", skip_serializing_if = "String::is_empty")]
    pub kube_config: String,
}

impl Cluster {
    #[must_use]
    pub fn is_host(&self) -> bool {
        self.metadata.labels.contains_key(HOST_CLUSTER_LABEL_KEY)
    }
}

impl_resource!(Cluster, CLUSTER_API_VERSION, "Cluster", "clusters");

/// Byte fields are base64 strings on the Kubernetes wire.
mod base64_text {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &str, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(value.as_bytes()))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
        let encoded = Option::<String>::deserialize(deserializer)?.unwrap_or_default();
        let bytes = STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)?;
        String::from_utf8(bytes).map_err(serde::de::Error::custom)
    }
}
