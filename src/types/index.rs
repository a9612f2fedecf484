use std::collections::BTreeMap;
use std::io::{Read, Write};

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE;
use chrono::{DateTime, Utc};
use flate2::Compression;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use serde::{Deserialize, Serialize};

use crate::error::Result;

pub const INDEX_API_VERSION: &str = "v1";

/// Snapshot of a repository's applications and chart versions, stored in the
/// repository status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedIndex {
    #[serde(rename = "apiVersion")]
    pub api_version: String,
    pub generated: DateTime<Utc>,
    /// Keyed by application name.
    #[serde(rename = "apps")]
    pub applications: BTreeMap<String, IndexApplication>,
    #[serde(rename = "publicKeys", default, skip_serializing_if = "Vec::is_empty")]
    pub public_keys: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndexApplication {
    pub name: String,
    #[serde(rename = "appId")]
    pub application_id: String,
    #[serde(rename = "desc")]
    pub description: String,
    pub status: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub icon: String,
    pub charts: Vec<IndexChartVersion>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndexChartVersion {
    #[serde(rename = "verId")]
    pub application_version_id: String,
    pub name: String,
    pub version: String,
    #[serde(rename = "appVersion", default, skip_serializing_if = "String::is_empty")]
    pub app_version: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub icon: String,
    #[serde(default)]
    pub urls: Vec<String>,
}

impl SavedIndex {
    #[must_use]
    pub fn new(generated: DateTime<Utc>) -> Self {
        Self {
            api_version: INDEX_API_VERSION.to_string(),
            generated,
            applications: BTreeMap::new(),
            public_keys: Vec::new(),
            annotations: BTreeMap::new(),
        }
    }

    /// JSON, zlib compressed, base64 URL-safe encoded.
    pub fn encode(&self) -> Result<String> {
        let json = serde_json::to_vec(self)?;
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&json)?;
        let compressed = encoder.finish()?;
        Ok(URL_SAFE.encode(compressed))
    }

    pub fn decode(data: &str) -> Result<Self> {
        let compressed = URL_SAFE
            .decode(data.as_bytes())
            .map_err(|e| crate::error::Error::Chart(format!("invalid index encoding: {e}")))?;
        let mut json = Vec::new();
        ZlibDecoder::new(compressed.as_slice()).read_to_end(&mut json)?;
        Ok(serde_json::from_slice(&json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encoded_index_is_url_safe_and_decodes() {
        let mut index = SavedIndex::new(Utc::now());
        index.applications.insert(
            "nginx".to_string(),
            IndexApplication {
                name: "nginx".to_string(),
                application_id: "app-abc".to_string(),
                charts: vec![IndexChartVersion {
                    application_version_id: "appv-1".to_string(),
                    name: "nginx".to_string(),
                    version: "1.0.0".to_string(),
                    urls: vec!["repo/nginx-1.0.0.tgz".to_string()],
                    ..Default::default()
                }],
                ..Default::default()
            },
        );

        let encoded = index.encode().unwrap();
        assert!(!encoded.contains('+'));
        assert!(!encoded.contains('/'));

        let decoded = SavedIndex::decode(&encoded).unwrap();
        assert_eq!(decoded, index);
    }

    #[test]
    fn test_index_wire_field_names() {
        let index = SavedIndex::new(Utc::now());
        let json = serde_json::to_value(&index).unwrap();
        assert_eq!(json["apiVersion"], "v1");
        assert!(json["apps"].is_object());
        assert!(json.get("publicKeys").is_none());
    }
}
