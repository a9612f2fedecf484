//! Object storage for packaged charts and media attachments.

mod fs;
mod s3;

pub use fs::FsBlobStore;
pub use s3::{S3BlobStore, S3Options};

use std::io::Read;

use crate::context::CallContext;
use crate::error::{Error, Result};

pub trait BlobStore: Send + Sync {
    /// Stores `content` under `key`. `object_id` names the object for
    /// downloads and is otherwise informational.
    fn upload(
        &self,
        ctx: &CallContext,
        key: &str,
        object_id: &str,
        content: &mut dyn Read,
    ) -> Result<()>;

    fn get(&self, ctx: &CallContext, key: &str) -> Result<Vec<u8>>;
}

/// Object keys are relative slash separated paths without `.` or `..`
/// segments.
pub fn validate_key(key: &str) -> Result<()> {
    let valid = !key.is_empty()
        && !key.starts_with('/')
        && key
            .split('/')
            .all(|segment| !segment.is_empty() && segment != "." && segment != "..");
    if valid {
        Ok(())
    } else {
        Err(Error::Config(format!("invalid object key {key:?}")))
    }
}

/// Key under which a chart package is stored: the workspace when there is
/// one, then the version id.
#[must_use]
pub fn package_key(workspace: &str, version_id: &str) -> String {
    if workspace.is_empty() {
        version_id.to_string()
    } else {
        format!("{workspace}/{version_id}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_key() {
        assert!(validate_key("att-abc").is_ok());
        assert!(validate_key("ws-1/appv-abc").is_ok());
        assert!(validate_key("").is_err());
        assert!(validate_key("/etc/passwd").is_err());
        assert!(validate_key("a/../b").is_err());
        assert!(validate_key("a//b").is_err());
    }

    #[test]
    fn test_package_key() {
        assert_eq!(package_key("", "appv-1"), "appv-1");
        assert_eq!(package_key("ws", "appv-1"), "ws/appv-1");
    }
}
