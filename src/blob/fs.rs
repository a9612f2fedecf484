use std::fs::{self, File};
use std::io::{self, ErrorKind, Read};
use std::path::{Path, PathBuf};

use uuid::Uuid;

use super::{BlobStore, validate_key};
use crate::context::CallContext;
use crate::error::{Error, Result};

/// Blob store on the local filesystem. Objects live at `<root>/<key>`.
pub struct FsBlobStore {
    base_path: PathBuf,
}

impl FsBlobStore {
    pub fn new(root: &Path) -> Self {
        Self {
            base_path: root.to_path_buf(),
        }
    }

    fn object_path(&self, key: &str) -> PathBuf {
        key.split('/')
            .fold(self.base_path.clone(), |path, segment| path.join(segment))
    }

    fn temp_path(&self) -> PathBuf {
        self.base_path
            .join(".tmp")
            .join(Uuid::new_v4().to_string())
    }

    pub fn exists(&self, key: &str) -> Result<bool> {
        validate_key(key)?;
        Ok(self.object_path(key).is_file())
    }
}

impl BlobStore for FsBlobStore {
    fn upload(
        &self,
        ctx: &CallContext,
        key: &str,
        _object_id: &str,
        content: &mut dyn Read,
    ) -> Result<()> {
        ctx.check()?;
        validate_key(key)?;

        let temp_path = self.temp_path();
        if let Some(parent) = temp_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let written = (|| -> io::Result<()> {
            let mut temp_file = File::create(&temp_path)?;
            io::copy(content, &mut temp_file)?;
            temp_file.sync_all()
        })();
        if let Err(e) = written {
            let _ = fs::remove_file(&temp_path);
            return Err(e.into());
        }

        let final_path = self.object_path(key);
        if let Some(parent) = final_path.parent() {
            fs::create_dir_all(parent)?;
        }

        fs::rename(&temp_path, &final_path)?;

        Ok(())
    }

    fn get(&self, ctx: &CallContext, key: &str) -> Result<Vec<u8>> {
        ctx.check()?;
        validate_key(key)?;
        fs::read(self.object_path(key)).map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                Error::NotFound(format!("object {key}"))
            } else {
                Error::Io(e)
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_upload_and_get() {
        let temp_dir = TempDir::new().unwrap();
        let storage = FsBlobStore::new(temp_dir.path());
        let ctx = CallContext::background();

        storage
            .upload(&ctx, "ws/appv-1", "appv-1", &mut b"chart".as_slice())
            .unwrap();

        assert!(storage.exists("ws/appv-1").unwrap());
        assert_eq!(storage.get(&ctx, "ws/appv-1").unwrap(), b"chart");
        assert!(temp_dir.path().join("ws").join("appv-1").is_file());
    }

    #[test]
    fn test_upload_replaces() {
        let temp_dir = TempDir::new().unwrap();
        let storage = FsBlobStore::new(temp_dir.path());
        let ctx = CallContext::background();

        storage.upload(&ctx, "att-1", "icon", &mut b"old".as_slice()).unwrap();
        storage.upload(&ctx, "att-1", "icon", &mut b"new".as_slice()).unwrap();

        assert_eq!(storage.get(&ctx, "att-1").unwrap(), b"new");
    }

    #[test]
    fn test_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let storage = FsBlobStore::new(temp_dir.path());

        assert!(!storage.exists("att-missing").unwrap());
        assert!(matches!(
            storage.get(&CallContext::background(), "att-missing"),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_invalid_key() {
        let temp_dir = TempDir::new().unwrap();
        let storage = FsBlobStore::new(temp_dir.path());

        let result = storage.upload(
            &CallContext::background(),
            "../escape",
            "x",
            &mut b"x".as_slice(),
        );
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
