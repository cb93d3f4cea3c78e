//! Upload-directory file collaborator.
//!
//! Stores raw document blobs under `AppPaths::uploads_dir` and exposes the
//! small interface the embedding and chat pipelines consume: list, store,
//! read, delete, exists.

use std::fs;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::AppPaths;
use crate::errors::ApiError;

#[derive(Debug, Clone, Serialize)]
pub struct FileInfo {
    pub name: String,
    pub size: u64,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(rename = "createdAt")]
    pub created_at: String,
    #[serde(rename = "updatedAt")]
    pub updated_at: String,
}

#[derive(Debug, Clone)]
pub struct FileStore {
    uploads_dir: PathBuf,
}

impl FileStore {
    pub fn new(paths: &AppPaths) -> Self {
        let _ = fs::create_dir_all(&paths.uploads_dir);
        FileStore {
            uploads_dir: paths.uploads_dir.clone(),
        }
    }

    pub fn list(&self) -> Result<Vec<FileInfo>, ApiError> {
        let entries = fs::read_dir(&self.uploads_dir).map_err(ApiError::internal)?;

        let mut files = Vec::new();
        for entry in entries {
            let entry = entry.map_err(ApiError::internal)?;
            let metadata = entry.metadata().map_err(ApiError::internal)?;
            if !metadata.is_file() {
                continue;
            }

            let name = entry.file_name().to_string_lossy().to_string();
            let kind = name.rsplit_once('.').map(|(_, ext)| ext).unwrap_or("");
            let created_at = metadata
                .created()
                .map(|t| DateTime::<Utc>::from(t).to_rfc3339())
                .unwrap_or_default();
            let updated_at = metadata
                .modified()
                .map(|t| DateTime::<Utc>::from(t).to_rfc3339())
                .unwrap_or_default();

            files.push(FileInfo {
                kind: kind.to_string(),
                name,
                size: metadata.len(),
                created_at,
                updated_at,
            });
        }

        files.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(files)
    }

    pub fn store(&self, name: &str, bytes: &[u8]) -> Result<(), ApiError> {
        let path = self.resolve(name)?;
        fs::write(path, bytes).map_err(ApiError::internal)
    }

    pub fn read(&self, name: &str) -> Result<Vec<u8>, ApiError> {
        let path = self.resolve(name)?;
        if !path.is_file() {
            return Err(ApiError::NotFound("File not found".to_string()));
        }
        fs::read(path).map_err(ApiError::internal)
    }

    pub fn delete(&self, name: &str) -> Result<bool, ApiError> {
        let path = self.resolve(name)?;
        if !path.is_file() {
            return Ok(false);
        }
        fs::remove_file(path).map_err(ApiError::internal)?;
        Ok(true)
    }

    pub fn exists(&self, name: &str) -> bool {
        self.resolve(name).map(|path| path.is_file()).unwrap_or(false)
    }

    // Uploaded names must stay inside the uploads directory.
    fn resolve(&self, name: &str) -> Result<PathBuf, ApiError> {
        if name.is_empty()
            || name.contains('/')
            || name.contains('\\')
            || name.contains("..")
            || name.contains('\0')
        {
            return Err(ApiError::BadRequest(format!("Invalid filename: {name}")));
        }
        Ok(self.uploads_dir.join(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_store() -> (tempfile::TempDir, FileStore) {
        let tmp = tempfile::tempdir().unwrap();
        let paths = AppPaths::from_data_dir(tmp.path().to_path_buf());
        let store = FileStore::new(&paths);
        (tmp, store)
    }

    #[test]
    fn store_read_delete_roundtrip() {
        let (_tmp, store) = test_store();

        assert!(!store.exists("notes.txt"));
        store.store("notes.txt", b"the cat sat").unwrap();
        assert!(store.exists("notes.txt"));
        assert_eq!(store.read("notes.txt").unwrap(), b"the cat sat");

        let files = store.list().unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].name, "notes.txt");
        assert_eq!(files[0].kind, "txt");
        assert_eq!(files[0].size, 11);

        assert!(store.delete("notes.txt").unwrap());
        assert!(!store.delete("notes.txt").unwrap());
        assert!(!store.exists("notes.txt"));
    }

    #[test]
    fn path_traversal_is_rejected() {
        let (_tmp, store) = test_store();

        assert!(matches!(
            store.read("../outside.txt"),
            Err(ApiError::BadRequest(_))
        ));
        assert!(matches!(store.store("a/b.txt", b""), Err(ApiError::BadRequest(_))));
        assert!(!store.exists(""));
    }

    #[test]
    fn missing_file_is_not_found() {
        let (_tmp, store) = test_store();
        assert!(matches!(store.read("ghost.txt"), Err(ApiError::NotFound(_))));
    }
}
