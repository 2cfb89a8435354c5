//! Storage for uploaded manuscript documents
//!
//! The journal only keeps the locator a blob store hands back. Locators are
//! paths relative to nothing in particular; only the issuing store can read
//! them.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Utc;
use uuid::Uuid;

use crate::error::{JournalError, Result, StorageError};

/// Storage boundary for uploaded files
pub trait BlobStore: Send + Sync {
    /// Store the bytes and return a stable locator
    fn put(&self, original_name: &str, bytes: &[u8]) -> Result<String>;

    /// Read back the bytes behind a locator
    fn get(&self, locator: &str) -> Result<Vec<u8>>;

    /// Remove a stored blob
    fn remove(&self, locator: &str) -> Result<()>;
}

/// Blob store writing into one directory on the local filesystem
///
/// Files are named `<unix-millis>-<uuid>-<original name>` and never
/// overwrite an existing file.
#[derive(Debug, Clone)]
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    /// Use `root` as the upload directory, creating it if missing
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root).map_err(StorageError::from)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a locator to a path, refusing anything outside the root
    fn resolve(&self, locator: &str) -> Result<PathBuf> {
        let path = Path::new(locator);
        let inside_root = path
            .parent()
            .map_or(true, |p| p == self.root || p.as_os_str().is_empty());
        let name = path
            .file_name()
            .filter(|_| inside_root)
            .ok_or_else(|| JournalError::NotFound(format!("File {}", locator)))?;
        Ok(self.root.join(name))
    }
}

/// Strip directory components and anything unusual from a client file name
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "manuscript".to_string()
    } else {
        cleaned.to_string()
    }
}

impl BlobStore for FsBlobStore {
    fn put(&self, original_name: &str, bytes: &[u8]) -> Result<String> {
        let file_name = format!(
            "{}-{}-{}",
            Utc::now().timestamp_millis(),
            Uuid::new_v4().simple(),
            sanitize_file_name(original_name)
        );
        let path = self.root.join(&file_name);

        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(StorageError::from)?;
        if let Err(e) = file.write_all(bytes).and_then(|()| file.sync_all()) {
            drop(file);
            let _ = std::fs::remove_file(&path);
            return Err(StorageError::from(e).into());
        }
        tracing::debug!(path = %path.display(), size = bytes.len(), "Stored upload");
        Ok(path.to_string_lossy().into_owned())
    }

    fn get(&self, locator: &str) -> Result<Vec<u8>> {
        let path = self.resolve(locator)?;
        match std::fs::read(&path) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(JournalError::NotFound(format!("File {}", locator)))
            }
            Err(e) => Err(StorageError::from(e).into()),
        }
    }

    fn remove(&self, locator: &str) -> Result<()> {
        let path = self.resolve(locator)?;
        std::fs::remove_file(path).map_err(StorageError::from)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_get_remove() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::new(dir.path().join("uploads")).unwrap();

        let locator = store.put("paper.pdf", b"%PDF-1.7").unwrap();
        assert!(locator.ends_with("-paper.pdf"));
        assert_eq!(store.get(&locator).unwrap(), b"%PDF-1.7");

        store.remove(&locator).unwrap();
        assert!(matches!(store.get(&locator), Err(JournalError::NotFound(_))));
    }

    #[test]
    fn test_same_name_never_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::new(dir.path()).unwrap();

        let first = store.put("paper.pdf", b"FIRST").unwrap();
        let mut seen = vec![first.clone()];
        for _ in 0..50 {
            let next = store.put("paper.pdf", b"SECOND").unwrap();
            assert!(!seen.contains(&next));
            seen.push(next);
        }

        assert_eq!(store.get(&first).unwrap(), b"FIRST");
        store.remove(&seen[1]).unwrap();
        assert_eq!(store.get(&first).unwrap(), b"FIRST");
    }

    #[test]
    fn test_locator_outside_root_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::new(dir.path()).unwrap();
        assert!(matches!(
            store.get("/etc/passwd"),
            Err(JournalError::NotFound(_))
        ));
    }

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("C:\\docs\\my paper.pdf"), "my_paper.pdf");
        assert_eq!(sanitize_file_name(".hidden"), "hidden");
        assert_eq!(sanitize_file_name(""), "manuscript");
    }
}
