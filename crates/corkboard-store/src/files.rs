//! File store owning the shared directory's attachment files.
//!
//! Callers never construct paths under the shared directory themselves; every
//! lookup goes through [`FileStore::resolve_path`], which validates the name
//! and re-checks the joined path against the canonicalized root.

use std::path::{Path, PathBuf};

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use tokio::fs;
use tracing::{debug, info};

use crate::error::{Result, StoreError};
use crate::models::Attachment;
use crate::sanitize;

/// Characters escaped when deriving the public URL for a stored file.
/// Store names are already restricted to `[A-Za-z0-9._-]`, so this is mostly
/// defence in depth for names written by other tools into the directory.
const URL_ESCAPE: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`');

/// Public URL under which the HTTP layer serves a stored file.
pub fn public_url(filename: &str) -> String {
    format!("/shared/{}", utf8_percent_encode(filename, URL_ESCAPE))
}

/// Owns the shared directory and all attachment files inside it.
#[derive(Debug, Clone)]
pub struct FileStore {
    shared_dir: PathBuf,
}

impl FileStore {
    /// Open the store, creating the shared directory recursively if missing.
    pub async fn new(shared_dir: impl Into<PathBuf>) -> Result<Self> {
        let shared_dir = shared_dir.into();
        fs::create_dir_all(&shared_dir).await?;
        info!(path = %shared_dir.display(), "file store initialized");
        Ok(Self { shared_dir })
    }

    pub fn shared_dir(&self) -> &Path {
        &self.shared_dir
    }

    /// Persist one uploaded payload under a freshly generated store name and
    /// return its attachment record.  `size` reflects the bytes written.
    pub async fn save(&self, data: &[u8], display_name: &str, mimetype: &str) -> Result<Attachment> {
        // The directory may have been removed since startup.
        fs::create_dir_all(&self.shared_dir).await?;

        let filename = sanitize::storable_name(display_name);
        let path = self.shared_dir.join(&filename);
        fs::write(&path, data).await?;

        debug!(filename = %filename, size = data.len(), "saved shared file");

        Ok(Attachment {
            original_name: display_name.to_string(),
            filename: filename.clone(),
            size: data.len() as u64,
            mimetype: mimetype.to_string(),
            url: public_url(&filename),
        })
    }

    /// Resolve a candidate name to an absolute path inside the shared
    /// directory.
    ///
    /// After the string-level checks in [`sanitize::validate_name`], the
    /// joined path is canonicalized and compared against the canonicalized
    /// root, which defeats symlink tricks a pure string check would miss.
    pub fn resolve_path(&self, name: &str) -> Result<PathBuf> {
        sanitize::validate_name(name)?;

        let root = self
            .shared_dir
            .canonicalize()
            .unwrap_or_else(|_| self.shared_dir.clone());
        let candidate = root.join(name);
        // The target may not exist yet; in that case the joined path is
        // already rooted under `root` because the name has no separators.
        let resolved = candidate.canonicalize().unwrap_or_else(|_| candidate.clone());
        if !resolved.starts_with(&root) {
            return Err(StoreError::InvalidFilename(name.to_string()));
        }
        Ok(candidate)
    }

    /// List the names of all directory entries, ledger file included; the
    /// facade is responsible for filtering the reserved ledger name out.
    pub async fn list(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        let mut entries = match fs::read_dir(&self.shared_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(names),
            Err(e) => return Err(e.into()),
        };
        while let Some(entry) = entries.next_entry().await? {
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    /// Best-effort removal.  Returns `false` when the target is already
    /// absent; any other filesystem error surfaces.
    pub async fn delete(&self, name: &str) -> Result<bool> {
        let path = self.resolve_path(name)?;
        match fs::remove_file(&path).await {
            Ok(()) => {
                debug!(filename = %name, "deleted shared file");
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn test_store() -> (FileStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path().join("shared")).await.unwrap();
        (store, dir)
    }

    #[tokio::test]
    async fn save_writes_bytes_and_reports_size() {
        let (store, _dir) = test_store().await;

        let att = store.save(b"hello", "greeting.txt", "text/plain").await.unwrap();
        assert_eq!(att.size, 5);
        assert_eq!(att.original_name, "greeting.txt");
        assert_eq!(att.mimetype, "text/plain");
        assert_eq!(att.url, format!("/shared/{}", att.filename));

        let path = store.resolve_path(&att.filename).unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"hello");
    }

    #[tokio::test]
    async fn resolve_path_rejects_traversal() {
        let (store, _dir) = test_store().await;

        for bad in ["../../etc/passwd", "..\\x", ".hidden"] {
            assert!(
                matches!(store.resolve_path(bad), Err(StoreError::InvalidFilename(_))),
                "expected rejection for {:?}",
                bad
            );
        }
        assert!(store.resolve_path(&"a".repeat(256)).is_err());
    }

    #[tokio::test]
    async fn resolve_path_stays_inside_shared_dir() {
        let (store, _dir) = test_store().await;
        store.save(b"x", "notes.txt", "text/plain").await.unwrap();

        let path = store.resolve_path("notes.txt").unwrap();
        let root = store.shared_dir().canonicalize().unwrap();
        assert!(path.starts_with(&root));
    }

    #[tokio::test]
    async fn delete_is_best_effort() {
        let (store, _dir) = test_store().await;
        let att = store.save(b"bye", "bye.txt", "text/plain").await.unwrap();

        assert!(store.delete(&att.filename).await.unwrap());
        // Second delete: already gone, not an error.
        assert!(!store.delete(&att.filename).await.unwrap());
    }

    #[tokio::test]
    async fn list_returns_stored_names() {
        let (store, _dir) = test_store().await;
        let a = store.save(b"1", "a.txt", "text/plain").await.unwrap();
        let b = store.save(b"2", "b.txt", "text/plain").await.unwrap();

        let names = store.list().await.unwrap();
        assert_eq!(names.len(), 2);
        assert!(names.contains(&a.filename));
        assert!(names.contains(&b.filename));
    }

    #[test]
    fn public_url_escapes_awkward_characters() {
        assert_eq!(public_url("plain.txt"), "/shared/plain.txt");
        assert_eq!(public_url("has space.txt"), "/shared/has%20space.txt");
        assert_eq!(public_url("100%.txt"), "/shared/100%25.txt");
    }
}
