//! Flat on-disk store for uploaded files.
//!
//! Every stored file lives directly under the root directory; the directory
//! listing is the only index:
//! ```text
//! {root}/
//! ├── 3f2a9c0d5e6b47a8b1c2d3e4f5a6b7c8.png
//! └── 9e8d7c6b5a4f43e2d1c0b9a8f7e6d5c4.jpg
//! ```

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::{Result, ServiceError};

/// Directory entry as seen by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    pub name: String,
    pub size: u64,
    /// Creation time, or modification time where the filesystem lacks one.
    pub created: SystemTime,
    pub modified: SystemTime,
}

impl StoredFile {
    fn from_metadata(name: String, meta: &fs::Metadata) -> io::Result<Self> {
        let modified = meta.modified()?;
        Ok(Self {
            name,
            size: meta.len(),
            created: meta.created().unwrap_or(modified),
            modified,
        })
    }
}

/// Owns the upload directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Open a store rooted at `root`, creating the directory if needed.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a caller-supplied name to a path under the root.
    ///
    /// Only the final path component is used, so `../../etc/passwd` maps to
    /// `{root}/passwd`. Names without a usable final component yield `None`.
    pub fn path_for(&self, name: &str) -> Option<PathBuf> {
        let base = Path::new(name).file_name()?;
        Some(self.root.join(base))
    }

    /// Resolve a name to the path of an existing stored file.
    pub fn resolve(&self, name: &str) -> Result<PathBuf> {
        let not_found = || ServiceError::NotFound(format!("file {name}"));
        let path = self.path_for(name).ok_or_else(not_found)?;

        match fs::metadata(&path) {
            Ok(meta) if meta.is_file() => Ok(path),
            Ok(_) => Err(not_found()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Err(not_found()),
            Err(e) => Err(e.into()),
        }
    }

    /// Create `name` and fill it with `write`.
    ///
    /// The file is created exclusively. If `write` or the final flush fails,
    /// the partially written file is removed before the error is returned.
    pub fn create_with<F>(&self, name: &str, write: F) -> Result<u64>
    where
        F: FnOnce(&mut File) -> io::Result<u64>,
    {
        let path = self
            .path_for(name)
            .ok_or_else(|| ServiceError::Validation(format!("invalid file name: {name}")))?;

        let mut file = OpenOptions::new().write(true).create_new(true).open(&path)?;

        let written = write(&mut file).and_then(|n| file.flush().map(|()| n));
        drop(file);

        match written {
            Ok(n) => Ok(n),
            Err(e) => {
                if let Err(remove_err) = fs::remove_file(&path) {
                    tracing::error!(
                        path = %path.display(),
                        error = %remove_err,
                        "Failed to remove partially written file"
                    );
                }
                Err(e.into())
            }
        }
    }

    /// Metadata for a stored file.
    pub fn stat(&self, name: &str) -> Result<StoredFile> {
        let path = self.resolve(name)?;
        let meta = fs::metadata(&path)?;
        let base = path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or(name)
            .to_string();
        Ok(StoredFile::from_metadata(base, &meta)?)
    }

    /// Enumerate regular files under the root, sorted by name.
    ///
    /// Entries whose names are not valid UTF-8 are skipped.
    pub fn list(&self) -> Result<Vec<StoredFile>> {
        let mut files = Vec::new();

        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            let meta = entry.metadata()?;
            if !meta.is_file() {
                continue;
            }
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };
            files.push(StoredFile::from_metadata(name, &meta)?);
        }

        files.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(files)
    }

    /// Delete a stored file. Returns `false` if it didn't exist.
    pub fn remove(&self, name: &str) -> Result<bool> {
        let Some(path) = self.path_for(name) else {
            return Ok(false);
        };
        match fs::remove_file(&path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup_store() -> (TempDir, FileStore) {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::new(temp_dir.path()).unwrap();
        (temp_dir, store)
    }

    fn write_bytes(store: &FileStore, name: &str, content: &[u8]) -> u64 {
        store
            .create_with(name, |file| {
                file.write_all(content)?;
                Ok(content.len() as u64)
            })
            .unwrap()
    }

    #[test]
    fn test_new_creates_directory() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().join("nested").join("uploads");

        assert!(!root.exists());
        let store = FileStore::new(&root).unwrap();

        assert!(root.is_dir());
        assert_eq!(store.root(), root);
    }

    #[test]
    fn test_create_and_resolve() {
        let (_temp_dir, store) = setup_store();

        assert_eq!(write_bytes(&store, "a.png", b"hello"), 5);

        let path = store.resolve("a.png").unwrap();
        assert_eq!(fs::read(path).unwrap(), b"hello");
    }

    #[test]
    fn test_create_is_exclusive() {
        let (_temp_dir, store) = setup_store();
        write_bytes(&store, "a.png", b"first");

        let result = store.create_with("a.png", |file| {
            file.write_all(b"second")?;
            Ok(6)
        });

        assert!(matches!(result, Err(ServiceError::Io(ref e)) if e.kind() == io::ErrorKind::AlreadyExists));
        assert_eq!(fs::read(store.resolve("a.png").unwrap()).unwrap(), b"first");
    }

    #[test]
    fn test_create_rolls_back_on_write_failure() {
        let (temp_dir, store) = setup_store();

        let result = store.create_with("broken.png", |file| {
            file.write_all(b"partial")?;
            Err(io::Error::other("disk on fire"))
        });

        assert!(matches!(result, Err(ServiceError::Io(_))));
        assert!(!temp_dir.path().join("broken.png").exists());
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn test_resolve_strips_directories() {
        let (temp_dir, store) = setup_store();
        write_bytes(&store, "passwd", b"not really");

        let path = store.resolve("../../etc/passwd").unwrap();
        assert_eq!(path, temp_dir.path().join("passwd"));
    }

    #[test]
    fn test_resolve_not_found() {
        let (_temp_dir, store) = setup_store();

        assert!(matches!(
            store.resolve("missing.png"),
            Err(ServiceError::NotFound(_))
        ));
        assert!(matches!(store.resolve(""), Err(ServiceError::NotFound(_))));
        assert!(matches!(store.resolve(".."), Err(ServiceError::NotFound(_))));
    }

    #[test]
    fn test_resolve_rejects_directories() {
        let (temp_dir, store) = setup_store();
        fs::create_dir(temp_dir.path().join("sub")).unwrap();

        assert!(matches!(store.resolve("sub"), Err(ServiceError::NotFound(_))));
    }

    #[test]
    fn test_list_sorted_files_only() {
        let (temp_dir, store) = setup_store();
        write_bytes(&store, "b.png", b"bbbb");
        write_bytes(&store, "a.png", b"aa");
        fs::create_dir(temp_dir.path().join("subdir")).unwrap();

        let files = store.list().unwrap();
        let names: Vec<_> = files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["a.png", "b.png"]);
        assert_eq!(files[0].size, 2);
        assert_eq!(files[1].size, 4);
    }

    #[test]
    fn test_stat() {
        let (_temp_dir, store) = setup_store();
        write_bytes(&store, "c.gif", b"GIF89a");

        let stored = store.stat("c.gif").unwrap();
        assert_eq!(stored.name, "c.gif");
        assert_eq!(stored.size, 6);
        assert!(stored.modified > SystemTime::UNIX_EPOCH);
    }

    #[test]
    fn test_remove() {
        let (_temp_dir, store) = setup_store();
        write_bytes(&store, "gone.png", b"x");

        assert!(store.remove("gone.png").unwrap());
        assert!(!store.remove("gone.png").unwrap());
        assert!(matches!(
            store.resolve("gone.png"),
            Err(ServiceError::NotFound(_))
        ));
    }
}
