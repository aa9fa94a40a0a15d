//! Filesystem blob backend.
//!
//! Each blob is a file under the data directory. Writes go to a sibling
//! temporary file that is then renamed over the target, so a crash mid-write
//! leaves the previous contents intact.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Component, Path, PathBuf};
use tracing::debug;

use faceguard_store::{BlobStore, StoreError};

pub struct FileBlobStore {
    root: PathBuf,
}

impl FileBlobStore {
    /// Open (creating if needed) a blob directory.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        fs::create_dir_all(&root)
            .map_err(|e| StoreError::Backend(format!("create {}: {e}", root.display())))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Filesystem path backing a blob name.
    pub fn path_of(&self, name: &str) -> Result<PathBuf, StoreError> {
        let relative = Path::new(name);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)));
        if name.is_empty() || escapes {
            return Err(StoreError::Backend(format!("invalid blob name: {name:?}")));
        }
        Ok(self.root.join(relative))
    }
}

impl BlobStore for FileBlobStore {
    fn read(&self, name: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let path = self.path_of(name)?;
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::Backend(format!("read {}: {e}", path.display()))),
        }
    }

    fn write(&self, name: &str, bytes: &[u8]) -> Result<(), StoreError> {
        let path = self.path_of(name)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| StoreError::Backend(format!("create {}: {e}", parent.display())))?;
        }
        let mut tmp = path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        let backend = |e: std::io::Error| StoreError::Backend(format!("write {}: {e}", path.display()));
        let mut file = fs::File::create(&tmp).map_err(backend)?;
        file.write_all(bytes).map_err(backend)?;
        file.sync_all().map_err(backend)?;
        drop(file);
        fs::rename(&tmp, &path).map_err(backend)?;

        debug!(blob = name, len = bytes.len(), "blob written");
        Ok(())
    }

    fn remove(&self, name: &str) -> Result<(), StoreError> {
        let path = self.path_of(name)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::Backend(format!("remove {}: {e}", path.display()))),
        }
    }

    fn list(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        let (dir, file_prefix) = match prefix.rsplit_once('/') {
            Some((dir, rest)) => (self.path_of(dir)?, rest),
            None => (self.root.clone(), prefix),
        };
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::Backend(format!("list {}: {e}", dir.display()))),
        };
        let dir_part = prefix.rsplit_once('/').map(|(d, _)| d);
        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| StoreError::Backend(e.to_string()))?;
            if !entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
                continue;
            }
            let file_name = entry.file_name().to_string_lossy().into_owned();
            if file_name.ends_with(".tmp") || !file_name.starts_with(file_prefix) {
                continue;
            }
            names.push(match dir_part {
                Some(d) => format!("{d}/{file_name}"),
                None => file_name,
            });
        }
        names.sort();
        Ok(names)
    }
}
