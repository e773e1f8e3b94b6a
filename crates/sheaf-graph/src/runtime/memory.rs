use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use path_clean::PathClean;
use rustc_hash::FxHashMap;

use super::{FileMetadata, Runtime, RuntimeError, RuntimeResult};

/// In-memory file tree. Cloning shares the same files.
#[derive(Debug, Clone)]
pub struct MemoryRuntime {
    root: PathBuf,
    files: Arc<RwLock<FxHashMap<PathBuf, Vec<u8>>>>,
}

impl MemoryRuntime {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            files: Arc::default(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Add or replace a file. Relative paths are placed under the root.
    pub fn insert(&self, path: impl AsRef<Path>, content: impl Into<Vec<u8>>) {
        let path = self.absolute(path.as_ref());
        self.files.write().insert(path, content.into());
    }

    pub fn remove(&self, path: impl AsRef<Path>) -> bool {
        let path = self.absolute(path.as_ref());
        self.files.write().remove(&path).is_some()
    }

    fn absolute(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf().clean()
        } else {
            self.root.join(path).clean()
        }
    }

    fn is_dir(&self, path: &Path) -> bool {
        self.files
            .read()
            .keys()
            .any(|file| file != path && file.starts_with(path))
    }
}

#[async_trait]
impl Runtime for MemoryRuntime {
    async fn read_file(&self, path: &Path) -> RuntimeResult<Vec<u8>> {
        let path = self.absolute(path);
        self.files
            .read()
            .get(&path)
            .cloned()
            .ok_or(RuntimeError::FileNotFound(path))
    }

    async fn metadata(&self, path: &Path) -> RuntimeResult<FileMetadata> {
        let path = self.absolute(path);
        if let Some(content) = self.files.read().get(&path) {
            return Ok(FileMetadata {
                size: content.len() as u64,
                is_dir: false,
                is_file: true,
            });
        }
        if self.is_dir(&path) {
            return Ok(FileMetadata {
                size: 0,
                is_dir: true,
                is_file: false,
            });
        }
        Err(RuntimeError::FileNotFound(path))
    }

    fn exists(&self, path: &Path) -> bool {
        let path = self.absolute(path);
        self.files.read().contains_key(&path) || self.is_dir(&path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn clones_share_files() {
        let runtime = MemoryRuntime::new("/app");
        let clone = runtime.clone();
        clone.insert("a.js", "1");

        assert_eq!(runtime.read_file(Path::new("/app/a.js")).await.unwrap(), b"1");
        assert!(runtime.remove("a.js"));
        assert!(!clone.exists(Path::new("/app/a.js")));
    }

    #[tokio::test]
    async fn directories_are_inferred() {
        let runtime = MemoryRuntime::new("/app");
        runtime.insert("node_modules/pkg/index.js", "");
        let meta = runtime.metadata(Path::new("/app/node_modules/pkg")).await.unwrap();
        assert!(meta.is_dir);
        assert!(!runtime.is_file(Path::new("/app/node_modules/pkg")).await);
    }
}
