use async_trait::async_trait;
use std::path::Path;

use super::{FileMetadata, Runtime, RuntimeError, RuntimeResult};

/// Reads from the local filesystem through `tokio::fs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeRuntime;

impl NativeRuntime {
    pub fn new() -> Self {
        Self
    }
}

fn map_io(path: &Path, err: std::io::Error) -> RuntimeError {
    if err.kind() == std::io::ErrorKind::NotFound {
        RuntimeError::FileNotFound(path.to_path_buf())
    } else {
        RuntimeError::Io(format!("{}: {err}", path.display()))
    }
}

#[async_trait]
impl Runtime for NativeRuntime {
    async fn read_file(&self, path: &Path) -> RuntimeResult<Vec<u8>> {
        tokio::fs::read(path).await.map_err(|err| map_io(path, err))
    }

    async fn metadata(&self, path: &Path) -> RuntimeResult<FileMetadata> {
        let meta = tokio::fs::metadata(path)
            .await
            .map_err(|err| map_io(path, err))?;
        Ok(FileMetadata {
            size: meta.len(),
            is_dir: meta.is_dir(),
            is_file: meta.is_file(),
        })
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }
}
