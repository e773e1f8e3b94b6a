//! File access abstraction used by the graph builder.
//!
//! The builder never touches the filesystem directly. [`NativeRuntime`] reads from
//! disk; [`MemoryRuntime`] serves files from a map and backs the test suites.

mod native;

#[cfg(any(test, feature = "test-utils"))]
mod memory;

#[cfg(any(test, feature = "test-utils"))]
pub use memory::MemoryRuntime;
pub use native::NativeRuntime;

use async_trait::async_trait;
use std::path::{Path, PathBuf};

pub type RuntimeResult<T> = Result<T, RuntimeError>;

#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("runtime error: {0}")]
    Other(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileMetadata {
    pub size: u64,
    pub is_dir: bool,
    pub is_file: bool,
}

#[async_trait]
pub trait Runtime: Send + Sync + std::fmt::Debug {
    async fn read_file(&self, path: &Path) -> RuntimeResult<Vec<u8>>;

    async fn metadata(&self, path: &Path) -> RuntimeResult<FileMetadata>;

    fn exists(&self, path: &Path) -> bool;

    /// `true` only for regular files.
    async fn is_file(&self, path: &Path) -> bool {
        self.exists(path)
            && self
                .metadata(path)
                .await
                .map(|meta| meta.is_file)
                .unwrap_or(false)
    }
}
