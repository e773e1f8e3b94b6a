//! Error types for configuration loading and profile validation.

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("unsupported configuration format: {0}")]
    UnsupportedFormat(String),

    #[error("invalid config value: {0}")]
    InvalidValue(String),

    #[error("invalid pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    #[error("no entries specified")]
    NoEntries,

    #[error("entry '{0}' declares no modules")]
    EmptyEntry(String),

    #[error("chunk group '{0}' is declared more than once")]
    DuplicateChunkGroup(String),

    #[error("chunk group '{0}' has the same name as an entry")]
    GroupShadowsEntry(String),

    #[error("invalid chunk group '{name}': {reason}")]
    InvalidChunkGroup { name: String, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
