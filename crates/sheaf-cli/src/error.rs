//! Errors surfaced by CLI commands.
//!
//! Domain errors from `sheaf-config` and `sheaf-bundler` convert into [`CliError`]
//! with `?`. `main` turns the final error into a [`miette::Report`] so build
//! failures keep their diagnostic codes and help text.

use std::path::PathBuf;

use miette::Report;
use sheaf_bundler::BuildError;
use sheaf_config::ConfigError;
use thiserror::Error;

/// Top-level CLI error type.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Build failed: {0}")]
    Build(#[from] BuildError),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Directory not found: {}", .0.display())]
    DirectoryNotFound(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("File watcher error: {0}")]
    Watch(#[from] notify::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Custom(String),
}

/// Result type alias using `CliError` as the default error type.
pub type Result<T, E = CliError> = std::result::Result<T, E>;

impl CliError {
    /// Process exit status for this error.
    ///
    /// Usage mistakes exit with 2, everything else with 1.
    pub fn exit_code(&self) -> u8 {
        match self {
            CliError::InvalidArgument(_) | CliError::DirectoryNotFound(_) => 2,
            CliError::Config(ConfigError::NotFound(_)) => 2,
            _ => 1,
        }
    }
}

/// Convert a CLI error into a miette report for rendering.
pub fn cli_error_to_miette(err: CliError) -> Report {
    match err {
        CliError::Build(err) => Report::new(err),
        CliError::Config(err) => miette::miette!(
            help = "Check sheaf.toml and any SHEAF_ environment variables",
            "Configuration error: {}",
            err
        ),
        CliError::Watch(err) => miette::miette!(
            help = "The development session needs a readable project directory",
            "File watcher error: {}",
            err
        ),
        other => miette::miette!("{}", other),
    }
}
