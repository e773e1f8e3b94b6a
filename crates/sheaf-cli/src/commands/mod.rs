//! Command implementations.
//!
//! - [`build`] - one build in the selected mode
//! - [`dev`] - initial build, then incremental rebuilds until Ctrl+C
//!
//! Each command provides an `execute` function taking its parsed arguments and
//! the project location.

pub mod build;
pub mod dev;

pub use build::execute as build_execute;
pub use dev::execute as dev_execute;

use sheaf_config::ConfigFile;
use tracing::debug;

use crate::cli::ProjectOptions;
use crate::error::{CliError, Result};

/// Load the layered config for `project`.
pub(crate) fn load_config(project: &ProjectOptions) -> Result<ConfigFile> {
    if !project.root.is_dir() {
        return Err(CliError::DirectoryNotFound(project.root.clone()));
    }
    debug!(root = %project.root.display(), "loading project config");
    Ok(ConfigFile::load(&project.root, project.config.as_deref())?)
}
