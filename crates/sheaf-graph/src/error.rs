//! Error types for graph construction.

use std::path::PathBuf;

use thiserror::Error;

use crate::module_id::ModuleId;
use crate::runtime::RuntimeError;

pub type Result<T> = std::result::Result<T, GraphError>;

#[derive(Debug, Error)]
pub enum GraphError {
    #[error("module id is empty")]
    EmptyModuleId,

    /// A specifier could not be located. `importer` is `None` for entry modules.
    #[error("cannot resolve '{specifier}'{}", from_suffix(.importer.as_ref()))]
    Unresolved {
        specifier: String,
        importer: Option<ModuleId>,
    },

    #[error("failed to read '{}': {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: RuntimeError,
    },

    #[error("graph task failed: {0}")]
    Task(String),
}

fn from_suffix(importer: Option<&ModuleId>) -> String {
    importer
        .map(|id| format!(" from '{id}'"))
        .unwrap_or_default()
}

impl GraphError {
    /// Resolution failures are recoverable in development builds.
    pub fn is_resolution(&self) -> bool {
        matches!(self, GraphError::Unresolved { .. })
    }

    /// Module the error should be reported against.
    pub fn module(&self) -> Option<&ModuleId> {
        match self {
            GraphError::Unresolved { importer, .. } => importer.as_ref(),
            _ => None,
        }
    }
}
