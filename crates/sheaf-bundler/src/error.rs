use std::path::PathBuf;
use std::time::Duration;

use sheaf_config::ConfigError;
use sheaf_graph::{GraphError, ModuleId};

/// Coarse failure class, deciding how each mode reacts to an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed or contradictory profile. Fatal before any transform runs.
    Config,
    /// A module could not be located.
    Resolution,
    /// An engine failed, timed out or is not registered.
    Transform,
    /// Output could not be written. Always fatal.
    Write,
}

/// Errors produced while building.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Resolution(#[from] GraphError),

    #[error("Rule #{rule_index} matching '{module}' references unknown transform engine '{engine}'")]
    UnknownTransform {
        module: ModuleId,
        rule_index: usize,
        engine: String,
    },

    #[error("Transform '{engine}' failed for '{module}': {message}")]
    Transform {
        module: ModuleId,
        engine: String,
        message: String,
    },

    #[error("Transform '{engine}' timed out for '{module}' after {}ms", .timeout.as_millis())]
    TimedOut {
        module: ModuleId,
        engine: String,
        timeout: Duration,
    },

    #[error("Minifier '{engine}' failed for '{module}': {message}")]
    Minify {
        module: ModuleId,
        engine: String,
        message: String,
    },

    #[error("Invalid output path: {0}")]
    InvalidOutputPath(String),

    #[error("Failed to write '{}': {message}", .path.display())]
    Write { path: PathBuf, message: String },

    #[error("Build worker failed: {0}")]
    Task(String),

    #[error("{}", format_aggregate(.0))]
    Aggregate(Vec<BuildError>),
}

/// Result type alias for sheaf-bundler operations.
pub type Result<T> = std::result::Result<T, BuildError>;

impl BuildError {
    /// Collapse collected worker errors: `None` when empty, the error itself when
    /// alone, an aggregate otherwise.
    pub fn aggregate(mut errors: Vec<BuildError>) -> Option<BuildError> {
        match errors.len() {
            0 => None,
            1 => errors.pop(),
            _ => Some(BuildError::Aggregate(errors)),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            BuildError::Config(_) => ErrorKind::Config,
            BuildError::Resolution(_) => ErrorKind::Resolution,
            BuildError::UnknownTransform { .. }
            | BuildError::Transform { .. }
            | BuildError::TimedOut { .. }
            | BuildError::Minify { .. }
            | BuildError::Task(_) => ErrorKind::Transform,
            BuildError::InvalidOutputPath(_) | BuildError::Write { .. } => ErrorKind::Write,
            BuildError::Aggregate(errors) => errors
                .iter()
                .map(BuildError::kind)
                .find(|kind| matches!(kind, ErrorKind::Config | ErrorKind::Write))
                .or_else(|| errors.first().map(BuildError::kind))
                .unwrap_or(ErrorKind::Transform),
        }
    }

    /// Module the error is about, when there is one.
    pub fn module(&self) -> Option<&ModuleId> {
        match self {
            BuildError::Resolution(err) => err.module(),
            BuildError::UnknownTransform { module, .. }
            | BuildError::Transform { module, .. }
            | BuildError::TimedOut { module, .. }
            | BuildError::Minify { module, .. } => Some(module),
            _ => None,
        }
    }

    /// Every leaf error, with aggregates flattened.
    pub fn leaves(&self) -> Vec<&BuildError> {
        match self {
            BuildError::Aggregate(errors) => errors.iter().flat_map(BuildError::leaves).collect(),
            other => vec![other],
        }
    }
}

fn format_aggregate(errors: &[BuildError]) -> String {
    format!(
        "{} errors: {}",
        errors.len(),
        errors
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ")
    )
}

impl miette::Diagnostic for BuildError {
    fn code(&self) -> Option<Box<dyn std::fmt::Display + '_>> {
        Some(Box::new(match self {
            BuildError::Config(_) => "sheaf::config",
            BuildError::Resolution(_) => "sheaf::resolution",
            BuildError::UnknownTransform { .. } => "sheaf::unknown_transform",
            BuildError::Transform { .. } => "sheaf::transform",
            BuildError::TimedOut { .. } => "sheaf::transform_timeout",
            BuildError::Minify { .. } => "sheaf::minify",
            BuildError::InvalidOutputPath(_) => "sheaf::invalid_output_path",
            BuildError::Write { .. } => "sheaf::write",
            BuildError::Task(_) => "sheaf::task",
            BuildError::Aggregate(_) => "sheaf::build_failed",
        }))
    }

    fn severity(&self) -> Option<miette::Severity> {
        Some(miette::Severity::Error)
    }

    fn help(&self) -> Option<Box<dyn std::fmt::Display + '_>> {
        match self {
            BuildError::Config(_) => Some(Box::new(
                "Check the [base], [development] and [production] sections of sheaf.toml.",
            )),
            BuildError::Resolution(GraphError::Unresolved { specifier, .. }) => Some(Box::new(
                format!("Check that '{specifier}' exists and the path or package name is spelled correctly."),
            )),
            BuildError::UnknownTransform { engine, .. } => Some(Box::new(format!(
                "Register '{engine}' under [base.engines.{engine}] or use a built-in engine \
                 (script, css, css-extract, style-inject, minify)."
            ))),
            BuildError::TimedOut { .. } => Some(Box::new(
                "Raise `transform_timeout_ms` or the engine's `timeout_ms` if the transform is legitimately slow.",
            )),
            BuildError::Write { .. } => Some(Box::new(
                "Check disk space and permissions of the output directory.",
            )),
            BuildError::InvalidOutputPath(_) => Some(Box::new(
                "Output file names must stay inside the output directory.",
            )),
            BuildError::Aggregate(_) => Some(Box::new("Every failing module is listed below.")),
            _ => None,
        }
    }

    fn related<'a>(&'a self) -> Option<Box<dyn Iterator<Item = &'a dyn miette::Diagnostic> + 'a>> {
        match self {
            BuildError::Aggregate(errors) => Some(Box::new(
                errors.iter().map(|err| err as &dyn miette::Diagnostic),
            )),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timed_out(module: &str) -> BuildError {
        BuildError::TimedOut {
            module: ModuleId::new(module).unwrap(),
            engine: "slow".to_string(),
            timeout: Duration::from_millis(20),
        }
    }

    #[test]
    fn aggregate_collapses_single_errors() {
        assert!(BuildError::aggregate(Vec::new()).is_none());
        let single = BuildError::aggregate(vec![timed_out("c.js")]).unwrap();
        assert!(matches!(single, BuildError::TimedOut { .. }));

        let many = BuildError::aggregate(vec![timed_out("c.js"), timed_out("d.js")]).unwrap();
        assert_eq!(many.leaves().len(), 2);
        assert!(many.to_string().starts_with("2 errors:"));
        assert_eq!(many.kind(), ErrorKind::Transform);
    }

    #[test]
    fn timeout_names_module_and_duration() {
        let err = timed_out("client/c.js");
        assert_eq!(err.module().map(ModuleId::as_str), Some("client/c.js"));
        assert_eq!(
            err.to_string(),
            "Transform 'slow' timed out for 'client/c.js' after 20ms"
        );
    }

    #[test]
    fn write_errors_dominate_aggregate_kind() {
        let err = BuildError::Aggregate(vec![
            timed_out("c.js"),
            BuildError::Write {
                path: PathBuf::from("dist/main.js"),
                message: "disk full".to_string(),
            },
        ]);
        assert_eq!(err.kind(), ErrorKind::Write);
    }
}
