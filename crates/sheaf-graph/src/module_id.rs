use std::fmt;
use std::path::{Component, Path, PathBuf};

use path_clean::PathClean;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::GraphError;

const MISSING_PREFIX: &str = "missing:";

/// Identifier for a module in the graph.
///
/// Identifiers are project-relative, cleaned, and always use forward slashes, so the
/// same file yields the same id on every platform. Rule patterns and chunk-group
/// patterns are matched against this text. Files outside the project root keep their
/// absolute path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleId(String);

impl ModuleId {
    /// Build an id from project-relative text.
    pub fn new(id: impl AsRef<str>) -> Result<Self, GraphError> {
        let raw = id.as_ref().replace('\\', "/");
        if raw.trim().is_empty() {
            return Err(GraphError::EmptyModuleId);
        }
        if raw.starts_with(MISSING_PREFIX) {
            return Ok(Self(raw));
        }
        let cleaned = PathBuf::from(&raw).clean();
        let text = cleaned.to_string_lossy().replace('\\', "/");
        if text.is_empty() || text == "." {
            return Err(GraphError::EmptyModuleId);
        }
        Ok(Self(text))
    }

    /// Build an id for `path`, relative to `root` when it lies inside it.
    pub fn from_path(root: &Path, path: &Path) -> Result<Self, GraphError> {
        let joined = if path.is_absolute() {
            path.to_path_buf()
        } else {
            root.join(path)
        };
        let path = joined.clean();
        let root = root.to_path_buf().clean();

        match path.strip_prefix(&root) {
            Ok(relative) => Self::new(relative.to_string_lossy()),
            Err(_) => Self::new(path.to_string_lossy()),
        }
    }

    /// Placeholder id for a specifier that could not be resolved.
    pub fn missing(specifier: &str, importer: Option<&ModuleId>) -> Self {
        let base = importer
            .and_then(|id| Path::new(id.as_str()).parent().map(Path::to_path_buf))
            .unwrap_or_default();
        let joined = base.join(specifier).clean();
        Self(format!(
            "{MISSING_PREFIX}{}",
            joined.to_string_lossy().replace('\\', "/")
        ))
    }

    pub fn is_missing(&self) -> bool {
        self.0.starts_with(MISSING_PREFIX)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Path of the module on disk, for ids inside `root`.
    pub fn to_path(&self, root: &Path) -> PathBuf {
        let path = Path::new(&self.0);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            root.join(path)
        }
    }

    /// Extension without the leading dot.
    pub fn extension(&self) -> Option<&str> {
        Path::new(&self.0).extension().and_then(|ext| ext.to_str())
    }

    /// File name without its final extension.
    pub fn file_stem(&self) -> &str {
        Path::new(&self.0)
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or(&self.0)
    }

    /// `true` when any path component is `node_modules`.
    pub fn is_package(&self) -> bool {
        Path::new(&self.0)
            .components()
            .any(|c| matches!(c, Component::Normal(name) if name == "node_modules"))
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ModuleId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Serialize for ModuleId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for ModuleId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        ModuleId::new(value).map_err(serde::de::Error::custom)
    }
}
