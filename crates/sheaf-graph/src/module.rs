use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::module_id::ModuleId;
use crate::scan;

/// How an import reaches its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ImportKind {
    /// `import x from`, side-effect `import`, `require()`, CSS `@import`.
    Static,
    /// `export ... from`.
    ReExport,
    /// `import()`: starts an async boundary.
    Dynamic,
    /// CSS `url()`: an asset reference.
    Url,
}

impl ImportKind {
    /// Static edges load together with their importer.
    pub fn is_static(self) -> bool {
        !matches!(self, ImportKind::Dynamic)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Import {
    /// Specifier as written in the source.
    pub specifier: String,
    pub kind: ImportKind,
    /// Target module, once resolved.
    pub resolved: Option<ModuleId>,
}

impl Import {
    pub fn new(specifier: impl Into<String>, kind: ImportKind) -> Self {
        Self {
            specifier: specifier.into(),
            kind,
            resolved: None,
        }
    }
}

/// Coarse source classification, decided by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Script,
    Style,
    /// Fonts, images and anything else that is not scanned for imports.
    Resource,
}

impl SourceKind {
    pub fn from_extension(ext: Option<&str>) -> Self {
        match ext.map(str::to_ascii_lowercase).as_deref() {
            Some("js" | "jsx" | "ts" | "tsx" | "mjs" | "cjs" | "json") => SourceKind::Script,
            Some("css") => SourceKind::Style,
            _ => SourceKind::Resource,
        }
    }
}

/// A loaded module. Immutable once the graph snapshot holding it is built.
#[derive(Debug, Clone)]
pub struct Module {
    pub id: ModuleId,
    pub path: PathBuf,
    pub kind: SourceKind,
    pub source: Arc<[u8]>,
    pub imports: Vec<Import>,
    /// blake3 of `source`.
    pub content_hash: [u8; 32],
    /// Writes to `window`, `globalThis`, `global` or `self`.
    pub has_global_state: bool,
    /// Placeholder for a module that could not be resolved.
    pub is_stub: bool,
}

impl Module {
    /// Classify and scan `source`.
    pub fn from_source(id: ModuleId, path: PathBuf, source: Vec<u8>) -> Self {
        let kind = SourceKind::from_extension(id.extension());
        let (imports, has_global_state) = match (kind, std::str::from_utf8(&source)) {
            (SourceKind::Script, Ok(text)) => {
                (scan::script_imports(text), scan::writes_global_state(text))
            }
            (SourceKind::Style, Ok(text)) => (scan::style_imports(text), false),
            _ => (Vec::new(), false),
        };

        Self {
            content_hash: *blake3::hash(&source).as_bytes(),
            id,
            path,
            kind,
            source: Arc::from(source),
            imports,
            has_global_state,
            is_stub: false,
        }
    }

    /// Stand-in for an unresolvable specifier. Throws when evaluated.
    pub fn stub(id: ModuleId, specifier: &str) -> Self {
        let source = format!(
            "throw new Error({});\n",
            serde_json::Value::String(format!("Cannot find module '{specifier}'"))
        )
        .into_bytes();
        Self {
            content_hash: *blake3::hash(&source).as_bytes(),
            path: PathBuf::from(id.as_str()),
            id,
            kind: SourceKind::Script,
            source: Arc::from(source),
            imports: Vec::new(),
            has_global_state: false,
            is_stub: true,
        }
    }

    pub fn size(&self) -> u64 {
        self.source.len() as u64
    }

    /// Source as text, with invalid UTF-8 replaced.
    pub fn text(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.source)
    }

    /// Resolved targets with their edge kind, in source order.
    pub fn dependencies(&self) -> impl Iterator<Item = (&ModuleId, ImportKind)> {
        self.imports
            .iter()
            .filter_map(|import| import.resolved.as_ref().map(|id| (id, import.kind)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scripts_are_scanned_and_hashed() {
        let id = ModuleId::new("client/a.js").unwrap();
        let module = Module::from_source(
            id,
            PathBuf::from("/app/client/a.js"),
            b"import b from './b';\nwindow.app = b;\n".to_vec(),
        );
        assert_eq!(module.kind, SourceKind::Script);
        assert_eq!(module.imports, vec![Import::new("./b", ImportKind::Static)]);
        assert!(module.has_global_state);
        assert_eq!(module.content_hash, *blake3::hash(&module.source).as_bytes());
    }

    #[test]
    fn resources_are_not_scanned() {
        let id = ModuleId::new("fonts/icons.svg").unwrap();
        let module = Module::from_source(
            id,
            PathBuf::from("fonts/icons.svg"),
            b"<svg><script>import('x')</script></svg>".to_vec(),
        );
        assert_eq!(module.kind, SourceKind::Resource);
        assert!(module.imports.is_empty());
    }

    #[test]
    fn stub_throws_with_specifier() {
        let module = Module::stub(ModuleId::missing("./gone", None), "./gone");
        assert!(module.is_stub);
        assert!(module.text().contains("Cannot find module './gone'"));
    }
}
