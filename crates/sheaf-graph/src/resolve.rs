//! Specifier resolution.
//!
//! Relative and root-absolute specifiers are probed as written, then with each
//! configured extension appended, then as a directory with an `index` file. Bare
//! specifiers are looked up in `node_modules` directories from the importer up to the
//! project root, honouring the package's `module`/`main` field.

use std::path::{Path, PathBuf};

use path_clean::PathClean;
use serde::Deserialize;

use crate::runtime::Runtime;

#[derive(Debug, Clone)]
pub struct Resolver {
    root: PathBuf,
    extensions: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct PackageManifest {
    module: Option<String>,
    main: Option<String>,
}

impl Resolver {
    pub fn new(root: impl Into<PathBuf>, extensions: Vec<String>) -> Self {
        Self {
            root: root.into().clean(),
            extensions,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve `specifier` as imported from the file at `from`.
    ///
    /// Pass `None` for entry modules, which resolve against the project root.
    pub async fn resolve(
        &self,
        specifier: &str,
        from: Option<&Path>,
        runtime: &dyn Runtime,
    ) -> Option<PathBuf> {
        let specifier = strip_query(specifier);
        // Stylesheets use `~pkg/file.css` for package imports.
        let specifier = specifier.strip_prefix('~').unwrap_or(specifier);
        if specifier.is_empty() {
            return None;
        }

        let base_dir = from
            .and_then(Path::parent)
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.root.clone());

        if let Some(rooted) = specifier.strip_prefix('/') {
            return self.probe(&self.root.join(rooted).clean(), runtime).await;
        }
        if is_relative(specifier) || from.is_none() {
            return self.probe(&base_dir.join(specifier).clean(), runtime).await;
        }

        // Url references in stylesheets are relative even without `./`.
        if from.is_some_and(is_stylesheet) {
            if let Some(found) = self.probe(&base_dir.join(specifier).clean(), runtime).await {
                return Some(found);
            }
        }

        self.resolve_package(specifier, &base_dir, runtime).await
    }

    async fn resolve_package(
        &self,
        specifier: &str,
        base_dir: &Path,
        runtime: &dyn Runtime,
    ) -> Option<PathBuf> {
        let mut dir = Some(base_dir);
        while let Some(current) = dir {
            let candidate = current.join("node_modules").join(specifier).clean();
            if let Some(found) = self.probe(&candidate, runtime).await {
                return Some(found);
            }
            if let Some(found) = self.package_entry(&candidate, runtime).await {
                return Some(found);
            }
            if current == self.root {
                break;
            }
            dir = current.parent();
        }
        None
    }

    async fn package_entry(&self, package_dir: &Path, runtime: &dyn Runtime) -> Option<PathBuf> {
        let manifest_path = package_dir.join("package.json");
        if !runtime.is_file(&manifest_path).await {
            return None;
        }
        let bytes = runtime.read_file(&manifest_path).await.ok()?;
        let manifest: PackageManifest = serde_json::from_slice(&bytes).ok()?;
        let main = manifest.module.or(manifest.main)?;
        self.probe(&package_dir.join(main).clean(), runtime).await
    }

    async fn probe(&self, candidate: &Path, runtime: &dyn Runtime) -> Option<PathBuf> {
        if runtime.is_file(candidate).await {
            return Some(candidate.to_path_buf());
        }

        for ext in &self.extensions {
            let with_ext = append_extension(candidate, ext);
            if runtime.is_file(&with_ext).await {
                return Some(with_ext);
            }
        }

        if runtime.exists(candidate) {
            for ext in &self.extensions {
                let index = candidate.join(format!("index{ext}"));
                if runtime.is_file(&index).await {
                    return Some(index);
                }
            }
        }

        None
    }
}

/// Drop `?query` and `#fragment` suffixes.
pub fn strip_query(specifier: &str) -> &str {
    let end = specifier.find(['?', '#']).unwrap_or(specifier.len());
    &specifier[..end]
}

fn is_relative(specifier: &str) -> bool {
    specifier == "." || specifier == ".." || specifier.starts_with("./") || specifier.starts_with("../")
}

fn is_stylesheet(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "css")
}

// `Path::with_extension` would replace `.entry` in `simple.entry`.
fn append_extension(path: &Path, ext: &str) -> PathBuf {
    let mut text = path.as_os_str().to_os_string();
    text.push(ext);
    PathBuf::from(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::MemoryRuntime;

    fn resolver() -> Resolver {
        Resolver::new(
            "/app",
            [".ts", ".tsx", ".js", ".jsx", ".css"]
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
        )
    }

    #[tokio::test]
    async fn probes_extensions_without_clobbering_dotted_names() {
        let runtime = MemoryRuntime::new("/app");
        runtime.insert("client/simple.entry.tsx", "");

        let found = resolver()
            .resolve("client/simple.entry", None, &runtime)
            .await;
        assert_eq!(found, Some(PathBuf::from("/app/client/simple.entry.tsx")));
    }

    #[tokio::test]
    async fn relative_imports_use_importer_directory() {
        let runtime = MemoryRuntime::new("/app");
        runtime.insert("client/lib/index.ts", "");

        let from = Path::new("/app/client/pages/home.tsx");
        let found = resolver().resolve("../lib", Some(from), &runtime).await;
        assert_eq!(found, Some(PathBuf::from("/app/client/lib/index.ts")));
    }

    #[tokio::test]
    async fn bare_specifiers_walk_node_modules() {
        let runtime = MemoryRuntime::new("/app");
        runtime.insert(
            "node_modules/monaco-editor/package.json",
            r#"{"module": "esm/editor.main.js"}"#,
        );
        runtime.insert("node_modules/monaco-editor/esm/editor.main.js", "");

        let from = Path::new("/app/client/editor.tsx");
        let found = resolver().resolve("monaco-editor", Some(from), &runtime).await;
        assert_eq!(
            found,
            Some(PathBuf::from("/app/node_modules/monaco-editor/esm/editor.main.js"))
        );
    }

    #[tokio::test]
    async fn query_suffix_is_ignored() {
        let runtime = MemoryRuntime::new("/app");
        runtime.insert("fonts/icons.woff2", vec![0u8, 1, 2]);

        let from = Path::new("/app/client/style.css");
        let found = resolver()
            .resolve("../fonts/icons.woff2?v=4.7.0", Some(from), &runtime)
            .await;
        assert_eq!(found, Some(PathBuf::from("/app/fonts/icons.woff2")));
    }

    #[tokio::test]
    async fn unknown_specifier_is_none() {
        let runtime = MemoryRuntime::new("/app");
        let from = Path::new("/app/client/a.js");
        assert!(resolver().resolve("./gone", Some(from), &runtime).await.is_none());
        assert!(resolver().resolve("left-pad", Some(from), &runtime).await.is_none());
    }
}
