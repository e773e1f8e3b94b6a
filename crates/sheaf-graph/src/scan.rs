//! Lightweight import scanning.
//!
//! The graph only needs edges, not an AST, so imports are found with regular
//! expressions over the raw text. Transform engines see the full source later.

use std::sync::LazyLock;

use regex::Regex;

use crate::module::{Import, ImportKind};

struct Patterns {
    static_import: Regex,
    re_export: Regex,
    dynamic_import: Regex,
    require: Regex,
    css_import: Regex,
    css_url: Regex,
    global_write: Regex,
}

static PATTERNS: LazyLock<Option<Patterns>> = LazyLock::new(|| {
    Some(Patterns {
        static_import: Regex::new(
            r#"(?m)^\s*import\s+(?:type\s+)?(?:[\w$*{}\s,]+?\s+from\s+)?["']([^"'\n]+)["']"#,
        )
        .ok()?,
        re_export: Regex::new(
            r#"(?m)^\s*export\s+(?:type\s+)?(?:\*(?:\s+as\s+[\w$]+)?|\{[^}]*\})\s+from\s+["']([^"'\n]+)["']"#,
        )
        .ok()?,
        dynamic_import: Regex::new(r#"\bimport\(\s*["']([^"'\n]+)["']\s*\)"#).ok()?,
        require: Regex::new(r#"\brequire\(\s*["']([^"'\n]+)["']\s*\)"#).ok()?,
        css_import: Regex::new(
            r#"@import\s+(?:url\(\s*)?["']?([^"'()\s;]+)["']?\s*\)?[^;]*;"#,
        )
        .ok()?,
        css_url: Regex::new(r#"url\(\s*["']?([^"'()]+?)["']?\s*\)"#).ok()?,
        global_write: Regex::new(
            r"\b(?:window|globalThis|global|self)(?:\s*\.\s*[\w$]+|\s*\[[^\]]+\])+\s*(?:=[^=]|\+=|-=)|Object\.(?:assign|defineProperty)\(\s*(?:window|globalThis|global|self)\b",
        )
        .ok()?,
    })
});

/// Imports of a script module, ordered by position in the source.
pub fn script_imports(source: &str) -> Vec<Import> {
    let Some(patterns) = PATTERNS.as_ref() else {
        return Vec::new();
    };

    let mut found = Vec::new();
    collect(&patterns.static_import, source, ImportKind::Static, &mut found);
    collect(&patterns.re_export, source, ImportKind::ReExport, &mut found);
    collect(&patterns.dynamic_import, source, ImportKind::Dynamic, &mut found);
    collect(&patterns.require, source, ImportKind::Static, &mut found);
    finish(found)
}

/// `@import` and `url()` references of a stylesheet.
///
/// Data URIs, absolute URLs and fragment-only references are not module edges.
pub fn style_imports(source: &str) -> Vec<Import> {
    let Some(patterns) = PATTERNS.as_ref() else {
        return Vec::new();
    };

    let mut found = Vec::new();
    let mut import_spans = Vec::new();
    for caps in patterns.css_import.captures_iter(source) {
        if let (Some(whole), Some(spec)) = (caps.get(0), caps.get(1)) {
            import_spans.push(whole.range());
            if is_local_reference(spec.as_str()) {
                found.push((spec.start(), Import::new(spec.as_str(), ImportKind::Static)));
            }
        }
    }
    for caps in patterns.css_url.captures_iter(source) {
        if let Some(spec) = caps.get(1) {
            let inside_import = import_spans
                .iter()
                .any(|span| span.contains(&spec.start()));
            if !inside_import && is_local_reference(spec.as_str()) {
                found.push((spec.start(), Import::new(spec.as_str().trim(), ImportKind::Url)));
            }
        }
    }
    finish(found)
}

/// Whether the script assigns to a property of a global object.
///
/// Such modules cannot be swapped in place during a hot update.
pub fn writes_global_state(source: &str) -> bool {
    PATTERNS
        .as_ref()
        .is_some_and(|patterns| patterns.global_write.is_match(source))
}

fn collect(re: &Regex, source: &str, kind: ImportKind, out: &mut Vec<(usize, Import)>) {
    for caps in re.captures_iter(source) {
        if let Some(spec) = caps.get(1) {
            out.push((spec.start(), Import::new(spec.as_str(), kind)));
        }
    }
}

fn finish(mut found: Vec<(usize, Import)>) -> Vec<Import> {
    found.sort_by_key(|(offset, _)| *offset);
    let mut imports: Vec<Import> = Vec::with_capacity(found.len());
    for (_, import) in found {
        let duplicate = imports
            .iter()
            .any(|seen| seen.specifier == import.specifier && seen.kind == import.kind);
        if !duplicate {
            imports.push(import);
        }
    }
    imports
}

fn is_local_reference(spec: &str) -> bool {
    let spec = spec.trim();
    !(spec.is_empty()
        || spec.starts_with("data:")
        || spec.starts_with("http://")
        || spec.starts_with("https://")
        || spec.starts_with("//")
        || spec.starts_with('#'))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn specs(imports: &[Import]) -> Vec<(&str, ImportKind)> {
        imports
            .iter()
            .map(|import| (import.specifier.as_str(), import.kind))
            .collect()
    }

    #[test]
    fn finds_every_script_edge_kind() {
        let source = r#"
import React from "react";
import { a,
  b } from './ab';
import './side-effect.css';
export * from "./reexport";
export { thing } from './things';
const lazy = () => import("./lazy");
const legacy = require('./legacy');
"#;
        assert_eq!(
            specs(&script_imports(source)),
            vec![
                ("react", ImportKind::Static),
                ("./ab", ImportKind::Static),
                ("./side-effect.css", ImportKind::Static),
                ("./reexport", ImportKind::ReExport),
                ("./things", ImportKind::ReExport),
                ("./lazy", ImportKind::Dynamic),
                ("./legacy", ImportKind::Static),
            ]
        );
    }

    #[test]
    fn repeated_imports_are_collapsed() {
        let source = "import a from './a';\nimport { b } from './a';\nimport('./a');\n";
        assert_eq!(
            specs(&script_imports(source)),
            vec![("./a", ImportKind::Static), ("./a", ImportKind::Dynamic)]
        );
    }

    #[test]
    fn stylesheet_imports_and_urls() {
        let source = r#"
@import "./reset.css";
@import url('./theme.css');
@font-face { src: url("../fonts/icons.woff2?v=4.7.0") format("woff2"); }
.logo { background: url(data:image/png;base64,AAAA); }
.remote { background: url(https://cdn.example.com/x.png); }
"#;
        assert_eq!(
            specs(&style_imports(source)),
            vec![
                ("./reset.css", ImportKind::Static),
                ("./theme.css", ImportKind::Static),
                ("../fonts/icons.woff2?v=4.7.0", ImportKind::Url),
            ]
        );
    }

    #[test]
    fn detects_global_writes() {
        assert!(writes_global_state("window.store = createStore();"));
        assert!(writes_global_state("globalThis['__APP__'] = {};"));
        assert!(writes_global_state("Object.assign(window, { x: 1 });"));
        assert!(!writes_global_state("const w = window.innerWidth;"));
        assert!(!writes_global_state("if (window.x === 1) {}"));
        assert!(!writes_global_state("export const b = 2;"));
    }
}
