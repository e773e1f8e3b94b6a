//! Output file names.
//!
//! | file            | production                    | development        |
//! |-----------------|-------------------------------|--------------------|
//! | entry script    | `[name].bundle.[hash8].js`    | `[name].bundle.js` |
//! | other script    | `[name].chunk.[hash8].js`     | `[name].chunk.js`  |
//! | extracted style | `[name].[hash8].css`          | `[name].css`       |
//! | asset           | rule template, e.g. `fonts/[name].[ext]` | same    |
//!
//! The fingerprint is the first eight hex digits of the blake3 hash of the file's
//! bytes, so it changes exactly when the bytes do.

use sheaf_graph::ModuleId;

pub const FINGERPRINT_LEN: usize = 8;

/// Content fingerprint of `bytes`.
pub fn fingerprint(bytes: &[u8]) -> String {
    let hex = blake3::hash(bytes).to_hex();
    hex[..FINGERPRINT_LEN].to_string()
}

/// Role of an emitted file, deciding its name pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileRole {
    EntryScript,
    ChunkScript,
    Style,
}

impl FileRole {
    fn pattern(self, hashed: bool) -> &'static str {
        match (self, hashed) {
            (FileRole::EntryScript, true) => "[name].bundle.[hash].js",
            (FileRole::EntryScript, false) => "[name].bundle.js",
            (FileRole::ChunkScript, true) => "[name].chunk.[hash].js",
            (FileRole::ChunkScript, false) => "[name].chunk.js",
            (FileRole::Style, true) => "[name].[hash].css",
            (FileRole::Style, false) => "[name].css",
        }
    }
}

/// File name for a chunk file. `bytes` are fingerprinted only when `hashed`.
pub fn chunk_file_name(name: &str, role: FileRole, bytes: &[u8], hashed: bool) -> String {
    let pattern = role.pattern(hashed);
    let named = pattern.replace("[name]", &sanitize(name));
    if hashed {
        named.replace("[hash]", &fingerprint(bytes))
    } else {
        named
    }
}

/// Expand an asset template. `[name]` is the file stem, `[ext]` the extension
/// without its dot and `[hash]` the fingerprint of `bytes`.
pub fn asset_file_name(template: &str, id: &ModuleId, bytes: &[u8]) -> String {
    let mut name = template
        .replace("[name]", &sanitize(id.file_stem()))
        .replace("[ext]", id.extension().unwrap_or(""));
    if name.contains("[hash]") {
        name = name.replace("[hash]", &fingerprint(bytes));
    }
    if name.ends_with('.') {
        name.pop();
    }
    name
}

/// Sidecar name for `file`'s source map.
pub fn source_map_name(file: &str) -> String {
    format!("{file}.map")
}

/// Chunk names may carry `~` and `/`; keep them but drop anything that would make
/// a path escape or break a URL.
fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '?' | '#' | '\0' => '_',
            c => c,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn production_names_carry_eight_hex_digits() {
        let name = chunk_file_name("main", FileRole::EntryScript, b"code", true);
        let hash = fingerprint(b"code");
        assert_eq!(hash.len(), 8);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(name, format!("main.bundle.{hash}.js"));
        assert_eq!(
            chunk_file_name("main", FileRole::Style, b"body{}", true),
            format!("main.{}.css", fingerprint(b"body{}"))
        );
    }

    #[test]
    fn development_names_are_unhashed() {
        assert_eq!(chunk_file_name("main", FileRole::EntryScript, b"x", false), "main.bundle.js");
        assert_eq!(chunk_file_name("lazy", FileRole::ChunkScript, b"x", false), "lazy.chunk.js");
        assert_eq!(chunk_file_name("main", FileRole::Style, b"x", false), "main.css");
    }

    #[test]
    fn fingerprint_changes_with_a_single_byte() {
        assert_ne!(fingerprint(b"export default 1"), fingerprint(b"export default 2"));
        assert_eq!(fingerprint(b"same"), fingerprint(b"same"));
    }

    #[test]
    fn asset_template_uses_stem_and_extension() {
        let id = ModuleId::new("node_modules/icons/dist/icons.woff2").unwrap();
        assert_eq!(asset_file_name("fonts/[name].[ext]", &id, b""), "fonts/icons.woff2");
    }

    #[test]
    fn shared_chunk_names_keep_tilde() {
        assert_eq!(
            chunk_file_name("main~admin", FileRole::ChunkScript, b"", false),
            "main~admin.chunk.js"
        );
        assert_eq!(
            chunk_file_name("../etc", FileRole::ChunkScript, b"", false),
            ".._etc.chunk.js"
        );
    }
}
