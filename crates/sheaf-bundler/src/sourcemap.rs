//! Line-level source maps (v3).
//!
//! Maps are built from the final chunk text: every line between a module's
//! `__sheaf.define(` header and the next header maps to the matching line of that
//! module's source, clamped to its last line. Column information is not tracked.

use oxc_sourcemap::{SourceMap, SourceMapBuilder};
use sheaf_graph::ModuleId;

use crate::render::DEFINE_PREFIX;

/// Prefix of every source name, matching the `sourceURL` of eval maps.
pub const SOURCE_ROOT: &str = "sheaf:///";

/// Build a map for `code` (the text of `file`). `sources` pairs each module with its
/// original text.
pub fn build(file: &str, code: &str, sources: &[(ModuleId, String)]) -> SourceMap {
    let mut builder = SourceMapBuilder::default();
    builder.set_file(file);

    let source_ids: Vec<u32> = sources
        .iter()
        .map(|(id, text)| builder.add_source_and_content(&format!("{SOURCE_ROOT}{id}"), text))
        .collect();
    let last_lines: Vec<u32> = sources
        .iter()
        .map(|(_, text)| text.lines().count().max(1) as u32 - 1)
        .collect();

    // (index into `sources`, source line of the next body line)
    let mut current: Option<(usize, u32)> = None;
    for (dst_line, line) in (0u32..).zip(code.lines()) {
        if let Some(id) = line.trim_start().strip_prefix(DEFINE_PREFIX).and_then(header_id) {
            current = sources
                .iter()
                .position(|(source, _)| source.as_str() == id)
                .map(|source| (source, 0));
            continue;
        }
        let Some((source, next)) = current.as_mut() else {
            continue;
        };
        let src_line = (*next).min(last_lines[*source]);
        *next += 1;
        builder.add_token(dst_line, 0, src_line, 0, Some(source_ids[*source]), None);
    }

    builder.into_sourcemap()
}

/// Module id from the JSON string literal opening a define header.
fn header_id(rest: &str) -> Option<String> {
    let mut stream = serde_json::Deserializer::from_str(rest).into_iter::<String>();
    stream.next()?.ok()
}

#[cfg(test)]
mod tests {
    use serde_json::Value;

    use super::*;

    #[test]
    fn lines_map_into_their_module() {
        let a = ModuleId::new("a.js").unwrap();
        let b = ModuleId::new("b.js").unwrap();
        let code = "prelude();\n\
                    __sheaf.define(\"a.js\", {}, function (module, exports, require) {\n\
                    one();\n\
                    two();\n\
                    });\n\
                    __sheaf.define(\"b.js\", {}, function (module, exports, require) {\n\
                    three();\n\
                    });\n";
        let map = build(
            "main.bundle.js",
            code,
            &[(a, "one();\ntwo();\n".to_string()), (b, "three();\n".to_string())],
        );
        let json: Value = serde_json::from_str(&map.to_json_string()).unwrap();

        assert_eq!(json["version"], 3);
        assert_eq!(json["file"], "main.bundle.js");
        assert_eq!(json["sources"], serde_json::json!(["sheaf:///a.js", "sheaf:///b.js"]));
        assert_eq!(json["sourcesContent"][1], "three();\n");
        // prelude and headers carry no segment; the closing line clamps to the last
        // source line.
        assert_eq!(json["mappings"], ";;AAAA;AACA;AAAA;;ACDA;AAAA");
    }

    #[test]
    fn unknown_headers_leave_lines_unmapped() {
        let code = "__sheaf.define(\"gone.js\", {}, function (module, exports, require) {\n\
                    stray();\n\
                    });\n";
        let map = build("main.bundle.js", code, &[]);
        let json: Value = serde_json::from_str(&map.to_json_string()).unwrap();
        assert_eq!(json["mappings"], "");
    }
}
