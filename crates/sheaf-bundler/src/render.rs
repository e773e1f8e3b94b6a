//! Chunk rendering.
//!
//! A script chunk is the module registry prelude followed by one `__sheaf.define`
//! call per member module, plus `__sheaf.require` calls for the roots when the chunk
//! boots an entry. Each define carries the module's specifier-to-id map so
//! `require("./b")` inside the body finds `b.js`. Style members either go to the
//! chunk's extracted style sheet or are injected by script.
//!
//! Rendering depends only on the chunk's own members, never on other chunks' file
//! names, so a chunk's bytes change only when one of its modules does.

use serde_json::{Map, Value};
use sheaf_config::{BuildProfile, Capability, SourceMapStrategy};
use sheaf_graph::{ModuleGraph, ModuleId};

use crate::engines::{ContentKind, inject_style};
use crate::sourcemap::SOURCE_ROOT;
use crate::split::Chunk;
use crate::transform::{ModuleOutput, TransformedModules};

/// Start of every module header line.
pub const DEFINE_PREFIX: &str = "__sheaf.define(";

/// Module registry installed once per page by whichever chunk loads first.
pub const PRELUDE: &str = r#"(function (g) {
  if (g.__sheaf) return;
  var factories = {};
  var cache = {};
  function load(id) {
    var cached = cache[id];
    if (cached) return cached.exports;
    var entry = factories[id];
    if (!entry) throw new Error("sheaf: module '" + id + "' is not loaded");
    var module = (cache[id] = { id: id, exports: {} });
    entry.factory.call(module.exports, module, module.exports, function (specifier) {
      return load(entry.deps[specifier] || specifier);
    });
    return module.exports;
  }
  g.__sheaf = {
    define: function (id, deps, factory) { factories[id] = { deps: deps, factory: factory }; },
    require: load,
    invalidate: function (id) { delete cache[id]; }
  };
})(typeof globalThis !== "undefined" ? globalThis : self);
"#;

/// Text of one chunk before naming.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedChunk {
    pub name: String,
    /// `None` when the chunk holds no script and boots no entry.
    pub script: Option<String>,
    /// Extracted style sheet.
    pub style: Option<String>,
    /// Original text of every script member, for source maps.
    pub sources: Vec<(ModuleId, String)>,
}

pub fn render_chunk(
    chunk: &Chunk,
    graph: &ModuleGraph,
    modules: &TransformedModules,
    profile: &BuildProfile,
) -> RenderedChunk {
    let extract = profile.has(Capability::ExtractCss);
    let eval_maps = profile.source_map() == SourceMapStrategy::EvalSourceMap;
    let node_env = Value::String(profile.mode().as_str().to_string()).to_string();

    let mut script = String::new();
    let mut style = String::new();
    let mut sources = Vec::new();

    for id in &chunk.modules {
        let Some(done) = modules.get(id) else {
            continue;
        };
        let ModuleOutput::Code { kind, code } = &done.output else {
            continue;
        };

        let body = match kind {
            ContentKind::Style if extract => {
                style.push_str(&format!("/* {id} */\n{code}"));
                if !code.ends_with('\n') {
                    style.push('\n');
                }
                continue;
            }
            ContentKind::Style => inject_style(id, code),
            ContentKind::Script => code.replace("process.env.NODE_ENV", &node_env),
        };

        if let Some(original) = graph.module(id) {
            sources.push((id.clone(), original.text().into_owned()));
        }
        script.push_str(&define(id, &dependency_map(graph, id), &body, eval_maps));
    }

    if let Some(entry) = &chunk.entry {
        for root in graph.entries().get(entry).into_iter().flatten() {
            script.push_str(&format!(
                "__sheaf.require({});\n",
                Value::String(root.to_string())
            ));
        }
    }

    let script = (!script.is_empty() || chunk.is_entry()).then(|| format!("{PRELUDE}{script}"));
    RenderedChunk {
        name: chunk.name.clone(),
        script,
        style: (!style.is_empty()).then_some(style),
        sources,
    }
}

fn define(id: &ModuleId, deps: &Value, body: &str, eval_maps: bool) -> String {
    let id_literal = Value::String(id.to_string());
    let body = if eval_maps {
        let with_url = format!("{body}\n//# sourceURL={SOURCE_ROOT}{id}");
        format!("eval({});\n", Value::String(with_url))
    } else if body.ends_with('\n') {
        body.to_string()
    } else {
        format!("{body}\n")
    };
    format!("{DEFINE_PREFIX}{id_literal}, {deps}, function (module, exports, require) {{\n{body}}});\n")
}

/// Specifier to module id for every resolved import of `id`.
fn dependency_map(graph: &ModuleGraph, id: &ModuleId) -> Value {
    let mut deps = Map::new();
    if let Some(module) = graph.module(id) {
        for import in &module.imports {
            if let Some(target) = &import.resolved {
                deps.insert(import.specifier.clone(), Value::String(target.to_string()));
            }
        }
    }
    Value::Object(deps)
}
