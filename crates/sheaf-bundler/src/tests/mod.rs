
use std::path::PathBuf;
use std::sync::Arc;

use indexmap::IndexMap;
use sheaf_config::{
    BuildProfile, ChunkGroupRule, ChunkScope, EnvFlags, Mode, PartialProfile, PartialSplit,
    Pattern, resolve,
};
use sheaf_graph::{Import, ImportKind, Module, ModuleGraph, ModuleId};

pub(crate) fn id(text: &str) -> ModuleId {
    ModuleId::new(text).unwrap()
}

/// Module of `size` bytes with the given resolved edges.
pub(crate) fn module(name: &str, size: usize, edges: &[(&str, ImportKind)]) -> Arc<Module> {
    let mut module = Module::from_source(id(name), PathBuf::from(name), vec![b' '; size]);
    module.imports = edges
        .iter()
        .map(|(target, kind)| Import {
            specifier: format!("./{target}"),
            kind: *kind,
            resolved: Some(id(target)),
        })
        .collect();
    Arc::new(module)
}

pub(crate) fn graph(entries: &[(&str, &str)], modules: Vec<Arc<Module>>) -> ModuleGraph {
    let entries: IndexMap<String, Vec<ModuleId>> = entries
        .iter()
        .map(|(name, root)| (name.to_string(), vec![id(root)]))
        .collect();
    ModuleGraph::new(entries, modules)
}

pub(crate) fn group(name: &str, test: &str, chunks: ChunkScope) -> ChunkGroupRule {
    ChunkGroupRule {
        name: name.to_string(),
        test: Pattern::new(test).unwrap(),
        chunks,
    }
}

pub(crate) fn production(min_size: u64, groups: Vec<ChunkGroupRule>) -> BuildProfile {
    let overrides = PartialProfile {
        split: Some(PartialSplit {
            min_size: Some(min_size),
            groups: Some(groups),
        }),
        ..Default::default()
    };
    resolve(
        &PartialProfile::default(),
        &overrides,
        Mode::Production,
        &EnvFlags::default(),
    )
}

pub(crate) fn development() -> BuildProfile {
    resolve(
        &PartialProfile::default(),
        &PartialProfile::default(),
        Mode::Development,
        &EnvFlags::default(),
    )
}
