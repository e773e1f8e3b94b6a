use std::path::PathBuf;
use std::sync::Arc;

use indexmap::IndexMap;
use rustc_hash::FxHashSet;

use crate::{Import, ImportKind, Module, ModuleGraph, ModuleId};

pub(crate) fn id(text: &str) -> ModuleId {
    ModuleId::new(text).unwrap()
}

pub(crate) fn module(name: &str, edges: &[(&str, ImportKind)]) -> Arc<Module> {
    let mut module = Module::from_source(id(name), PathBuf::from(name), Vec::new());
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

/// main -> a -> shared, admin -> shared, a ~> lazy -> deep
fn sample() -> ModuleGraph {
    let mut entries = IndexMap::new();
    entries.insert("main".to_string(), vec![id("main.js")]);
    entries.insert("admin".to_string(), vec![id("admin.js")]);

    ModuleGraph::new(
        entries,
        vec![
            module("main.js", &[("a.js", ImportKind::Static)]),
            module(
                "a.js",
                &[
                    ("shared.js", ImportKind::Static),
                    ("lazy.js", ImportKind::Dynamic),
                ],
            ),
            module("admin.js", &[("shared.js", ImportKind::ReExport)]),
            module("shared.js", &[]),
            module("lazy.js", &[("deep.js", ImportKind::Static)]),
            module("deep.js", &[]),
        ],
    )
}

#[test]
fn modules_are_sorted_by_id() {
    let graph = sample();
    let ids: Vec<&str> = graph.ids().map(ModuleId::as_str).collect();
    let mut sorted = ids.clone();
    sorted.sort();
    assert_eq!(ids, sorted);
}

#[test]
fn static_closure_stops_at_dynamic_edges() {
    let graph = sample();
    let closure = graph.static_closure([&id("main.js")]);
    assert!(closure.contains(&id("shared.js")));
    assert!(!closure.contains(&id("lazy.js")));
    assert!(!closure.contains(&id("deep.js")));

    let full = graph.full_closure([&id("main.js")]);
    assert!(full.contains(&id("deep.js")));
}

#[test]
fn dependents_mirror_dependencies() {
    let graph = sample();
    for module in graph.modules() {
        for (target, kind) in graph.dependencies(&module.id) {
            assert!(
                graph
                    .dependents(target)
                    .iter()
                    .any(|dep| dep.importer == module.id && dep.kind == kind)
            );
        }
    }
}

#[test]
fn ancestors_follow_static_and_dynamic_edges() {
    let graph = sample();
    let affected = graph.ancestors([&id("deep.js")]);
    let expected: FxHashSet<ModuleId> = ["deep.js", "lazy.js", "a.js", "main.js"]
        .into_iter()
        .map(id)
        .collect();
    assert_eq!(affected, expected);
}

#[test]
fn entries_containing_changed_module() {
    let graph = sample();
    let changed: FxHashSet<ModuleId> = [id("shared.js")].into_iter().collect();
    assert_eq!(graph.entries_containing(&changed), vec!["main", "admin"]);

    let changed: FxHashSet<ModuleId> = [id("deep.js")].into_iter().collect();
    assert_eq!(graph.entries_containing(&changed), vec!["main"]);
}

#[test]
fn edges_to_absent_modules_are_ignored() {
    let graph = ModuleGraph::new(
        IndexMap::new(),
        vec![module("a.js", &[("ghost.js", ImportKind::Static)])],
    );
    assert_eq!(graph.dependencies(&id("a.js")).count(), 0);
    assert_eq!(graph.static_closure([&id("a.js")]).len(), 1);
}
