use rustc_hash::FxHashSet;

use super::{builder, entries};
use crate::{ChangeSet, GraphError, ImportKind, MemoryRuntime, ModuleId};

fn id(text: &str) -> ModuleId {
    ModuleId::new(text).unwrap()
}

fn app() -> MemoryRuntime {
    let runtime = MemoryRuntime::new(super::ROOT);
    runtime.insert(
        "a.js",
        "import b from './b';\nexport const lazy = () => import('./c');\n",
    );
    runtime.insert("b.js", "export default 'b';\n");
    runtime.insert("c.js", "export default 'c';\n");
    runtime
}

#[tokio::test]
async fn builds_static_and_dynamic_edges() {
    let runtime = app();
    let build = builder(&runtime).build(&entries(&[("main", &["a.js"])])).await;

    assert!(build.is_ok(), "{:?}", build.errors);
    assert_eq!(build.loaded, 3);
    let graph = &build.graph;
    assert_eq!(graph.entries()["main"], vec![id("a.js")]);

    let initial = graph.static_closure(graph.entries()["main"].iter());
    assert_eq!(initial.into_iter().collect::<Vec<_>>(), vec![id("a.js"), id("b.js")]);
    assert_eq!(
        graph.dynamic_targets().into_iter().collect::<Vec<_>>(),
        vec![id("c.js")]
    );
    assert_eq!(graph.dependents(&id("c.js"))[0].kind, ImportKind::Dynamic);
}

#[tokio::test]
async fn entry_specifier_without_extension_resolves() {
    let runtime = MemoryRuntime::new(super::ROOT);
    runtime.insert("client/simple.entry.tsx", "export {};\n");
    let build = builder(&runtime)
        .build(&entries(&[("simple", &["client/simple.entry"])]))
        .await;

    assert!(build.is_ok());
    assert_eq!(build.graph.entries()["simple"], vec![id("client/simple.entry.tsx")]);
}

#[tokio::test]
async fn unresolved_imports_are_collected_not_fatal() {
    let runtime = app();
    runtime.insert("b.js", "import './gone';\nimport 'left-pad';\n");
    let build = builder(&runtime).build(&entries(&[("main", &["a.js"])])).await;

    assert_eq!(build.errors.len(), 2);
    assert!(build.errors.iter().all(GraphError::is_resolution));
    assert!(
        build
            .errors
            .iter()
            .all(|err| err.module() == Some(&id("b.js")))
    );
    assert_eq!(build.graph.len(), 3);
    assert_eq!(build.graph.stubs().count(), 0);
}

#[tokio::test]
async fn stubs_stand_in_for_unresolved_imports() {
    let runtime = app();
    runtime.insert("b.js", "import './gone';\n");
    let build = builder(&runtime)
        .stub_unresolved(true)
        .build(&entries(&[("main", &["a.js"])]))
        .await;

    assert_eq!(build.errors.len(), 1);
    let stub_id = ModuleId::missing("./gone", Some(&id("b.js")));
    let stub = build.graph.module(&stub_id).unwrap();
    assert!(stub.is_stub);
    assert_eq!(build.graph.dependents(&stub_id)[0].importer, id("b.js"));
}

#[tokio::test]
async fn missing_entry_is_reported_without_importer() {
    let runtime = MemoryRuntime::new(super::ROOT);
    let build = builder(&runtime)
        .build(&entries(&[("main", &["client/missing.tsx"])]))
        .await;

    assert!(matches!(
        &build.errors[..],
        [GraphError::Unresolved { importer: None, specifier }] if specifier == "client/missing.tsx"
    ));
    assert!(build.graph.is_empty());
}

#[tokio::test]
async fn rebuild_reloads_only_touched_modules_and_importers() {
    let runtime = app();
    let entries = entries(&[("main", &["a.js"])]);
    let builder = builder(&runtime);
    let first = builder.build(&entries).await;

    runtime.insert("b.js", "export default 'B';\n");
    let touched: FxHashSet<ModuleId> = [id("b.js")].into_iter().collect();
    let second = builder.rebuild(&entries, Some(&first.graph), &touched).await;

    assert!(second.is_ok());
    assert_eq!(second.loaded, 2, "b.js and its importer a.js");
    assert_eq!(second.reused, 1, "c.js");

    let changes = ChangeSet::between(&first.graph, &second.graph);
    assert_eq!(changes.changed_ids(), vec![id("b.js")]);
    let mut affected: Vec<_> = changes.affected.into_iter().collect();
    affected.sort();
    assert_eq!(affected, vec![id("a.js"), id("b.js")]);
}

#[tokio::test]
async fn rebuild_after_delete_reports_removal() {
    let runtime = app();
    let entries = entries(&[("main", &["a.js"])]);
    let builder = builder(&runtime);
    let first = builder.build(&entries).await;

    runtime.remove("b.js");
    let touched: FxHashSet<ModuleId> = [id("b.js")].into_iter().collect();
    let second = builder.rebuild(&entries, Some(&first.graph), &touched).await;

    assert_eq!(second.errors.len(), 1);
    let changes = ChangeSet::between(&first.graph, &second.graph);
    assert!(changes.removed.contains(&id("b.js")));
    assert!(changes.is_structural());
}

#[tokio::test]
async fn unchanged_content_yields_empty_change_set() {
    let runtime = app();
    let entries = entries(&[("main", &["a.js"])]);
    let builder = builder(&runtime);
    let first = builder.build(&entries).await;

    let touched: FxHashSet<ModuleId> = [id("c.js")].into_iter().collect();
    let second = builder.rebuild(&entries, Some(&first.graph), &touched).await;

    assert!(!ChangeSet::between(&first.graph, &second.graph).has_changes());
}
