//! Immutable module graph snapshots.

use std::collections::VecDeque;
use std::sync::Arc;

use indexmap::{IndexMap, IndexSet};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::module::{ImportKind, Module};
use crate::module_id::ModuleId;

/// Edge pointing back at an importer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependent {
    pub importer: ModuleId,
    pub kind: ImportKind,
}

/// One build's view of the module graph.
///
/// A snapshot is never mutated. Rebuilds produce a new snapshot, sharing unchanged
/// modules with the previous one through `Arc`.
#[derive(Debug, Clone, Default)]
pub struct ModuleGraph {
    modules: IndexMap<ModuleId, Arc<Module>>,
    entries: IndexMap<String, Vec<ModuleId>>,
    dependents: FxHashMap<ModuleId, Vec<Dependent>>,
}

impl ModuleGraph {
    /// Assemble a snapshot. Modules are stored sorted by id.
    pub fn new(
        entries: IndexMap<String, Vec<ModuleId>>,
        modules: impl IntoIterator<Item = Arc<Module>>,
    ) -> Self {
        let mut modules: IndexMap<ModuleId, Arc<Module>> = modules
            .into_iter()
            .map(|module| (module.id.clone(), module))
            .collect();
        modules.sort_keys();

        let mut dependents: FxHashMap<ModuleId, Vec<Dependent>> = FxHashMap::default();
        for module in modules.values() {
            for (target, kind) in module.dependencies() {
                let edges = dependents.entry(target.clone()).or_default();
                let edge = Dependent {
                    importer: module.id.clone(),
                    kind,
                };
                if !edges.contains(&edge) {
                    edges.push(edge);
                }
            }
        }

        Self {
            modules,
            entries,
            dependents,
        }
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    pub fn contains(&self, id: &ModuleId) -> bool {
        self.modules.contains_key(id)
    }

    pub fn module(&self, id: &ModuleId) -> Option<&Arc<Module>> {
        self.modules.get(id)
    }

    /// All modules, sorted by id.
    pub fn modules(&self) -> impl Iterator<Item = &Arc<Module>> {
        self.modules.values()
    }

    pub fn ids(&self) -> impl Iterator<Item = &ModuleId> {
        self.modules.keys()
    }

    /// Entry name to root modules, in declaration order.
    pub fn entries(&self) -> &IndexMap<String, Vec<ModuleId>> {
        &self.entries
    }

    /// Resolved imports of `id` that exist in this snapshot.
    pub fn dependencies<'a>(
        &'a self,
        id: &ModuleId,
    ) -> impl Iterator<Item = (&'a ModuleId, ImportKind)> + 'a {
        self.modules
            .get(id)
            .into_iter()
            .flat_map(|module| module.dependencies())
            .filter(|(target, _)| self.modules.contains_key(*target))
    }

    pub fn dependents(&self, id: &ModuleId) -> &[Dependent] {
        self.dependents.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Modules reachable from `roots` over non-dynamic edges, in BFS order.
    pub fn static_closure<'a>(
        &self,
        roots: impl IntoIterator<Item = &'a ModuleId>,
    ) -> IndexSet<ModuleId> {
        self.closure(roots, |kind| kind.is_static())
    }

    /// Modules reachable from `roots` over every edge kind.
    pub fn full_closure<'a>(&self, roots: impl IntoIterator<Item = &'a ModuleId>) -> IndexSet<ModuleId> {
        self.closure(roots, |_| true)
    }

    fn closure<'a>(
        &self,
        roots: impl IntoIterator<Item = &'a ModuleId>,
        follow: impl Fn(ImportKind) -> bool,
    ) -> IndexSet<ModuleId> {
        let mut seen = IndexSet::new();
        let mut queue: VecDeque<ModuleId> = VecDeque::new();
        for root in roots {
            if self.contains(root) && seen.insert(root.clone()) {
                queue.push_back(root.clone());
            }
        }

        while let Some(current) = queue.pop_front() {
            for (target, kind) in self.dependencies(&current) {
                if follow(kind) && seen.insert(target.clone()) {
                    queue.push_back(target.clone());
                }
            }
        }
        seen
    }

    /// Targets of dynamic imports, in first-seen order over sorted modules.
    pub fn dynamic_targets(&self) -> IndexSet<ModuleId> {
        let mut targets = IndexSet::new();
        for module in self.modules.values() {
            for (target, kind) in module.dependencies() {
                if kind == ImportKind::Dynamic && self.contains(target) {
                    targets.insert(target.clone());
                }
            }
        }
        targets
    }

    /// `changed` plus every module that imports one of them, transitively, over
    /// static and dynamic edges alike.
    pub fn ancestors<'a>(
        &self,
        changed: impl IntoIterator<Item = &'a ModuleId>,
    ) -> FxHashSet<ModuleId> {
        let mut affected: FxHashSet<ModuleId> = FxHashSet::default();
        let mut to_visit: Vec<ModuleId> = Vec::new();
        for id in changed {
            if affected.insert(id.clone()) {
                to_visit.push(id.clone());
            }
        }

        while let Some(id) = to_visit.pop() {
            for dependent in self.dependents(&id) {
                if affected.insert(dependent.importer.clone()) {
                    to_visit.push(dependent.importer.clone());
                }
            }
        }
        affected
    }

    /// Entry names whose full closure contains any of `ids`.
    pub fn entries_containing(&self, ids: &FxHashSet<ModuleId>) -> Vec<String> {
        self.entries
            .iter()
            .filter(|(_, roots)| {
                self.full_closure(roots.iter())
                    .iter()
                    .any(|id| ids.contains(id))
            })
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Modules that are placeholders for unresolved specifiers.
    pub fn stubs(&self) -> impl Iterator<Item = &Arc<Module>> {
        self.modules.values().filter(|module| module.is_stub)
    }
}
