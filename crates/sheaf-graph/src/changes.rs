//! Change detection between graph snapshots.
//!
//! Compares module content hashes of two snapshots and derives the invalidated
//! subgraph: the changed modules plus all their importers up to the entries.

use rustc_hash::FxHashSet;

use crate::graph::ModuleGraph;
use crate::module_id::ModuleId;

/// Modules that differ between two snapshots.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    /// Present in both snapshots with different content.
    pub modified: FxHashSet<ModuleId>,
    /// Only in the newer snapshot.
    pub added: FxHashSet<ModuleId>,
    /// Only in the older snapshot.
    pub removed: FxHashSet<ModuleId>,
    /// Modified and added modules plus their transitive importers in the newer
    /// snapshot.
    pub affected: FxHashSet<ModuleId>,
}

impl ChangeSet {
    /// Diff two snapshots.
    pub fn between(previous: &ModuleGraph, current: &ModuleGraph) -> Self {
        let mut modified = FxHashSet::default();
        let mut added = FxHashSet::default();

        for module in current.modules() {
            match previous.module(&module.id) {
                Some(old) if old.content_hash != module.content_hash => {
                    modified.insert(module.id.clone());
                }
                Some(_) => {}
                None => {
                    added.insert(module.id.clone());
                }
            }
        }

        let removed: FxHashSet<ModuleId> = previous
            .ids()
            .filter(|id| !current.contains(id))
            .cloned()
            .collect();

        let affected = current.ancestors(modified.iter().chain(added.iter()));

        Self {
            modified,
            added,
            removed,
            affected,
        }
    }

    pub fn has_changes(&self) -> bool {
        !self.modified.is_empty() || !self.added.is_empty() || !self.removed.is_empty()
    }

    /// Modules appeared or disappeared.
    pub fn is_structural(&self) -> bool {
        !self.added.is_empty() || !self.removed.is_empty()
    }

    /// Every directly changed module, sorted.
    pub fn changed_ids(&self) -> Vec<ModuleId> {
        let mut ids: Vec<ModuleId> = self
            .modified
            .iter()
            .chain(self.added.iter())
            .chain(self.removed.iter())
            .cloned()
            .collect();
        ids.sort();
        ids.dedup();
        ids
    }

    pub fn affected_count(&self) -> usize {
        self.affected.len()
    }

    /// Fold a later change set into this one.
    pub fn absorb(&mut self, later: ChangeSet) {
        for id in later.removed {
            if !self.added.remove(&id) {
                self.modified.remove(&id);
                self.removed.insert(id);
            }
        }
        for id in later.added {
            if self.removed.remove(&id) {
                self.modified.insert(id);
            } else {
                self.added.insert(id);
            }
        }
        for id in later.modified {
            if !self.added.contains(&id) {
                self.modified.insert(id);
            }
        }
        self.affected.extend(later.affected);
    }
}
