//! Hot-update planning.
//!
//! A rebuild can be applied in place only when every changed module is isolated
//! from process-wide state. Anything else, or anything that cannot be proven safe,
//! becomes a full reload.

use serde::Serialize;
use sheaf_config::Pattern;
use sheaf_graph::{ChangeSet, ModuleGraph, ModuleId};

/// Why an update could not be applied in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "kebab-case")]
pub enum ReloadReason {
    /// Hot updates are switched off.
    HotDisabled,
    /// Modules were added or removed.
    Structural,
    /// The module writes to a global object.
    GlobalState { module: ModuleId },
    /// The module matches a configured full-reload pattern.
    Pattern { module: ModuleId, pattern: String },
}

impl std::fmt::Display for ReloadReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReloadReason::HotDisabled => f.write_str("hot updates are disabled"),
            ReloadReason::Structural => f.write_str("modules were added or removed"),
            ReloadReason::GlobalState { module } => {
                write!(f, "'{module}' writes to global state")
            }
            ReloadReason::Pattern { module, pattern } => {
                write!(f, "'{module}' matches full reload pattern '{pattern}'")
            }
        }
    }
}

/// Changed modules of one rebuild and how clients should apply them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HotUpdate {
    /// Directly changed modules, sorted.
    pub changed: Vec<ModuleId>,
    /// Invalidated modules: the changed ones plus every importer up to the entries.
    pub affected: usize,
    pub full_reload: Option<ReloadReason>,
}

impl HotUpdate {
    pub fn is_full_reload(&self) -> bool {
        self.full_reload.is_some()
    }
}

/// Decide how `changes` reach the client. `graph` is the snapshot after the change.
pub fn plan(changes: &ChangeSet, graph: &ModuleGraph, hot: bool, patterns: &[Pattern]) -> HotUpdate {
    let changed = changes.changed_ids();
    HotUpdate {
        full_reload: reload_reason(&changed, changes, graph, hot, patterns),
        affected: changes.affected_count(),
        changed,
    }
}

fn reload_reason(
    changed: &[ModuleId],
    changes: &ChangeSet,
    graph: &ModuleGraph,
    hot: bool,
    patterns: &[Pattern],
) -> Option<ReloadReason> {
    if !hot {
        return Some(ReloadReason::HotDisabled);
    }
    if changes.is_structural() {
        return Some(ReloadReason::Structural);
    }
    for id in changed {
        if let Some(pattern) = patterns.iter().find(|pattern| pattern.is_match(id.as_str())) {
            return Some(ReloadReason::Pattern {
                module: id.clone(),
                pattern: pattern.as_str().to_string(),
            });
        }
        // A changed module missing from the snapshot cannot be inspected.
        let unsafe_module = graph
            .module(id)
            .is_none_or(|module| module.has_global_state);
        if unsafe_module {
            return Some(ReloadReason::GlobalState { module: id.clone() });
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::sync::Arc;

    use indexmap::IndexMap;
    use sheaf_graph::Module;

    use super::*;

    fn graph(modules: &[(&str, &str)]) -> ModuleGraph {
        ModuleGraph::new(
            IndexMap::new(),
            modules.iter().map(|(id, source)| {
                Arc::new(Module::from_source(
                    ModuleId::new(id).unwrap(),
                    PathBuf::from(id),
                    source.as_bytes().to_vec(),
                ))
            }),
        )
    }

    #[test]
    fn isolated_change_is_partial() {
        let before = graph(&[("b.js", "export default 1;")]);
        let after = graph(&[("b.js", "export default 2;")]);
        let update = plan(&ChangeSet::between(&before, &after), &after, true, &[]);

        assert_eq!(update.changed, vec![ModuleId::new("b.js").unwrap()]);
        assert!(!update.is_full_reload());
    }

    #[test]
    fn global_writes_force_full_reload() {
        let before = graph(&[("store.js", "window.store = {};")]);
        let after = graph(&[("store.js", "window.store = { count: 1 };")]);
        let update = plan(&ChangeSet::between(&before, &after), &after, true, &[]);

        assert!(matches!(update.full_reload, Some(ReloadReason::GlobalState { .. })));
    }

    #[test]
    fn pattern_and_structure_force_full_reload() {
        let before = graph(&[("config.js", "export default 1;")]);
        let after = graph(&[("config.js", "export default 2;")]);
        let changes = ChangeSet::between(&before, &after);
        let patterns = [Pattern::new(r"config\.js$").unwrap()];
        assert!(matches!(
            plan(&changes, &after, true, &patterns).full_reload,
            Some(ReloadReason::Pattern { .. })
        ));

        let grown = graph(&[("config.js", "export default 1;"), ("new.js", "")]);
        let changes = ChangeSet::between(&before, &grown);
        assert_eq!(
            plan(&changes, &grown, true, &[]).full_reload,
            Some(ReloadReason::Structural)
        );
        assert_eq!(
            plan(&changes, &grown, false, &[]).full_reload,
            Some(ReloadReason::HotDisabled)
        );
    }
}
