//! Development session: watch, rebuild incrementally, publish updates.
//!
//! ```text
//! notify ─▶ FileWatcher ─(batched paths)─▶ DevSession ─▶ Bundler::rebuild
//!                                              │
//!                                              └─▶ DevState (status, last good snapshot, updates)
//! ```

mod overlay;
mod session;
mod state;
mod watcher;

use serde::Serialize;
use sheaf_bundler::{BuildError, BuildSnapshot, ReloadReason};
use sheaf_graph::ModuleId;

pub use overlay::{Overlay, html_escape};
pub use session::{DevSession, OVERLAY_FILE};
pub use state::{DevState, SessionStatus};
pub use watcher::FileWatcher;

/// Outcome of one completed rebuild cycle, as pushed to connected clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DevUpdate {
    pub cycle: u64,
    pub success: bool,
    /// Modules whose content changed since the last good build, sorted.
    pub changed: Vec<ModuleId>,
    pub full_reload: bool,
    #[serde(flatten)]
    pub reason: Option<ReloadReason>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failed_modules: Vec<ModuleId>,
    pub duration_ms: u64,
}

impl DevUpdate {
    pub(crate) fn built(cycle: u64, snapshot: &BuildSnapshot) -> Self {
        let (changed, full_reload, reason) = match &snapshot.update {
            Some(update) => (
                update.changed.clone(),
                update.is_full_reload(),
                update.full_reload.clone(),
            ),
            // First good build: clients have nothing to patch.
            None => (Vec::new(), true, None),
        };
        Self {
            cycle,
            success: true,
            changed,
            full_reload,
            reason,
            errors: Vec::new(),
            failed_modules: Vec::new(),
            duration_ms: snapshot.duration.as_millis() as u64,
        }
    }

    pub(crate) fn failed(cycle: u64, err: &BuildError, overlay: &Overlay, duration_ms: u64) -> Self {
        Self {
            cycle,
            success: false,
            changed: Vec::new(),
            full_reload: false,
            reason: None,
            errors: err.leaves().iter().map(ToString::to_string).collect(),
            failed_modules: overlay.modules.clone(),
            duration_ms,
        }
    }
}
