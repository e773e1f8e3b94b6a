//! The rebuild loop.
//!
//! One cycle runs at a time. Changes arriving mid-cycle mark it stale: its result
//! is thrown away and a new cycle starts at once with everything touched since the
//! last good build. A failed cycle keeps the last good snapshot and waits for the
//! next change; the modules it touched stay queued until a cycle succeeds.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use rustc_hash::FxHashSet;
use sheaf_bundler::{BuildError, BuildSnapshot, Bundler, writer};
use sheaf_graph::ModuleId;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::{DevState, DevUpdate, Overlay, SessionStatus};

/// File written next to the bundles while the last cycle is failing.
pub const OVERLAY_FILE: &str = "__sheaf_error.html";

pub struct DevSession {
    bundler: Bundler,
    state: Arc<DevState>,
    root: PathBuf,
    overlay_file: Option<PathBuf>,
}

impl DevSession {
    pub fn new(bundler: Bundler, state: Arc<DevState>) -> Self {
        let root = bundler.profile().root.clone();
        Self {
            bundler,
            state,
            root,
            overlay_file: None,
        }
    }

    /// Also write the error overlay to [`OVERLAY_FILE`] in the output directory.
    pub fn write_overlay(mut self, enabled: bool) -> Self {
        self.overlay_file = enabled.then(|| self.bundler.profile().output_dir().join(OVERLAY_FILE));
        self
    }

    pub fn state(&self) -> &Arc<DevState> {
        &self.state
    }

    /// Build once, then rebuild on every batch from `changes` until `shutdown`
    /// resolves or the change stream ends.
    pub async fn run<F>(self, mut changes: mpsc::Receiver<Vec<PathBuf>>, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        let mut cycle = 0u64;
        // Touched since the last good build.
        let mut carried: FxHashSet<ModuleId> = FxHashSet::default();
        // Arrived since the current cycle started.
        let mut pending: FxHashSet<ModuleId> = FxHashSet::default();
        let mut closed = false;
        let mut run_now = true;

        loop {
            if !run_now {
                if closed {
                    break;
                }
                tokio::select! {
                    _ = &mut shutdown => break,
                    batch = changes.recv() => match batch {
                        Some(paths) => {
                            self.absorb(&mut pending, paths);
                            if pending.is_empty() {
                                continue;
                            }
                        }
                        None => break,
                    },
                }
            }
            run_now = false;

            cycle += 1;
            carried.extend(pending.drain());
            self.state.set_status(SessionStatus::Building { cycle, stale: false });
            debug!(cycle, touched = carried.len(), "cycle started");

            let started = Instant::now();
            let previous = self.state.last_good();
            let mut stale = false;

            let outcome = {
                let build = self.build(previous.as_deref(), &carried);
                tokio::pin!(build);
                loop {
                    tokio::select! {
                        result = &mut build => break Some(result),
                        _ = &mut shutdown => break None,
                        batch = changes.recv(), if !closed => match batch {
                            Some(paths) => {
                                self.absorb(&mut pending, paths);
                                if !pending.is_empty() && !stale {
                                    stale = self.state.mark_stale();
                                    debug!(cycle, "newer changes arrived; cycle is stale");
                                }
                            }
                            None => closed = true,
                        },
                    }
                }
            };
            let Some(result) = outcome else {
                break;
            };

            if stale {
                debug!(cycle, "discarding stale result");
                run_now = true;
                continue;
            }

            match result {
                Ok(snapshot) => {
                    carried.clear();
                    self.succeed(cycle, snapshot);
                }
                Err(err) => self.fail(cycle, &err, started.elapsed().as_millis() as u64),
            }
        }

        self.state.set_status(SessionStatus::ShutDown);
        info!("development session stopped");
    }

    async fn build(
        &self,
        previous: Option<&BuildSnapshot>,
        touched: &FxHashSet<ModuleId>,
    ) -> sheaf_bundler::Result<BuildSnapshot> {
        match previous {
            Some(snapshot) => self.bundler.rebuild(Some(snapshot), touched).await,
            None => self.bundler.build().await,
        }
    }

    fn absorb(&self, pending: &mut FxHashSet<ModuleId>, paths: Vec<PathBuf>) {
        for path in paths {
            match ModuleId::from_path(&self.root, &path) {
                Ok(id) => {
                    pending.insert(id);
                }
                Err(err) => debug!(path = %path.display(), "ignoring change: {err}"),
            }
        }
    }

    fn succeed(&self, cycle: u64, snapshot: BuildSnapshot) {
        let update = DevUpdate::built(cycle, &snapshot);
        match &update.reason {
            Some(reason) => info!(cycle, changed = update.changed.len(), "full reload: {reason}"),
            None => info!(cycle, changed = update.changed.len(), "rebuilt"),
        }
        for warning in &snapshot.warnings {
            warn!("{warning}");
        }

        self.state.set_last_good(Arc::new(snapshot));
        self.state.set_status(SessionStatus::Ready { overlay: None });
        if let Some(path) = &self.overlay_file {
            remove_overlay(path);
        }
        self.state.publish(update);
    }

    fn fail(&self, cycle: u64, err: &BuildError, duration_ms: u64) {
        warn!(cycle, "build failed: {err}");
        let overlay = Overlay::from_error(err);
        if let Some(path) = &self.overlay_file {
            if let Err(err) = writer::write_durable(path, overlay.to_html().as_bytes()) {
                warn!("cannot write error overlay: {err}");
            }
        }
        let update = DevUpdate::failed(cycle, err, &overlay, duration_ms);
        self.state.set_status(SessionStatus::Ready {
            overlay: Some(overlay),
        });
        self.state.publish(update);
    }
}

fn remove_overlay(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => debug!(path = %path.display(), "removed error overlay"),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
        Err(err) => warn!("cannot remove error overlay: {err}"),
    }
}
