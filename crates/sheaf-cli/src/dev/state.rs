//! Shared state of the development session.
//!
//! The session task is the only writer. Readers (the terminal printer, tests,
//! any transport pushing updates to clients) take short read locks or subscribe
//! to the update channel.

use std::sync::Arc;

use parking_lot::RwLock;
use sheaf_bundler::BuildSnapshot;
use tokio::sync::broadcast;

use super::{DevUpdate, Overlay};

/// Where the session is in its cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionStatus {
    /// Nothing built yet.
    Idle,
    /// A cycle is running. `stale` is set once a newer change arrives; its result
    /// will be discarded.
    Building { cycle: u64, stale: bool },
    /// Waiting for changes. `overlay` is set when the last cycle failed.
    Ready { overlay: Option<Overlay> },
    ShutDown,
}

impl SessionStatus {
    pub fn is_building(&self) -> bool {
        matches!(self, SessionStatus::Building { .. })
    }

    pub fn overlay(&self) -> Option<&Overlay> {
        match self {
            SessionStatus::Ready { overlay } => overlay.as_ref(),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub struct DevState {
    status: RwLock<SessionStatus>,
    last_good: RwLock<Option<Arc<BuildSnapshot>>>,
    updates: broadcast::Sender<DevUpdate>,
}

impl DevState {
    /// Updates a slow subscriber may fall behind before it starts missing some.
    pub const UPDATE_BACKLOG: usize = 64;

    pub fn new() -> Self {
        let (updates, _) = broadcast::channel(Self::UPDATE_BACKLOG);
        Self {
            status: RwLock::new(SessionStatus::Idle),
            last_good: RwLock::new(None),
            updates,
        }
    }

    pub fn status(&self) -> SessionStatus {
        self.status.read().clone()
    }

    pub(crate) fn set_status(&self, status: SessionStatus) {
        *self.status.write() = status;
    }

    /// Flag the running cycle as superseded. Returns false when nothing is building.
    pub(crate) fn mark_stale(&self) -> bool {
        match &mut *self.status.write() {
            SessionStatus::Building { stale, .. } => {
                *stale = true;
                true
            }
            _ => false,
        }
    }

    /// Snapshot of the last successful cycle. Survives failed cycles.
    pub fn last_good(&self) -> Option<Arc<BuildSnapshot>> {
        self.last_good.read().clone()
    }

    pub(crate) fn set_last_good(&self, snapshot: Arc<BuildSnapshot>) {
        *self.last_good.write() = Some(snapshot);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DevUpdate> {
        self.updates.subscribe()
    }

    /// Push an update to every subscriber. Having none is not an error.
    pub(crate) fn publish(&self, update: DevUpdate) -> usize {
        self.updates.send(update).unwrap_or(0)
    }
}

impl Default for DevState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stale_flag_only_applies_while_building() {
        let state = DevState::new();
        assert!(!state.mark_stale());
        assert_eq!(state.status(), SessionStatus::Idle);

        state.set_status(SessionStatus::Building {
            cycle: 3,
            stale: false,
        });
        assert!(state.mark_stale());
        assert_eq!(
            state.status(),
            SessionStatus::Building {
                cycle: 3,
                stale: true
            }
        );
    }

    #[test]
    fn publishing_without_subscribers_is_fine() {
        let state = DevState::new();
        let update = DevUpdate {
            cycle: 1,
            success: true,
            changed: Vec::new(),
            full_reload: true,
            reason: None,
            errors: Vec::new(),
            failed_modules: Vec::new(),
            duration_ms: 0,
        };
        assert_eq!(state.publish(update.clone()), 0);

        let mut rx = state.subscribe();
        assert_eq!(state.publish(update.clone()), 1);
        assert_eq!(rx.try_recv().unwrap(), update);
    }
}
