//! Liveness guard for event delivery.

use std::sync::atomic::{AtomicBool, Ordering};

/// Gates state-transition delivery on session liveness.
///
/// The flag starts released, is raised when the session begins running and
/// lowered again at teardown. Deliveries checked against a released guard
/// are dropped, never queued.
#[derive(Debug, Default)]
pub struct SafeDispatcher {
    live: AtomicBool,
}

impl SafeDispatcher {
    pub fn new() -> Self {
        Self {
            live: AtomicBool::new(false),
        }
    }

    pub fn activate(&self) {
        self.live.store(true, Ordering::SeqCst);
    }

    pub fn release(&self) {
        self.live.store(false, Ordering::SeqCst);
    }

    pub fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }
}
