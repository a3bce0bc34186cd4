//! Cooperative, process-wide shutdown signal.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// The simulation's running flag.
///
/// Cloning shares the flag. Loops poll [`ShutdownSignal::is_running`] at each
/// iteration boundary; nothing is interrupted preemptively.
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    running: Arc<AtomicBool>,
}

impl ShutdownSignal {
    /// Creates a signal in the running state.
    pub fn new() -> Self {
        Self {
            running: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Returns true until shutdown has been triggered.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Flips the flag to stopped.
    ///
    /// Returns `true` only for the call that actually performed the flip.
    pub fn trigger(&self) -> bool {
        self.running
            .compare_exchange(true, false, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}
