//! Cooperative cancellation shared between the orchestrator and a running export.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use newscut_common::error::{NewscutError, NewscutResult};

/// Cloneable handle to a shared stop flag.
///
/// The capture loop polls it at each checkpoint (frame tick, sink push,
/// finalize, transcode progress line, phase change).
#[derive(Debug, Clone, Default)]
pub struct CancelFlag {
    stop_flag: Arc<AtomicBool>,
}

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.stop_flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.stop_flag.load(Ordering::SeqCst)
    }

    /// Checkpoint: `Err(Cancelled)` once cancellation was requested.
    pub fn check(&self) -> NewscutResult<()> {
        if self.is_cancelled() {
            Err(NewscutError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Clear the flag before the next run.
    pub fn reset(&self) {
        self.stop_flag.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_state() {
        let flag = CancelFlag::new();
        let handle = flag.clone();
        assert!(flag.check().is_ok());

        handle.cancel();
        assert!(flag.is_cancelled());
        assert!(flag.check().unwrap_err().is_cancelled());

        flag.reset();
        assert!(!handle.is_cancelled());
    }
}
