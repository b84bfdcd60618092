//! One-way gate flipped when the host asks the enclave to stop.

use std::sync::atomic::{AtomicBool, Ordering};

/// Checked at the top of every façade entry point.  Once stopped, stays
/// stopped.
#[derive(Debug, Default)]
pub struct StopControl {
    stopping: AtomicBool,
}

impl StopControl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.stopping.store(true, Ordering::SeqCst);
    }

    pub fn is_stopping(&self) -> bool {
        self.stopping.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::StopControl;

    #[test]
    fn test_stop_is_sticky() {
        let ctl = StopControl::new();
        assert!(!ctl.is_stopping());
        ctl.stop();
        assert!(ctl.is_stopping());
        // idempotent
        ctl.stop();
        assert!(ctl.is_stopping());
    }
}
