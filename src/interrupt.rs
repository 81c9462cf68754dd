//! Cooperative cancellation shared between a signal handler and a run.
//!
//! A run polls [`Interrupt::is_requested`] between steps. While it sits in a
//! read that may never return it marks itself blocked, and a request that
//! arrives then tells the handler to end the process right away.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug, Default)]
pub struct Interrupt {
    requested: AtomicBool,
    blocked: AtomicBool,
}

impl Interrupt {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Record an interrupt. Returns `true` when nobody will poll for it in
    /// time: the run is blocked in a read, or an earlier request went
    /// unanswered.
    pub fn request(&self) -> bool {
        let already = self.requested.swap(true, Ordering::SeqCst);
        already || self.blocked.load(Ordering::SeqCst)
    }

    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }

    /// Run `f` marked as blocked.
    pub fn blocking<T>(&self, f: impl FnOnce() -> T) -> T {
        self.blocked.store(true, Ordering::SeqCst);
        let out = f();
        self.blocked.store(false, Ordering::SeqCst);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_request_while_running_is_polled() {
        let interrupt = Interrupt::new();
        assert!(!interrupt.is_requested());
        assert!(!interrupt.request());
        assert!(interrupt.is_requested());
    }

    #[test]
    fn second_request_asks_for_immediate_exit() {
        let interrupt = Interrupt::new();
        interrupt.request();
        assert!(interrupt.request());
    }

    #[test]
    fn request_while_blocked_asks_for_immediate_exit() {
        let interrupt = Interrupt::new();
        let exit_now = interrupt.blocking(|| interrupt.request());
        assert!(exit_now);
        assert!(!interrupt.blocking(|| false));
    }
}
