//! Cooperative cancellation for long-running graph algorithms.
//!
//! Algorithms poll [`CancelSignal::is_cancelled`] at iteration boundaries
//! (between BFS sources, power-iteration steps, local-moving sweeps).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Default)]
pub struct CancelSignal {
    flag: Option<Arc<AtomicBool>>,
    deadline: Option<Instant>,
}

impl CancelSignal {
    /// A signal that never fires.
    pub fn none() -> Self {
        Self::default()
    }

    /// A signal that fires once [`CancelSignal::cancel`] is called on it or any clone.
    pub fn new() -> Self {
        Self {
            flag: Some(Arc::new(AtomicBool::new(false))),
            deadline: None,
        }
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self::new().deadline_after(timeout)
    }

    pub fn deadline_after(mut self, timeout: Duration) -> Self {
        self.deadline = Some(Instant::now() + timeout);
        self
    }

    pub fn cancel(&self) {
        if let Some(flag) = &self.flag {
            flag.store(true, Ordering::Relaxed);
        }
    }

    pub fn is_cancelled(&self) -> bool {
        if let Some(flag) = &self.flag {
            if flag.load(Ordering::Relaxed) {
                return true;
            }
        }
        matches!(self.deadline, Some(deadline) if Instant::now() >= deadline)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_none_never_fires() {
        let signal = CancelSignal::none();
        signal.cancel();
        assert!(!signal.is_cancelled());
    }

    #[test]
    fn test_cancel_is_shared_between_clones() {
        let signal = CancelSignal::new();
        let observer = signal.clone();
        assert!(!observer.is_cancelled());
        signal.cancel();
        assert!(observer.is_cancelled());
    }

    #[test]
    fn test_deadline_fires() {
        let signal = CancelSignal::with_timeout(Duration::ZERO);
        assert!(signal.is_cancelled());

        let later = CancelSignal::with_timeout(Duration::from_secs(3600));
        assert!(!later.is_cancelled());
    }
}
