//! Cooperative cancellation of waiting operations.
//!
//! Rust threads cannot be interrupted from outside, so a controller hands a
//! [`CancelToken`] to the threads it may want to stop and calls
//! [`CancelToken::cancel`] later. Every cancellable wait in this crate
//! re-checks its token at least once per [`CANCEL_POLL_INTERVAL`], so a
//! cancelled thread leaves a blocked `put`/`get`/`offer`/`poll` within that
//! interval, without having changed the buffer.
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Upper bound on how long a cancellable wait sleeps between token checks.
pub const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Shared cancellation flag. Clones observe the same flag.
#[derive(Debug, Clone)]
pub struct CancelToken {
    flag: Option<Arc<AtomicBool>>,
}

impl CancelToken {
    /// A token that can be cancelled.
    pub fn new() -> Self {
        CancelToken {
            flag: Some(Arc::new(AtomicBool::new(false))),
        }
    }

    /// A token that never fires. Waits holding it sleep without polling.
    pub const fn never() -> Self {
        CancelToken { flag: None }
    }

    /// Request cancellation. Has no effect on a [`CancelToken::never`] token.
    pub fn cancel(&self) {
        if let Some(flag) = &self.flag {
            flag.store(true, Ordering::Release);
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag
            .as_ref()
            .map_or(false, |flag| flag.load(Ordering::Acquire))
    }

    pub fn is_cancellable(&self) -> bool {
        self.flag.is_some()
    }

    /// When a waiter must wake up next: the deadline, or sooner if the token
    /// has to be re-checked. `None` means sleep until notified.
    pub(crate) fn wake_at(&self, deadline: Option<Instant>, now: Instant) -> Option<Instant> {
        if !self.is_cancellable() {
            return deadline;
        }
        let check = now + CANCEL_POLL_INTERVAL;
        Some(deadline.map_or(check, |d| d.min(check)))
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_the_flag() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
    }

    #[test]
    fn never_token_ignores_cancel() {
        let token = CancelToken::never();
        token.cancel();
        assert!(!token.is_cancelled());
        assert!(!token.is_cancellable());
    }

    #[test]
    fn wake_at_respects_deadline_and_poll_interval() {
        let now = Instant::now();
        let near = now + Duration::from_millis(1);
        let far = now + Duration::from_secs(5);

        assert_eq!(CancelToken::never().wake_at(None, now), None);
        assert_eq!(CancelToken::never().wake_at(Some(far), now), Some(far));

        let token = CancelToken::new();
        assert_eq!(token.wake_at(Some(near), now), Some(near));
        assert_eq!(token.wake_at(Some(far), now), Some(now + CANCEL_POLL_INTERVAL));
        assert_eq!(token.wake_at(None, now), Some(now + CANCEL_POLL_INTERVAL));
    }
}
