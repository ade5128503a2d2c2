// Re-checked condition wait shared by the monitor buffer and the semaphore.
use std::time::Instant;

use parking_lot::{Condvar, MutexGuard};

use crate::cancel::CancelToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WaitOutcome {
    /// The predicate no longer blocks; the guard is held and the caller may proceed.
    Ready,
    TimedOut,
    Cancelled,
}

/// Blocks on `condvar` while `blocked` holds for the guarded state.
///
/// The predicate is evaluated under the lock on entry and after every wakeup,
/// so spurious wakeups and lost races against other waiters just loop. The
/// predicate is checked before the deadline and the token: a waiter that can
/// proceed always does.
pub(crate) fn wait_while<S>(
    condvar: &Condvar,
    guard: &mut MutexGuard<'_, S>,
    deadline: Option<Instant>,
    cancel: &CancelToken,
    mut blocked: impl FnMut(&S) -> bool,
) -> WaitOutcome {
    loop {
        if !blocked(&**guard) {
            return WaitOutcome::Ready;
        }
        if cancel.is_cancelled() {
            return WaitOutcome::Cancelled;
        }
        let now = Instant::now();
        if deadline.map_or(false, |d| now >= d) {
            return WaitOutcome::TimedOut;
        }
        match cancel.wake_at(deadline, now) {
            Some(at) => {
                condvar.wait_until(guard, at);
            }
            None => condvar.wait(guard),
        }
    }
}
