// Per-operation activity trace, emitted at TRACE level
use pbuf_core::{Operation, Strategy};

use crate::wait::WaitOutcome;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Outcome {
    Done,
    /// add/remove found the buffer full/empty
    Unavailable,
    TimedOut,
    Cancelled,
}

impl Outcome {
    fn as_str(&self) -> &'static str {
        match self {
            Outcome::Done => "done",
            Outcome::Unavailable => "unavailable",
            Outcome::TimedOut => "timeout",
            Outcome::Cancelled => "cancelled",
        }
    }
}

impl From<WaitOutcome> for Outcome {
    fn from(outcome: WaitOutcome) -> Self {
        match outcome {
            WaitOutcome::Ready => Outcome::Done,
            WaitOutcome::TimedOut => Outcome::TimedOut,
            WaitOutcome::Cancelled => Outcome::Cancelled,
        }
    }
}

pub(crate) fn record(strategy: Strategy, op: Operation, outcome: Outcome, len: usize) {
    tracing::trace!(
        strategy = strategy.as_str(),
        op = op.as_str(),
        outcome = outcome.as_str(),
        len,
        "buffer activity"
    );
}
