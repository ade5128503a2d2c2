// Core types shared by the buffer, the harness and the benchmark suite
use std::fmt;
use std::str::FromStr;

use crate::error::ParseError;

/// Synchronization strategy used to protect the ring storage.
/// Selected once, when the buffer is constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Strategy {
    /// One lock plus "not full" / "not empty" condition variables - code 0
    Monitor = 0,
    /// Empty-slot and full-slot counting semaphores plus a short lock - code 1
    Semaphore = 1,
}

impl Strategy {
    pub const ALL: [Strategy; 2] = [Strategy::Monitor, Strategy::Semaphore];

    pub fn from_u8(val: u8) -> Option<Self> {
        match val {
            0 => Some(Strategy::Monitor),
            1 => Some(Strategy::Semaphore),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Monitor => "monitor",
            Strategy::Semaphore => "semaphore",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Strategy {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "monitor" | "cond" | "condvar" => Ok(Strategy::Monitor),
            "semaphore" | "sem" => Ok(Strategy::Semaphore),
            other => other
                .parse::<u8>()
                .ok()
                .and_then(Strategy::from_u8)
                .ok_or_else(|| ParseError::new("strategy", other)),
        }
    }
}

/// The six operations of the buffer contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Put,
    Get,
    Offer,
    Poll,
    Add,
    Remove,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Put => "put",
            Operation::Get => "get",
            Operation::Offer => "offer",
            Operation::Poll => "poll",
            Operation::Add => "add",
            Operation::Remove => "remove",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which family of operations a producer or consumer uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AccessMode {
    /// `put` / `get`
    #[default]
    Blocking,
    /// `add` / `remove`, retried by the caller
    NonBlocking,
    /// `offer` / `poll` with a deadline, retried by the caller
    Timed,
}

impl AccessMode {
    pub const ALL: [AccessMode; 3] = [AccessMode::Blocking, AccessMode::NonBlocking, AccessMode::Timed];

    pub fn as_str(&self) -> &'static str {
        match self {
            AccessMode::Blocking => "blocking",
            AccessMode::NonBlocking => "non-blocking",
            AccessMode::Timed => "timed",
        }
    }

    /// Operation a producer in this mode calls.
    pub fn enqueue_op(&self) -> Operation {
        match self {
            AccessMode::Blocking => Operation::Put,
            AccessMode::NonBlocking => Operation::Add,
            AccessMode::Timed => Operation::Offer,
        }
    }

    /// Operation a consumer in this mode calls.
    pub fn dequeue_op(&self) -> Operation {
        match self {
            AccessMode::Blocking => Operation::Get,
            AccessMode::NonBlocking => Operation::Remove,
            AccessMode::Timed => Operation::Poll,
        }
    }
}

impl fmt::Display for AccessMode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccessMode {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "blocking" | "block" => Ok(AccessMode::Blocking),
            "non-blocking" | "nonblocking" | "non_blocking" | "try" => Ok(AccessMode::NonBlocking),
            "timed" | "timeout" | "deadline" => Ok(AccessMode::Timed),
            other => Err(ParseError::new("access mode", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strategy_accepts_names_and_numeric_codes() {
        assert_eq!("monitor".parse::<Strategy>().unwrap(), Strategy::Monitor);
        assert_eq!(" Semaphore ".parse::<Strategy>().unwrap(), Strategy::Semaphore);
        assert_eq!("0".parse::<Strategy>().unwrap(), Strategy::Monitor);
        assert_eq!("1".parse::<Strategy>().unwrap(), Strategy::Semaphore);
        assert_eq!(Strategy::from_u8(1), Some(Strategy::Semaphore));
        assert_eq!(Strategy::from_u8(7), None);

        let err = "spinlock".parse::<Strategy>().unwrap_err();
        assert_eq!(err.to_string(), "unknown strategy 'spinlock'");
    }

    #[test]
    fn strategy_display_round_trips() {
        for strategy in Strategy::ALL {
            assert_eq!(strategy.to_string().parse::<Strategy>().unwrap(), strategy);
        }
    }

    #[test]
    fn access_mode_maps_to_operations() {
        assert_eq!(AccessMode::Blocking.enqueue_op(), Operation::Put);
        assert_eq!(AccessMode::NonBlocking.dequeue_op(), Operation::Remove);
        assert_eq!(AccessMode::Timed.enqueue_op(), Operation::Offer);
        assert_eq!("non-blocking".parse::<AccessMode>().unwrap(), AccessMode::NonBlocking);
        assert!("eventually".parse::<AccessMode>().is_err());
    }
}
