//! Error types for the `longpoll` crate.
//!
//! Follows the same pattern as the other crates with a root Error struct and
//! error kind enums.

use std::error::Error as StdError;
use std::fmt;

/// Top-level error type for the long-poll engine.
#[derive(Debug)]
pub struct Error {
    pub source: Option<Box<dyn StdError + Send + Sync>>,
    pub error_kind: ErrorKind,
}

/// Ways a listen call can end without a batch or heartbeat.
#[derive(Debug, PartialEq)]
pub enum ErrorKind {
    /// The caller must not listen. The engine has already evicted the
    /// session's queue when it knew which session was asking.
    Unauthorized(UnauthorizedReason),
    /// The first drained event does not follow the caller's checkpoint.
    /// The caller should listen again without a checkpoint.
    OutOfSync { expected: u64, received: u64 },
    /// The cancellation future passed to `listen_until` resolved first.
    Cancelled,
}

#[derive(Debug, PartialEq, Clone, Copy)]
pub enum UnauthorizedReason {
    MissingSession,
    NotAllowed,
    NotAlive,
}

impl Error {
    pub fn kind(&self) -> &ErrorKind {
        &self.error_kind
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.error_kind {
            ErrorKind::Unauthorized(reason) => write!(f, "Unauthorized listen: {reason:?}"),
            ErrorKind::OutOfSync { expected, received } => write!(
                f,
                "Event stream out of sync: expected event {expected}, received {received}"
            ),
            ErrorKind::Cancelled => write!(f, "Listen cancelled"),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn StdError + 'static))
    }
}

/// Helper function to create unauthorized errors.
pub fn unauthorized(reason: UnauthorizedReason) -> Error {
    Error {
        source: None,
        error_kind: ErrorKind::Unauthorized(reason),
    }
}

/// Helper function to create out-of-sync errors.
pub fn out_of_sync(expected: u64, received: u64) -> Error {
    Error {
        source: None,
        error_kind: ErrorKind::OutOfSync { expected, received },
    }
}

/// Helper function to create cancellation errors.
pub fn cancelled() -> Error {
    Error {
        source: None,
        error_kind: ErrorKind::Cancelled,
    }
}
