//! Failure classification shared by every subsystem.
//!
//! Each error type reports a [`Severity`]. Infrastructure that is unavailable
//! (a store connection, an embedding model, a closed handle) is fatal and
//! propagates. Malformed per-item input (one unreadable file, one ambiguous
//! name, one failed API call) is recoverable: callers log it and move on.

use std::fmt;

/// How a caller should react to an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Abort the current operation.
    Fatal,
    /// Log, skip the item, continue.
    Recoverable,
}

impl Severity {
    pub fn is_fatal(self) -> bool {
        matches!(self, Severity::Fatal)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fatal => write!(f, "fatal"),
            Self::Recoverable => write!(f, "recoverable"),
        }
    }
}
