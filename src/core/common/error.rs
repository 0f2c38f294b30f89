//! Error types for the simulator.
//!
//! `SimError` is the only error type the crate exposes. The core state
//! machines (`Site`, `DataManager`, `TransactionManager`, `WaitList`) never
//! return it: their fallible paths are modeled with the spec's own
//! `ResultType`/blocker lists, since no internal error is surfaced to trace
//! output except the visible Abort/Commit/block messages. `SimError` is
//! raised only by the trace reader and the binary entry point.

use std::fmt;

#[derive(Debug)]
pub enum SimError {
    /// The trace file could not be opened or read.
    Io(std::io::Error),
    /// A trace line looked like an operation call but could not be
    /// tokenized (unbalanced parens). Distinct from an unrecognized
    /// `op_name`, which is silently skipped per the input format.
    MalformedLine(String),
    /// `fail`/`recover`/`dump(x)` named a site or variable outside the
    /// configured topology.
    UnknownSite(String),
    UnknownVariable(String),
}

impl fmt::Display for SimError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::MalformedLine(line) => write!(f, "malformed trace line: {line}"),
            Self::UnknownSite(s) => write!(f, "unknown site: {s}"),
            Self::UnknownVariable(v) => write!(f, "unknown variable: {v}"),
        }
    }
}

impl std::error::Error for SimError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::MalformedLine(_) | Self::UnknownSite(_) | Self::UnknownVariable(_) => None,
        }
    }
}

impl From<std::io::Error> for SimError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}
