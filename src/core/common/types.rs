//! Small newtypes shared across the simulator's modules.

use std::fmt;

/// The simulator's single logical clock. Signed so that "never committed"
/// can be represented as `-1` per the data model's initial
/// `last_commit_tick`.
pub type Tick = i64;

/// A site identifier. Sites are numbered `1..=num_sites`; the newtype
/// keeps that numbering out of raw `usize` arithmetic at call sites.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SiteId(pub u32);

impl fmt::Display for SiteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
