use crate::core::common::types::Tick;

/// Transaction identity. Per the design notes, equality/hashing is over
/// `(name, start_tick, read_only)` and never over the mutable `blocked`/
/// `aborted` flags a [`Transaction`] carries — mutating those flags would
/// otherwise break hashing for any transaction stored as a map key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TxId {
    pub name: String,
    pub start_tick: Tick,
    pub read_only: bool,
}

impl std::fmt::Display for TxId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// A live transaction. Created on `begin`/`beginRO`, destroyed on commit
/// or abort; `aborted` is one-way — once set, the transaction is never
/// mutated again (it is removed from the transaction table on its next
/// `end`).
#[derive(Debug, Clone)]
pub struct Transaction {
    pub id: TxId,
    pub blocked: bool,
    pub aborted: bool,
}

impl Transaction {
    pub fn new(name: impl Into<String>, start_tick: Tick, read_only: bool) -> Self {
        Self {
            id: TxId { name: name.into(), start_tick, read_only },
            blocked: false,
            aborted: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.id.name
    }

    pub fn start_tick(&self) -> Tick {
        self.id.start_tick
    }

    pub fn read_only(&self) -> bool {
        self.id.read_only
    }
}
