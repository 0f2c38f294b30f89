//! §4.4 WaitList: the blocking graph of pending operations, deadlock
//! detection, and youngest-victim selection.

use crate::core::model::transaction::TxId;
use crate::core::trace::Operation;

/// A parked operation, enqueued when it could not proceed immediately.
/// Identity for de-duplication is `(tx, operation)`; `blocked_by` is the
/// ordered, de-duplicated list of transactions this one is waiting on.
#[derive(Debug, Clone)]
pub struct WaitObject {
    pub tx: TxId,
    pub op: Operation,
    pub blocked_by: Vec<TxId>,
}

impl WaitObject {
    fn same_identity(&self, tx: &TxId, op: &Operation) -> bool {
        &self.tx == tx && &self.op == op
    }
}

#[derive(Debug, Default)]
pub struct WaitList {
    entries: Vec<WaitObject>,
}

impl WaitList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a wait object unless an identical `(tx, op)` is already
    /// queued. `blocked_by` is de-duplicated on insert, preserving the
    /// first-seen order (insertion order is what makes the later FIFO
    /// retry scan fair).
    pub fn enqueue(&mut self, tx: TxId, op: Operation, blocked_by: Vec<TxId>) {
        if self.entries.iter().any(|e| e.same_identity(&tx, &op)) {
            return;
        }
        let mut deduped = Vec::new();
        for t in blocked_by {
            if !deduped.contains(&t) {
                deduped.push(t);
            }
        }
        self.entries.push(WaitObject { tx, op, blocked_by: deduped });
    }

    pub fn get_waitobj_of(&self, tx: &TxId) -> Option<&WaitObject> {
        self.entries.iter().find(|e| &e.tx == tx)
    }

    pub fn remove(&mut self, tx: &TxId, op: &Operation) {
        self.entries.retain(|e| !e.same_identity(tx, op));
    }

    pub fn remove_all_of(&mut self, tx: &TxId) {
        self.entries.retain(|e| &e.tx != tx);
    }

    pub fn list(&self) -> &[WaitObject] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// DFS over the "waits-for" edges. For every cycle found, the
    /// youngest transaction (largest `start_tick`) on the captured cycle
    /// path becomes a victim. Returns the deduplicated victim set; a
    /// transaction can be the youngest on more than one cycle but is only
    /// reported once.
    pub fn deadlock_detection(&self) -> Vec<TxId> {
        let mut victims: Vec<TxId> = Vec::new();
        let mut globally_visited: Vec<TxId> = Vec::new();

        for start in &self.entries {
            if globally_visited.contains(&start.tx) {
                continue;
            }
            let mut path = vec![start.tx.clone()];
            let mut visited_this_pass = Vec::new();
            if let Some(cycle) = self.find_cycle(&start.tx, &mut path, &mut visited_this_pass) {
                let victim = youngest_on(&cycle);
                if !victims.contains(&victim) {
                    victims.push(victim);
                }
            }
            for v in visited_this_pass {
                if !globally_visited.contains(&v) {
                    globally_visited.push(v);
                }
            }
        }
        victims
    }

    fn find_cycle(&self, waiting: &TxId, path: &mut Vec<TxId>, visited: &mut Vec<TxId>) -> Option<Vec<TxId>> {
        let Some(wo) = self.get_waitobj_of(waiting) else {
            return None;
        };
        visited.push(waiting.clone());

        for blocker in &wo.blocked_by {
            if path.contains(blocker) {
                let mut cycle = path.clone();
                cycle.push(blocker.clone());
                return Some(cycle);
            }
            path.push(blocker.clone());
            if let Some(cycle) = self.find_cycle(blocker, path, visited) {
                return Some(cycle);
            }
            path.pop();
        }
        None
    }
}

fn youngest_on(path: &[TxId]) -> TxId {
    path.iter()
        .max_by_key(|t| t.start_tick)
        .cloned()
        .unwrap_or_else(|| path[0].clone())
}
