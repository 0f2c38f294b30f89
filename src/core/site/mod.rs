//! §4.1 Site: per-site lock table, committed-value store, uncommitted
//! write buffer, fail/recover lifecycle, and read-only snapshot store.

use std::collections::{HashMap, HashSet};

use crate::core::common::types::{SiteId, Tick};
use crate::core::model::lock::{Lock, LockKind};
use crate::core::model::transaction::{Transaction, TxId};
use crate::core::model::variable::Variable;

#[derive(Debug)]
pub struct Site {
    pub id: SiteId,
    pub active: bool,
    pub recovered_at: Tick,
    committed: HashMap<String, Variable>,
    pending_writes: HashMap<TxId, HashMap<String, i64>>,
    lock_table: HashMap<String, Vec<Lock>>,
    ro_snapshots: HashMap<String, HashMap<String, Variable>>,
    current_readers: HashSet<TxId>,
    /// Present to mirror the data model's `lock_lineup` field and cleared
    /// on commit/abort/fail like the rest of a transaction's footprint at
    /// this site. Nothing in the spec's operation list populates it (the
    /// originating script defines the equivalent populate method but never
    /// calls it); `read_lock_blockers` still consults it for parity, but
    /// it is always empty in practice — reader-starvation prevention is
    /// carried entirely by the `queued` flag on held locks (§4.5).
    lock_lineup: HashMap<String, Vec<TxId>>,
}

impl Site {
    pub fn new(id: SiteId, variables: Vec<Variable>) -> Self {
        let committed = variables.into_iter().map(|v| (v.name.clone(), v)).collect();
        Self {
            id,
            active: true,
            recovered_at: -1,
            committed,
            pending_writes: HashMap::new(),
            lock_table: HashMap::new(),
            ro_snapshots: HashMap::new(),
            current_readers: HashSet::new(),
            lock_lineup: HashMap::new(),
        }
    }

    pub fn contains(&self, x: &str) -> bool {
        self.committed.contains_key(x)
    }

    pub fn committed_value(&self, x: &str) -> Option<&Variable> {
        self.committed.get(x)
    }

    /// Variables sorted by numeric suffix, for `dump` formatting.
    pub fn committed_sorted(&self) -> Vec<&Variable> {
        let mut vars: Vec<&Variable> = self.committed.values().collect();
        vars.sort_by_key(|v| variable_index(&v.name));
        vars
    }

    pub fn available_to_read(&self, tx: &Transaction, x: &str) -> bool {
        match self.committed.get(x) {
            Some(v) => self.recovered_at <= tx.start_tick() && v.last_commit_tick >= self.recovered_at,
            None => false,
        }
    }

    pub fn available_to_read_only(&self, tx: &Transaction) -> bool {
        self.recovered_at <= tx.start_tick()
    }

    /// Blockers for a READ by `tx` on `x`; marks each blocking lock
    /// `queued` as a side effect.
    pub fn read_lock_blockers(&mut self, tx: &TxId, x: &str) -> Vec<TxId> {
        let mut blockers = Vec::new();
        if let Some(locks) = self.lock_table.get_mut(x) {
            for lock in locks.iter_mut() {
                let is_other_write = lock.kind == LockKind::Write && &lock.holder != tx;
                let is_queued_read = lock.kind == LockKind::Read && lock.queued;
                if is_other_write || is_queued_read {
                    lock.queued = true;
                    push_unique(&mut blockers, lock.holder.clone());
                }
            }
        }
        if let Some(waiters) = self.lock_lineup.get(x) {
            for waiter in waiters {
                if waiter != tx {
                    push_unique(&mut blockers, waiter.clone());
                }
            }
        }
        blockers
    }

    /// Blockers for a WRITE by `tx` on `x`; marks each blocking lock
    /// `queued` as a side effect.
    pub fn write_lock_blockers(&mut self, tx: &TxId, x: &str) -> Vec<TxId> {
        let mut blockers = Vec::new();
        if let Some(locks) = self.lock_table.get_mut(x) {
            for lock in locks.iter_mut() {
                let is_other_holder = &lock.holder != tx;
                let is_own_queued_read = lock.kind == LockKind::Read && &lock.holder == tx && lock.queued;
                if is_other_holder || is_own_queued_read {
                    lock.queued = true;
                    push_unique(&mut blockers, lock.holder.clone());
                }
            }
        }
        blockers
    }

    /// Attempts to acquire `kind` for `tx` on `x`. Returns the blockers
    /// (empty on success). On success, an existing READ held by `tx` is
    /// replaced by a WRITE (upgrade); a WRITE held by `tx` already
    /// subsumes a requested READ (no-op).
    pub fn lock(&mut self, tx: &TxId, x: &str, kind: LockKind) -> Vec<TxId> {
        let blockers = match kind {
            LockKind::Read => self.read_lock_blockers(tx, x),
            LockKind::Write => self.write_lock_blockers(tx, x),
        };
        if !blockers.is_empty() {
            return blockers;
        }

        let locks = self.lock_table.entry(x.to_string()).or_default();
        if locks.iter().any(|l| l.same_kind_and_holder(kind, tx)) {
            return blockers;
        }
        if kind == LockKind::Read && locks.iter().any(|l| l.same_kind_and_holder(LockKind::Write, tx)) {
            // WRITE already held subsumes the requested READ.
            return blockers;
        }
        if kind == LockKind::Write {
            locks.retain(|l| !(l.kind == LockKind::Read && &l.holder == tx));
        }
        locks.push(Lock::new(kind, tx.clone()));
        blockers
    }

    pub fn read(&mut self, tx: &TxId, x: &str) -> Option<i64> {
        if let Some(pending) = self.pending_writes.get(tx) {
            if let Some(v) = pending.get(x) {
                return Some(*v);
            }
        }
        self.current_readers.insert(tx.clone());
        self.committed.get(x).map(|v| v.value)
    }

    pub fn read_only(&self, tx_name: &str, x: &str) -> Option<i64> {
        self.ro_snapshots.get(tx_name)?.get(x).map(|v| v.value)
    }

    pub fn write(&mut self, tx: &TxId, x: &str, value: i64) {
        self.pending_writes.entry(tx.clone()).or_default().insert(x.to_string(), value);
    }

    pub fn commit(&mut self, tx: &TxId, tick: Tick) {
        self.current_readers.remove(tx);
        if let Some(writes) = self.pending_writes.remove(tx) {
            for (x, value) in writes {
                let home_site = self.committed.get(&x).and_then(|v| v.home_site);
                self.committed.insert(x.clone(), Variable::committed(x, value, tick, home_site));
            }
        }
        self.ro_snapshots.remove(&tx.name);
        self.remove_from_lineup(tx);
        self.remove_locks_of(tx);
    }

    pub fn abort(&mut self, tx: &TxId) {
        self.current_readers.remove(tx);
        self.pending_writes.remove(tx);
        self.ro_snapshots.remove(&tx.name);
        self.remove_from_lineup(tx);
        self.remove_locks_of(tx);
    }

    pub fn capture_ro_snapshot(&mut self, tx_name: &str) {
        self.ro_snapshots.insert(tx_name.to_string(), self.committed.clone());
    }

    /// Transitions to `DOWN`. Every transaction currently reading or with
    /// a pending write at this site is marked aborted; readers, pending
    /// writes, the lock table, and the lineup are all cleared. RO
    /// snapshots are cleared too (the spec's chosen answer to the "does
    /// fail clear snapshots" open question — see DESIGN.md).
    pub fn fail(&mut self, live_transactions: &mut HashMap<TxId, Transaction>) {
        self.active = false;
        for tx_id in self.current_readers.drain() {
            if let Some(t) = live_transactions.get_mut(&tx_id) {
                t.aborted = true;
            }
        }
        for tx_id in self.pending_writes.keys() {
            if let Some(t) = live_transactions.get_mut(tx_id) {
                t.aborted = true;
            }
        }
        self.pending_writes.clear();
        self.lock_table.clear();
        self.lock_lineup.clear();
        self.ro_snapshots.clear();
    }

    /// Transitions to `ACTIVE`. The lock table stays empty; replicated
    /// variables here are unreadable (for non-RO reads) until a write to
    /// them commits at this site (enforced by `available_to_read`).
    pub fn recover(&mut self, tick: Tick) {
        self.active = true;
        self.recovered_at = tick;
    }

    fn remove_from_lineup(&mut self, tx: &TxId) {
        for waiters in self.lock_lineup.values_mut() {
            waiters.retain(|t| t != tx);
        }
    }

    fn remove_locks_of(&mut self, tx: &TxId) {
        for locks in self.lock_table.values_mut() {
            locks.retain(|l| &l.holder != tx);
        }
    }
}

fn push_unique(v: &mut Vec<TxId>, item: TxId) {
    if !v.contains(&item) {
        v.push(item);
    }
}

/// Parses the numeric suffix out of a variable name like `x12` -> `12`.
pub fn variable_index(name: &str) -> u32 {
    name.trim_start_matches(|c: char| !c.is_ascii_digit())
        .parse()
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn site_with(vars: &[(&str, i64)]) -> Site {
        let variables = vars
            .iter()
            .map(|(n, v)| Variable { name: (*n).to_string(), value: *v, last_commit_tick: -1, home_site: None })
            .collect();
        Site::new(SiteId(1), variables)
    }

    fn tx(name: &str, start: Tick, ro: bool) -> Transaction {
        Transaction::new(name, start, ro)
    }

    #[test]
    fn idempotent_locking_is_a_no_op() {
        let mut site = site_with(&[("x1", 10)]);
        let t1 = tx("T1", 0, false);
        assert!(site.lock(&t1.id, "x1", LockKind::Write).is_empty());
        // Re-acquiring the same (kind, holder) must not re-append or block.
        assert!(site.lock(&t1.id, "x1", LockKind::Write).is_empty());
        assert_eq!(site.lock_table.get("x1").unwrap().len(), 1);
    }

    #[test]
    fn write_blocks_on_other_writer() {
        let mut site = site_with(&[("x1", 10)]);
        let t1 = tx("T1", 0, false);
        let t2 = tx("T2", 1, false);
        assert!(site.lock(&t1.id, "x1", LockKind::Write).is_empty());
        let blockers = site.lock(&t2.id, "x1", LockKind::Write);
        assert_eq!(blockers, vec![t1.id.clone()]);
    }

    #[test]
    fn read_upgrade_to_write_same_holder() {
        let mut site = site_with(&[("x1", 10)]);
        let t1 = tx("T1", 0, false);
        assert!(site.lock(&t1.id, "x1", LockKind::Read).is_empty());
        assert!(site.lock(&t1.id, "x1", LockKind::Write).is_empty());
        let locks = site.lock_table.get("x1").unwrap();
        assert_eq!(locks.len(), 1);
        assert_eq!(locks[0].kind, LockKind::Write);
    }

    #[test]
    fn commit_moves_pending_write_to_committed_and_releases_locks() {
        let mut site = site_with(&[("x1", 10)]);
        let t1 = tx("T1", 0, false);
        assert!(site.lock(&t1.id, "x1", LockKind::Write).is_empty());
        site.write(&t1.id, "x1", 99);
        site.commit(&t1.id, 5);
        assert_eq!(site.committed_value("x1").unwrap().value, 99);
        assert_eq!(site.committed_value("x1").unwrap().last_commit_tick, 5);
        assert!(site.lock_table.get("x1").map_or(true, Vec::is_empty));
    }

    #[test]
    fn fail_aborts_readers_and_writers_and_clears_state() {
        let mut site = site_with(&[("x1", 10)]);
        let t1 = tx("T1", 0, false);
        let t2 = tx("T2", 1, false);
        site.read(&t1.id, "x1");
        site.write(&t2.id, "x1", 5);
        let mut live = HashMap::new();
        live.insert(t1.id.clone(), t1.clone());
        live.insert(t2.id.clone(), t2.clone());
        site.fail(&mut live);
        assert!(live.get(&t1.id).unwrap().aborted);
        assert!(live.get(&t2.id).unwrap().aborted);
        assert!(!site.active);
        assert!(site.lock_table.is_empty());
    }

    #[test]
    fn post_recovery_read_blocked_until_write_commits() {
        let mut site = site_with(&[("x2", 20)]);
        site.recover(5);
        let t_old = tx("T1", 0, false);
        assert!(!site.available_to_read(&t_old, "x2"));
        site.lock(&t_old.id, "x2", LockKind::Write);
        site.write(&t_old.id, "x2", 20);
        site.commit(&t_old.id, 6);
        let t_new = tx("T2", 7, false);
        assert!(site.available_to_read(&t_new, "x2"));
    }

    #[test]
    fn ro_snapshot_survives_until_fail() {
        let mut site = site_with(&[("x1", 10)]);
        site.capture_ro_snapshot("T1");
        assert_eq!(site.read_only("T1", "x1"), Some(10));
        let mut live = HashMap::new();
        site.fail(&mut live);
        assert_eq!(site.read_only("T1", "x1"), None);
    }
}
