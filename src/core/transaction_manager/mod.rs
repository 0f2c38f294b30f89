//! §4.3 TransactionManager: transaction lifecycle, request dispatch,
//! wait-queue integration, and end (commit/abort) semantics.

use std::collections::HashMap;

use crate::core::common::types::{SiteId, Tick};
use crate::core::data_manager::{site_index, DataManager, RouteResult};
use crate::core::model::transaction::{Transaction, TxId};
use crate::core::trace::Operation;
use crate::core::wait_list::WaitList;

/// Outcome of dispatching one operation, per §2/§7.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultType {
    Success,
    Blocked,
    Abort,
    /// The operation's transaction is absent or already aborted; elided.
    Stop,
}

pub struct TransactionManager {
    data_manager: DataManager,
    transactions: HashMap<TxId, Transaction>,
    /// At most one live `TxId` per name at a time (a name is reusable once
    /// its prior transaction has committed or aborted), so lookups by the
    /// trace's bare transaction name resolve through this index.
    active_by_name: HashMap<String, TxId>,
    wait_list: WaitList,
}

impl TransactionManager {
    pub fn new(data_manager: DataManager) -> Self {
        Self {
            data_manager,
            transactions: HashMap::new(),
            active_by_name: HashMap::new(),
            wait_list: WaitList::new(),
        }
    }

    pub fn data_manager(&self) -> &DataManager {
        &self.data_manager
    }

    pub fn wait_list(&self) -> &WaitList {
        &self.wait_list
    }

    pub fn transaction(&self, t: &str) -> Option<&Transaction> {
        self.active_by_name.get(t).and_then(|id| self.transactions.get(id))
    }

    pub fn begin(&mut self, t: &str, tick: Tick) {
        let tx = Transaction::new(t, tick, false);
        self.active_by_name.insert(t.to_string(), tx.id.clone());
        self.transactions.insert(tx.id.clone(), tx);
    }

    pub fn begin_ro(&mut self, t: &str, tick: Tick) {
        let tx = Transaction::new(t, tick, true);
        self.active_by_name.insert(t.to_string(), tx.id.clone());
        self.transactions.insert(tx.id.clone(), tx);
        self.data_manager.capture_ro_snapshot_everywhere(t);
    }

    pub fn fail_site(&mut self, id: SiteId) {
        self.data_manager.fail(id, &mut self.transactions);
    }

    pub fn recover_site(&mut self, id: SiteId, tick: Tick) {
        self.data_manager.recover(id, tick);
    }

    /// Returns the result alongside the value a successful read actually
    /// produced — `Site::read` resolves a transaction's own pending write
    /// before falling back to the committed store (§4.1), so the value
    /// reported here must come from that same resolution, not a separate
    /// committed-only lookup.
    pub fn read(&mut self, t: &str, x: &str, tick: Tick) -> (ResultType, Option<i64>) {
        let Some(tx) = self.transaction(t).cloned() else { return (ResultType::Stop, None) };
        if tx.aborted {
            return (ResultType::Stop, None);
        }

        if tx.read_only() {
            match self.data_manager.request_read_only(&tx, x) {
                Some(value) => (ResultType::Success, Some(value)),
                None => {
                    if site_index(x).is_none() {
                        // Replicated variable: per §4.3, enqueue rather
                        // than abort outright (a site recovering, or a
                        // write committing elsewhere, is what the spec
                        // models as the thing being waited on — even
                        // though a frozen RO snapshot never actually
                        // starts serving it, so this retries forever).
                        self.wait_list.enqueue(
                            tx.id.clone(),
                            Operation::Read { t: t.to_string(), x: x.to_string() },
                            Vec::new(),
                        );
                        (ResultType::Blocked, None)
                    } else {
                        self.mark_aborted(&tx.id);
                        (ResultType::Abort, None)
                    }
                }
            }
        } else {
            match self.data_manager.request_read(&tx, x, tick) {
                RouteResult::Ok(value) => (ResultType::Success, Some(value)),
                RouteResult::Blocked(blockers) => {
                    self.wait_list.enqueue(
                        tx.id.clone(),
                        Operation::Read { t: t.to_string(), x: x.to_string() },
                        blockers,
                    );
                    (ResultType::Blocked, None)
                }
            }
        }
    }

    pub fn write(&mut self, t: &str, x: &str, v: i64, tick: Tick) -> ResultType {
        let Some(tx) = self.transaction(t).cloned() else { return ResultType::Stop };
        if tx.aborted {
            return ResultType::Stop;
        }

        match self.data_manager.request_write(&tx, x, v, tick) {
            RouteResult::Ok(()) => ResultType::Success,
            RouteResult::Blocked(blockers) => {
                self.wait_list.enqueue(
                    tx.id.clone(),
                    Operation::Write { t: t.to_string(), x: x.to_string(), v },
                    blockers,
                );
                ResultType::Blocked
            }
        }
    }

    /// Fans an abort out across all sites, drops the transaction, and
    /// clears any of its wait-list entries.
    pub fn abort(&mut self, t: &str, _tick: Tick) -> ResultType {
        let Some(id) = self.active_by_name.remove(t) else { return ResultType::Stop };
        self.transactions.remove(&id);
        self.data_manager.abort_on_all_sites(&id);
        self.wait_list.remove_all_of(&id);
        ResultType::Abort
    }

    /// Commits if nothing is pending for `t`; if a wait-list entry still
    /// exists for it, aborts instead (per the spec's resolved open
    /// question on `end` racing a still-blocked op).
    fn commit(&mut self, t: &str, tick: Tick) -> ResultType {
        let Some(id) = self.active_by_name.get(t).cloned() else { return ResultType::Stop };
        if self.wait_list.get_waitobj_of(&id).is_some() {
            return self.abort(t, tick);
        }
        self.active_by_name.remove(t);
        self.transactions.remove(&id);
        self.data_manager.commit_on_all_sites(&id, tick);
        ResultType::Success
    }

    pub fn end(&mut self, t: &str, tick: Tick) -> ResultType {
        let Some(tx) = self.transaction(t) else { return ResultType::Stop };
        if tx.aborted {
            self.abort(t, tick)
        } else {
            self.commit(t, tick)
        }
    }

    fn mark_aborted(&mut self, id: &TxId) {
        if let Some(tx) = self.transactions.get_mut(id) {
            tx.aborted = true;
        }
    }

    /// The current blocker list for `t`'s parked operation, if any —
    /// used by reporting to render the lock-conflict/site-down message.
    pub fn blocked_by(&self, t: &str) -> Option<&[TxId]> {
        let tx = self.transaction(t)?;
        self.wait_list.get_waitobj_of(&tx.id).map(|wo| wo.blocked_by.as_slice())
    }

    /// Re-invokes `op` (a parked `Read` or `Write`) against the current
    /// state. On anything other than `Blocked`, the stale wait-list entry
    /// is dropped — a successful retry never re-enqueues, so it would
    /// otherwise linger.
    pub fn retry(&mut self, op: &Operation, tick: Tick) -> (ResultType, Option<i64>) {
        let ((result, value), t) = match op {
            Operation::Read { t, x } => (self.read(t, x, tick), t),
            Operation::Write { t, x, v } => ((self.write(t, x, *v, tick), None), t),
            _ => return (ResultType::Stop, None),
        };
        if result != ResultType::Blocked {
            if let Some(tx) = self.transaction(t) {
                let id = tx.id.clone();
                self.wait_list.remove(&id, op);
            }
        }
        (result, value)
    }

    /// `dump(x)`: the value of `x` at every site that holds it.
    pub fn dump_variable(&self, x: &str) -> Vec<(SiteId, i64)> {
        self.data_manager.sites_holding(x)
    }

    /// `dump()`: every site's full committed store.
    pub fn dump_all(&self) -> Vec<(SiteId, Vec<(String, i64)>)> {
        self.data_manager.all_sites_dump()
    }
}
