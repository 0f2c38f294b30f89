//! §2/§4.4 driver protocol: the per-tick retry-then-dispatch algorithm
//! that turns a parsed trace into the literal report lines of §6.

use crate::core::common::error::SimError;
use crate::core::common::types::{SiteId, Tick};
use crate::core::data_manager::DataManager;
use crate::core::report;
use crate::core::trace::Operation;
use crate::core::transaction_manager::{ResultType, TransactionManager};

/// Topology sizing. Defaults match §6: ten sites, twenty variables.
#[derive(Debug, Clone, Copy)]
pub struct SimConfig {
    pub num_sites: u32,
    pub num_variables: u32,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self { num_sites: 10, num_variables: 20 }
    }
}

/// Drives a parsed trace against a [`TransactionManager`], advancing a
/// single logical tick and producing the report lines §6 specifies.
pub struct Driver {
    transaction_manager: TransactionManager,
    tick: Tick,
    previous_blocked: bool,
}

impl Driver {
    pub fn new(config: SimConfig) -> Self {
        Self {
            transaction_manager: TransactionManager::new(DataManager::new(config.num_sites, config.num_variables)),
            tick: 0,
            previous_blocked: false,
        }
    }

    pub fn transaction_manager(&self) -> &TransactionManager {
        &self.transaction_manager
    }

    pub fn tick(&self) -> Tick {
        self.tick
    }

    pub fn run_trace(&mut self, ops: &[Operation]) -> Vec<String> {
        let mut out = Vec::new();
        for op in ops {
            self.step(op, &mut out);
        }
        out
    }

    fn step(&mut self, op: &Operation, out: &mut Vec<String>) {
        if self.previous_blocked {
            self.run_deadlock_detection_until_dry(out);
        }
        self.drain_wait_list(out);
        let result = self.dispatch(op, out);
        self.previous_blocked = result == Some(ResultType::Blocked);
        self.tick += 1;
    }

    /// §4.4 step 1: repeats detection-then-abort until a pass produces no
    /// new victims (the corrected rule, see the driver-loop note in
    /// SPEC_FULL.md — `main.py` ran this once per step, not to dryness).
    fn run_deadlock_detection_until_dry(&mut self, out: &mut Vec<String>) {
        loop {
            let victims = self.transaction_manager.wait_list().deadlock_detection();
            if victims.is_empty() {
                break;
            }
            for victim in victims {
                self.transaction_manager.abort(&victim.name, self.tick);
                out.push(report::abort(&victim.name));
            }
        }
    }

    /// §4.4 step 2: FIFO retry passes, re-scanning from the start after
    /// any pass that made progress, until a full pass is a no-op.
    fn drain_wait_list(&mut self, out: &mut Vec<String>) {
        loop {
            let entries: Vec<Operation> = self.transaction_manager.wait_list().list().iter().map(|wo| wo.op.clone()).collect();
            let mut progressed = false;
            for op in entries {
                let (result, value) = self.transaction_manager.retry(&op, self.tick);
                if result != ResultType::Blocked {
                    progressed = true;
                    self.tick += 1;
                    self.report_retry(&op, result, value, out);
                }
            }
            if !progressed {
                break;
            }
        }
    }

    fn dispatch(&mut self, op: &Operation, out: &mut Vec<String>) -> Option<ResultType> {
        match op {
            Operation::Begin { t } => {
                self.transaction_manager.begin(t, self.tick);
                None
            }
            Operation::BeginReadOnly { t } => {
                self.transaction_manager.begin_ro(t, self.tick);
                None
            }
            Operation::Read { t, x } => {
                let (result, value) = self.transaction_manager.read(t, x, self.tick);
                self.report_read(t, x, result, value, out);
                Some(result)
            }
            Operation::Write { t, x, v } => {
                let result = self.transaction_manager.write(t, x, *v, self.tick);
                self.report_write(t, x, *v, result, out);
                Some(result)
            }
            Operation::End { t } => {
                let result = self.transaction_manager.end(t, self.tick);
                match result {
                    ResultType::Success => out.push(report::commit(t)),
                    ResultType::Abort => out.push(report::abort(t)),
                    ResultType::Blocked | ResultType::Stop => {}
                }
                Some(result)
            }
            Operation::Fail { site } => {
                match self.parse_site(site) {
                    Ok(id) => self.transaction_manager.fail_site(id),
                    Err(e) => out.push(e.to_string()),
                }
                None
            }
            Operation::Recover { site } => {
                match self.parse_site(site) {
                    Ok(id) => self.transaction_manager.recover_site(id, self.tick),
                    Err(e) => out.push(e.to_string()),
                }
                None
            }
            Operation::Dump { x } => {
                match x {
                    Some(name) => {
                        let holders = self.transaction_manager.dump_variable(name);
                        if holders.is_empty() {
                            out.push(SimError::UnknownVariable(name.clone()).to_string());
                        } else {
                            out.extend(report::dump_variable(&holders, name));
                        }
                    }
                    None => {
                        let sites = self.transaction_manager.dump_all();
                        out.extend(report::dump_all(&sites));
                    }
                }
                None
            }
        }
    }

    /// Reports the outcome of a retried wait-list entry, dispatching on
    /// the parked operation's shape to recover its `t`/`x`/`v`.
    fn report_retry(&self, op: &Operation, result: ResultType, value: Option<i64>, out: &mut Vec<String>) {
        match op {
            Operation::Read { t, x } => self.report_read(t, x, result, value, out),
            Operation::Write { t, x, v } => self.report_write(t, x, *v, result, out),
            _ => {}
        }
    }

    /// Reports a read's outcome using the value `TransactionManager::read`
    /// actually produced — it may be a dirty read of the transaction's own
    /// uncommitted write, which a separate committed-store lookup would miss.
    fn report_read(&self, t: &str, x: &str, result: ResultType, value: Option<i64>, out: &mut Vec<String>) {
        match result {
            ResultType::Success => {
                if let Some(value) = value {
                    out.push(report::read_success(x, value));
                }
            }
            ResultType::Blocked => self.report_blocked(t, out),
            ResultType::Abort => out.push(report::abort(t)),
            ResultType::Stop => {}
        }
    }

    fn report_write(&self, t: &str, x: &str, v: i64, result: ResultType, out: &mut Vec<String>) {
        match result {
            ResultType::Success => {
                for site in self.transaction_manager.data_manager().available_sites_for(x) {
                    out.push(report::write_accepted(site, t, x, v));
                }
            }
            ResultType::Blocked => self.report_blocked(t, out),
            ResultType::Abort => out.push(report::abort(t)),
            ResultType::Stop => {}
        }
    }

    fn report_blocked(&self, t: &str, out: &mut Vec<String>) {
        let blockers = self.transaction_manager.blocked_by(t).unwrap_or(&[]);
        if blockers.is_empty() {
            out.push(report::blocked_site_down(t));
        } else {
            out.push(report::blocked_by_lock_conflict(t, blockers));
        }
    }

    fn parse_site(&self, s: &str) -> Result<SiteId, SimError> {
        let in_range = |n: u32| n >= 1 && n <= self.transaction_manager.data_manager().num_sites();
        match s.parse::<u32>() {
            Ok(n) if in_range(n) => Ok(SiteId(n)),
            _ => Err(SimError::UnknownSite(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::trace::parse_trace;

    fn run(trace: &str) -> Vec<String> {
        let (ops, errors) = parse_trace(trace);
        assert!(errors.is_empty(), "unexpected malformed lines: {errors:?}");
        Driver::new(SimConfig::default()).run_trace(&ops)
    }

    #[test]
    fn s1_simple_commit() {
        let out = run("begin(T1)\nW(T1,x1,101)\nend(T1)\ndump(x1)\n");
        assert!(out.contains(&"Commit: T1".to_string()));
        assert!(out.contains(&"Site 2: x1: 101".to_string()));
    }

    #[test]
    fn s2_blocked_write_deadlock_aborts_the_younger() {
        let out = run(
            "begin(T1)\nbegin(T2)\nW(T1,x1,5)\nW(T2,x2,6)\nW(T1,x2,7)\nW(T2,x1,8)\nend(T1)\nend(T2)\n",
        );
        assert!(out.contains(&"Abort: T2".to_string()));
        assert!(out.contains(&"Commit: T1".to_string()));
    }

    #[test]
    fn s5_upgrade_read_then_write_same_transaction() {
        let out = run("begin(T1)\nR(T1,x4)\nW(T1,x4,400)\nend(T1)\ndump(x4)\n");
        assert!(out.contains(&"Commit: T1".to_string()));
        assert!(out.iter().any(|l| l.contains("x4: 400")));
    }

    #[test]
    fn unknown_site_is_reported_not_fatal() {
        let out = run("fail(99)\n");
        assert_eq!(out, vec!["unknown site: 99".to_string()]);
    }

    #[test]
    fn read_after_own_write_reports_the_dirty_value_not_the_old_commit() {
        let out = run("begin(T1)\nW(T1,x4,400)\nR(T1,x4)\nend(T1)\n");
        assert!(out.contains(&"x4: 400".to_string()));
        assert!(!out.iter().any(|l| l.starts_with("x4: ") && l != "x4: 400"));
    }
}
