//! §6 output formatting. A pure layer with no I/O of its own — every
//! function here returns a `String`; `main.rs` is the only thing that
//! actually prints. Kept separate from `driver` so the literal wording
//! lives in one place and is independently testable.

use crate::core::common::types::SiteId;
use crate::core::model::transaction::TxId;

pub fn read_success(x: &str, value: i64) -> String {
    format!("{x}: {value}")
}

pub fn write_accepted(site: SiteId, t: &str, x: &str, v: i64) -> String {
    format!("Site {site}: {t} write {x}={v}")
}

pub fn commit(t: &str) -> String {
    format!("Commit: {t}")
}

pub fn abort(t: &str) -> String {
    format!("Abort: {t}")
}

/// Sorts and de-duplicates the blocker list by name before rendering —
/// the wait-list itself preserves FIFO insertion order for retry
/// fairness, but the spec's display format wants a stable, readable set.
pub fn blocked_by_lock_conflict(t: &str, blockers: &[TxId]) -> String {
    let mut names: Vec<&str> = blockers.iter().map(|b| b.name.as_str()).collect();
    names.sort_unstable();
    names.dedup();
    format!("Transaction {t} blocked by a lock conflict. Locks: [{}]", names.join(", "))
}

pub fn blocked_site_down(t: &str) -> String {
    format!("Transaction {t} blocked because site is down.")
}

/// `dump(x)`: one line per site currently holding `x`.
pub fn dump_variable(holders: &[(SiteId, i64)], x: &str) -> Vec<String> {
    holders.iter().map(|(site, value)| format!("Site {site}: {x}: {value}")).collect()
}

/// `dump()`: one line per site, its full committed store in index order.
pub fn dump_all(sites: &[(SiteId, Vec<(String, i64)>)]) -> Vec<String> {
    sites
        .iter()
        .map(|(site, vars)| {
            let body = vars.iter().map(|(name, value)| format!("{name}: {value}")).collect::<Vec<_>>().join(", ");
            format!("Site {site} - {body}")
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::transaction::Transaction;

    #[test]
    fn blocked_by_lock_conflict_is_sorted_and_deduped() {
        let t2 = Transaction::new("T2", 1, false).id;
        let t1 = Transaction::new("T1", 0, false).id;
        let line = blocked_by_lock_conflict("T3", &[t2, t1.clone(), t1]);
        assert_eq!(line, "Transaction T3 blocked by a lock conflict. Locks: [T1, T2]");
    }

    #[test]
    fn dump_all_formats_site_and_vars() {
        let lines = dump_all(&[(SiteId(1), vec![("x1".into(), 10), ("x2".into(), 20)])]);
        assert_eq!(lines, vec!["Site 1 - x1: 10, x2: 20".to_string()]);
    }

    #[test]
    fn dump_variable_lists_every_holder() {
        let lines = dump_variable(&[(SiteId(1), 10), (SiteId(3), 10)], "x2");
        assert_eq!(lines, vec!["Site 1: x2: 10".to_string(), "Site 3: x2: 10".to_string()]);
    }
}
