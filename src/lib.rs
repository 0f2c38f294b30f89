#![forbid(unsafe_code)]
#![deny(
    clippy::all,
    clippy::correctness,
    clippy::perf,
    clippy::style,
    clippy::suspicious,
    deprecated,
    unused,
    clippy::todo,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::unimplemented,
    clippy::unreachable
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::similar_names,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

//! Core library for a replicated, two-phase-locked concurrency-control
//! simulator: strict 2PL with available-copies replication, MVCC snapshot
//! reads for read-only transactions, deadlock detection with
//! youngest-victim selection, and site failure/recovery.
//!
//! The simulator is driven one trace operation at a time on a single
//! logical clock; see [`core::driver`] for the per-step algorithm.

pub mod core;

pub use crate::core::common::error::SimError;
pub use crate::core::common::types::{SiteId, Tick};
pub use crate::core::data_manager::DataManager;
pub use crate::core::driver::{Driver, SimConfig};
pub use crate::core::model::transaction::Transaction;
pub use crate::core::trace::Operation;
pub use crate::core::transaction_manager::{ResultType, TransactionManager};
