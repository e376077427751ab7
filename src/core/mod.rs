//! Core ledger logic - framework-agnostic due date resolution, balance aggregation,
//! the apply engine and the integrity guard.
//!
//! Everything a request-handling layer needs is re-exported here.

/// Baseline mutation by applying transactions
pub mod apply;
/// Derived balances over eligible transactions
pub mod balance;
/// Relative due date resolution
pub mod due_date;
/// Write-time checks on the due date reference graph
pub mod integrity;
/// Filtered, ordered listings and overviews
pub mod report;
/// The singleton settings row and its baseline
pub mod settings;
/// Transaction create, update, delete and toggle
pub mod transaction;

pub use apply::apply_transaction;
pub use balance::{
    BalanceSheet, LedgerSnapshot, compute_balance, compute_balance_on, compute_balance_timeline,
    projected_balance,
};
pub use due_date::{DueDate, DueDateGraph, resolve_due_date};
pub use report::{
    LedgerOverview, TransactionFilter, TransactionView, ledger_overview, list_parties,
    list_transactions, reference_candidates,
};
pub use settings::{ensure_settings, get_baseline_balance, get_settings, set_baseline_balance};
pub use transaction::{
    DueDateSpec, MAX_AMOUNT, TransactionFields, create_transaction, delete_transaction,
    get_transaction_by_id, toggle_include_in_balance, update_transaction,
};
