//! Balance aggregation - Derives balances from the baseline and eligible transactions.
//!
//! Nothing here is stored. Every call loads the current rows, resolves due dates and sums,
//! so a balance can never be stale. The balance of a transaction is the baseline plus the
//! signed amounts of every eligible transaction (not applied, included in balance) whose
//! resolved due date is on or before the target's resolved due date. Transactions whose due
//! date does not resolve never contribute, and a target whose due date does not resolve
//! gets the baseline alone.
//!
//! Sums are carried in `i128` and narrowed on the way out, so a total outside the `i64`
//! range is reported as [`Error::BalanceOverflow`] instead of wrapping.

use crate::{
    core::{
        due_date::{DueDate, DueDateGraph},
        settings,
    },
    entities::{Transaction, transaction},
    errors::{Error, Result},
};
use chrono::NaiveDate;
use sea_orm::{DatabaseConnection, EntityTrait, QueryOrder, TransactionTrait};
use std::collections::HashMap;

fn narrow(total: i128) -> Result<i64> {
    i64::try_from(total).map_err(|_| Error::BalanceOverflow)
}

/// Eligible transactions sorted by resolved due date, with running totals.
///
/// Each query is a binary search, so after one resolution pass a whole listing costs one
/// sort.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalanceSheet {
    baseline: i64,
    dates: Vec<NaiveDate>,
    running_totals: Vec<i128>,
}

impl BalanceSheet {
    /// Builds the sheet from transaction rows and their resolved due dates.
    #[must_use]
    pub fn new(
        baseline: i64,
        transactions: &[transaction::Model],
        due_dates: &HashMap<i64, DueDate>,
    ) -> Self {
        let mut entries: Vec<(NaiveDate, i64)> = transactions
            .iter()
            .filter(|transaction| transaction.is_eligible())
            .filter_map(|transaction| {
                due_dates
                    .get(&transaction.id)
                    .and_then(|due| due.date())
                    .map(|date| (date, transaction.signed_amount()))
            })
            .collect();
        entries.sort_unstable_by_key(|(date, _)| *date);

        let dates = entries.iter().map(|(date, _)| *date).collect();
        let running_totals = entries
            .iter()
            .scan(0_i128, |total, (_, amount)| {
                *total += i128::from(*amount);
                Some(*total)
            })
            .collect();

        Self {
            baseline,
            dates,
            running_totals,
        }
    }

    /// The baseline every balance starts from.
    #[must_use]
    pub const fn baseline(&self) -> i64 {
        self.baseline
    }

    /// Balance including every eligible transaction due on or before `date`.
    ///
    /// # Errors
    /// Returns `BalanceOverflow` if the balance does not fit in an `i64`.
    pub fn balance_on(&self, date: NaiveDate) -> Result<i64> {
        let included = self.dates.partition_point(|due| *due <= date);
        let sum = included
            .checked_sub(1)
            .and_then(|last| self.running_totals.get(last))
            .copied()
            .unwrap_or(0);
        narrow(i128::from(self.baseline) + sum)
    }

    /// Balance for a target with the given due date; the baseline when it did not resolve.
    ///
    /// # Errors
    /// Returns `BalanceOverflow` if the balance does not fit in an `i64`.
    pub fn balance_for(&self, due: DueDate) -> Result<i64> {
        due.date().map_or(Ok(self.baseline), |date| self.balance_on(date))
    }
}

/// Every transaction with its resolved due date, read at one point in time.
#[derive(Debug, Clone)]
pub struct LedgerSnapshot {
    /// All transactions ordered by creation
    pub transactions: Vec<transaction::Model>,
    /// Resolved due date per transaction id
    pub due_dates: HashMap<i64, DueDate>,
    /// Aggregates over the eligible transactions
    pub sheet: BalanceSheet,
}

impl LedgerSnapshot {
    /// Loads the baseline and every transaction on one database transaction, then
    /// resolves all due dates.
    ///
    /// An apply committing concurrently is seen either entirely or not at all.
    pub async fn load<C>(db: &C) -> Result<Self>
    where
        C: TransactionTrait,
    {
        let txn = db.begin().await?;

        let baseline = settings::get_baseline_balance(&txn).await?;
        let transactions = Transaction::find()
            .order_by_asc(transaction::Column::CreatedAt)
            .order_by_asc(transaction::Column::Id)
            .all(&txn)
            .await?;

        txn.commit().await?;

        Ok(Self::new(baseline, transactions))
    }

    /// Builds a snapshot from rows already in memory.
    #[must_use]
    pub fn new(baseline: i64, transactions: Vec<transaction::Model>) -> Self {
        let due_dates = DueDateGraph::from_transactions(&transactions).resolve_all();
        let sheet = BalanceSheet::new(baseline, &transactions, &due_dates);
        Self {
            transactions,
            due_dates,
            sheet,
        }
    }

    /// Resolved due date of `transaction_id`.
    #[must_use]
    pub fn due_date(&self, transaction_id: i64) -> DueDate {
        self.due_dates
            .get(&transaction_id)
            .copied()
            .unwrap_or(DueDate::Dangling {
                missing_id: transaction_id,
            })
    }

    /// Balance as of `transaction_id`'s due date.
    ///
    /// # Errors
    /// Returns `NotFound` if the transaction is not in the snapshot, or
    /// `BalanceOverflow`.
    pub fn balance_of(&self, transaction_id: i64) -> Result<i64> {
        let due = self
            .due_dates
            .get(&transaction_id)
            .ok_or_else(|| Error::transaction_not_found(transaction_id))?;
        self.sheet.balance_for(*due)
    }

    /// Baseline plus every eligible transaction, whether or not its due date resolves.
    ///
    /// # Errors
    /// Returns `BalanceOverflow` if the total does not fit in an `i64`.
    pub fn projected_balance(&self) -> Result<i64> {
        self.transactions
            .iter()
            .filter(|transaction| transaction.is_eligible())
            .map(transaction::Model::signed_amount)
            .try_fold(self.sheet.baseline(), |total, amount| {
                total.checked_add(amount).ok_or(Error::BalanceOverflow)
            })
    }
}

/// Computes the balance shown for a transaction.
///
/// # Errors
/// Returns `NotFound` if the transaction does not exist, `BalanceOverflow`, or a
/// persistence error.
pub async fn compute_balance(db: &DatabaseConnection, transaction_id: i64) -> Result<i64> {
    LedgerSnapshot::load(db).await?.balance_of(transaction_id)
}

/// Computes balances for many transactions from a single snapshot.
///
/// # Errors
/// Returns `NotFound` for the first id that does not exist, `BalanceOverflow`, or a
/// persistence error.
pub async fn compute_balance_timeline(
    db: &DatabaseConnection,
    transaction_ids: &[i64],
) -> Result<HashMap<i64, i64>> {
    let snapshot = LedgerSnapshot::load(db).await?;

    transaction_ids
        .iter()
        .map(|&id| snapshot.balance_of(id).map(|balance| (id, balance)))
        .collect()
}

/// Computes the balance as of a calendar date, e.g. today.
pub async fn compute_balance_on(db: &DatabaseConnection, date: NaiveDate) -> Result<i64> {
    LedgerSnapshot::load(db).await?.sheet.balance_on(date)
}

/// Baseline plus every eligible transaction, regardless of due date.
pub async fn projected_balance(db: &DatabaseConnection) -> Result<i64> {
    LedgerSnapshot::load(db).await?.projected_balance()
}
