//! Ledger listing business logic.
//!
//! This module builds the listing views: filtered transactions with their resolved due dates
//! and balances, the distinct party names, the candidates for a relative due date, and an
//! overview combining them with the baseline and projected balance. All functions are
//! framework-agnostic and return structured data for whatever layer renders it.

use crate::{
    core::balance::LedgerSnapshot,
    core::due_date::DueDate,
    entities::{TransactionType, transaction},
    errors::Result,
};
use chrono::NaiveDate;
use sea_orm::DatabaseConnection;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashSet;

/// Options for filtering the transaction listing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionFilter {
    /// Only this transaction; every other criterion is ignored
    pub id: Option<i64>,
    /// Party contains this text, ignoring case
    pub party: Option<String>,
    /// Amount at least this much
    pub min_amount: Option<i64>,
    /// Amount at most this much
    pub max_amount: Option<i64>,
    /// Only deposits or only withdrawals
    pub transaction_type: Option<TransactionType>,
    /// Description contains this text, ignoring case
    pub keywords: Option<String>,
    /// Resolved due date on or after this date
    pub min_due_date: Option<NaiveDate>,
    /// Resolved due date on or before this date
    pub max_due_date: Option<NaiveDate>,
    /// Also list applied transactions
    pub include_applied: bool,
}

impl TransactionFilter {
    /// Create a new empty filter
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Filter by transaction id
    #[must_use]
    pub fn id(mut self, id: i64) -> Self {
        self.id = Some(id);
        self
    }

    /// Filter by party substring
    #[must_use]
    pub fn party(mut self, party: impl Into<String>) -> Self {
        self.party = Some(party.into());
        self
    }

    /// Filter by amount range
    #[must_use]
    pub fn amount_range(mut self, min: Option<i64>, max: Option<i64>) -> Self {
        self.min_amount = min;
        self.max_amount = max;
        self
    }

    /// Filter by type
    #[must_use]
    pub fn transaction_type(mut self, transaction_type: TransactionType) -> Self {
        self.transaction_type = Some(transaction_type);
        self
    }

    /// Filter by description substring
    #[must_use]
    pub fn keywords(mut self, keywords: impl Into<String>) -> Self {
        self.keywords = Some(keywords.into());
        self
    }

    /// Filter by resolved due date range
    #[must_use]
    pub fn due_date_range(mut self, min: Option<NaiveDate>, max: Option<NaiveDate>) -> Self {
        self.min_due_date = min;
        self.max_due_date = max;
        self
    }

    /// Include applied transactions
    #[must_use]
    pub fn with_applied(mut self) -> Self {
        self.include_applied = true;
        self
    }

    fn matches(&self, transaction: &transaction::Model, due: DueDate) -> bool {
        if !self.include_applied && transaction.applied {
            return false;
        }
        if let Some(id) = self.id {
            return transaction.id == id;
        }

        let contains = |haystack: &str, needle: Option<&str>| {
            needle.is_none_or(|needle| haystack.to_lowercase().contains(&needle.to_lowercase()))
        };

        contains(&transaction.party, self.party.as_deref())
            && contains(&transaction.description, self.keywords.as_deref())
            && self.min_amount.is_none_or(|min| transaction.amount >= min)
            && self.max_amount.is_none_or(|max| transaction.amount <= max)
            && self
                .transaction_type
                .is_none_or(|kind| transaction.transaction_type == kind)
            && self.matches_due_date(due)
    }

    fn matches_due_date(&self, due: DueDate) -> bool {
        if self.min_due_date.is_none() && self.max_due_date.is_none() {
            return true;
        }
        due.date().is_some_and(|date| {
            self.min_due_date.is_none_or(|min| date >= min)
                && self.max_due_date.is_none_or(|max| date <= max)
        })
    }
}

/// A transaction as listed, with its derived values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransactionView {
    /// The stored transaction
    pub transaction: transaction::Model,
    /// Its resolved due date
    pub due_date: DueDate,
    /// Balance as of its due date
    pub balance: i64,
}

/// Everything a listing page needs in one read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LedgerOverview {
    /// Current baseline
    pub baseline_balance: i64,
    /// Baseline plus every eligible transaction
    pub projected_balance: i64,
    /// Number of stored transactions, applied or not
    pub total_transactions: usize,
    /// Number of transactions matching the filter
    pub matching_transactions: usize,
    /// Distinct party names, most recent first
    pub parties: Vec<String>,
    /// Matching transactions in listing order
    pub transactions: Vec<TransactionView>,
}

/// Listing order: resolved due date ascending with unresolved last, then creation time,
/// then id.
#[must_use]
pub fn listing_order(a: &TransactionView, b: &TransactionView) -> Ordering {
    let due_key = |view: &TransactionView| {
        let date = view.due_date.date();
        (date.is_none(), date)
    };

    due_key(a)
        .cmp(&due_key(b))
        .then_with(|| a.transaction.created_at.cmp(&b.transaction.created_at))
        .then_with(|| a.transaction.id.cmp(&b.transaction.id))
}

fn view(snapshot: &LedgerSnapshot, transaction: &transaction::Model) -> Result<TransactionView> {
    let due_date = snapshot.due_date(transaction.id);
    Ok(TransactionView {
        transaction: transaction.clone(),
        due_date,
        balance: snapshot.sheet.balance_for(due_date)?,
    })
}

fn filtered_views(
    snapshot: &LedgerSnapshot,
    filter: &TransactionFilter,
) -> Result<Vec<TransactionView>> {
    let mut views = snapshot
        .transactions
        .iter()
        .filter(|transaction| filter.matches(transaction, snapshot.due_date(transaction.id)))
        .map(|transaction| view(snapshot, transaction))
        .collect::<Result<Vec<_>>>()?;
    views.sort_by(listing_order);
    Ok(views)
}

fn distinct_parties(snapshot: &LedgerSnapshot) -> Vec<String> {
    let mut seen = HashSet::new();
    snapshot
        .transactions
        .iter()
        .rev()
        .filter(|transaction| seen.insert(transaction.party.as_str()))
        .map(|transaction| transaction.party.clone())
        .collect()
}

/// Lists transactions matching `filter` in listing order.
pub async fn list_transactions(
    db: &DatabaseConnection,
    filter: &TransactionFilter,
) -> Result<Vec<TransactionView>> {
    let snapshot = LedgerSnapshot::load(db).await?;
    filtered_views(&snapshot, filter)
}

/// Distinct party names, most recently created first.
pub async fn list_parties(db: &DatabaseConnection) -> Result<Vec<String>> {
    let snapshot = LedgerSnapshot::load(db).await?;
    Ok(distinct_parties(&snapshot))
}

/// Non-applied transactions, newest first, that a relative due date can point at.
pub async fn reference_candidates(db: &DatabaseConnection) -> Result<Vec<TransactionView>> {
    let snapshot = LedgerSnapshot::load(db).await?;
    snapshot
        .transactions
        .iter()
        .rev()
        .filter(|transaction| !transaction.applied)
        .map(|transaction| view(&snapshot, transaction))
        .collect()
}

/// Generates the listing overview from a single snapshot.
pub async fn ledger_overview(
    db: &DatabaseConnection,
    filter: &TransactionFilter,
) -> Result<LedgerOverview> {
    let snapshot = LedgerSnapshot::load(db).await?;
    let transactions = filtered_views(&snapshot, filter)?;

    Ok(LedgerOverview {
        baseline_balance: snapshot.sheet.baseline(),
        projected_balance: snapshot.projected_balance()?,
        total_transactions: snapshot.transactions.len(),
        matching_transactions: transactions.len(),
        parties: distinct_parties(&snapshot),
        transactions,
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::{
        apply::apply_transaction, settings::set_baseline_balance, transaction::DueDateSpec,
    };
    use crate::test_utils::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn ids(views: &[TransactionView]) -> Vec<i64> {
        views.iter().map(|view| view.transaction.id).collect()
    }

    #[tokio::test]
    async fn test_listing_order() -> Result<()> {
        let db = setup_test_db().await?;
        let unanchored = create_test_transaction(&db, 5, DueDateSpec::Unanchored).await?;
        let late = create_fixed_transaction(&db, 10, date(2024, 3, 1)).await?;
        let early = create_fixed_transaction(&db, 20, date(2024, 1, 1)).await?;
        let same_day = create_fixed_transaction(&db, 30, date(2024, 1, 1)).await?;
        let relative = create_relative_transaction(&db, 40, early.id, 10).await?;

        let views = list_transactions(&db, &TransactionFilter::new()).await?;
        assert_eq!(
            ids(&views),
            vec![early.id, same_day.id, relative.id, late.id, unanchored.id]
        );

        assert_eq!(views[0].balance, 50);
        assert_eq!(views[1].balance, 50);
        assert_eq!(views[2].balance, 90);
        assert_eq!(views[3].balance, 100);
        assert_eq!(views[4].due_date, DueDate::Unanchored);
        assert_eq!(views[4].balance, 0);

        Ok(())
    }

    #[tokio::test]
    async fn test_filters() -> Result<()> {
        let db = setup_test_db().await?;
        let rent = create_custom_transaction(
            &db,
            1200,
            TransactionType::Withdraw,
            "Landlord",
            DueDateSpec::Fixed(date(2024, 1, 1)),
        )
        .await?;
        let salary = create_custom_transaction(
            &db,
            3000,
            TransactionType::Deposit,
            "Employer",
            DueDateSpec::Fixed(date(2024, 1, 25)),
        )
        .await?;
        let gift = create_custom_transaction(
            &db,
            50,
            TransactionType::Deposit,
            "Grandma Lord",
            DueDateSpec::Unanchored,
        )
        .await?;

        let by_party = list_transactions(&db, &TransactionFilter::new().party("Lord")).await?;
        assert_eq!(ids(&by_party), vec![rent.id, gift.id]);

        let by_type = list_transactions(
            &db,
            &TransactionFilter::new().transaction_type(TransactionType::Deposit),
        )
        .await?;
        assert_eq!(ids(&by_type), vec![salary.id, gift.id]);

        let by_amount = list_transactions(
            &db,
            &TransactionFilter::new().amount_range(Some(100), Some(2000)),
        )
        .await?;
        assert_eq!(ids(&by_amount), vec![rent.id]);

        let by_due = list_transactions(
            &db,
            &TransactionFilter::new().due_date_range(Some(date(2024, 1, 10)), None),
        )
        .await?;
        assert_eq!(ids(&by_due), vec![salary.id]);

        let by_id =
            list_transactions(&db, &TransactionFilter::new().id(gift.id).party("x")).await?;
        assert_eq!(ids(&by_id), vec![gift.id]);

        Ok(())
    }

    #[tokio::test]
    async fn test_keywords_filter() -> Result<()> {
        let db = setup_test_db().await?;
        let described = create_described_transaction(&db, "monthly rent").await?;
        create_described_transaction(&db, "groceries").await?;

        let views = list_transactions(&db, &TransactionFilter::new().keywords("rent")).await?;
        assert_eq!(ids(&views), vec![described.id]);

        Ok(())
    }

    #[tokio::test]
    async fn test_applied_hidden_by_default() -> Result<()> {
        let db = setup_test_db().await?;
        let applied = create_fixed_transaction(&db, 100, date(2024, 1, 1)).await?;
        let pending = create_fixed_transaction(&db, 10, date(2024, 1, 2)).await?;
        apply_transaction(&db, applied.id).await?;

        let views = list_transactions(&db, &TransactionFilter::new()).await?;
        assert_eq!(ids(&views), vec![pending.id]);

        let views = list_transactions(&db, &TransactionFilter::new().with_applied()).await?;
        assert_eq!(ids(&views), vec![applied.id, pending.id]);

        let candidates = reference_candidates(&db).await?;
        assert_eq!(ids(&candidates), vec![pending.id]);

        Ok(())
    }

    #[tokio::test]
    async fn test_list_parties_most_recent_first() -> Result<()> {
        let db = setup_test_db().await?;
        for party in ["Alpha", "Beta", "Alpha", "Gamma"] {
            create_custom_transaction(
                &db,
                10,
                TransactionType::Deposit,
                party,
                DueDateSpec::Unanchored,
            )
            .await?;
        }

        assert_eq!(list_parties(&db).await?, vec!["Gamma", "Alpha", "Beta"]);

        Ok(())
    }

    #[tokio::test]
    async fn test_ledger_overview() -> Result<()> {
        let db = setup_test_db().await?;
        set_baseline_balance(&db, 1000).await?;
        let applied = create_fixed_transaction(&db, 500, date(2024, 1, 1)).await?;
        create_fixed_transaction(&db, 20, date(2024, 1, 2)).await?;
        create_custom_transaction(
            &db,
            70,
            TransactionType::Withdraw,
            "Shop",
            DueDateSpec::Unanchored,
        )
        .await?;
        apply_transaction(&db, applied.id).await?;

        let overview = ledger_overview(&db, &TransactionFilter::new()).await?;
        assert_eq!(overview.baseline_balance, 1500);
        assert_eq!(overview.projected_balance, 1450);
        assert_eq!(overview.total_transactions, 3);
        assert_eq!(overview.matching_transactions, 2);
        assert_eq!(overview.parties, vec!["Shop", "Test party"]);

        Ok(())
    }
}
