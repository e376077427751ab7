//! Apply engine - Folds a transaction into the baseline balance.
//!
//! Applying moves the transaction's signed amount into `settings.baseline_balance` and marks
//! the transaction applied, both on one database transaction. Once applied, a transaction is
//! excluded from every computed balance; there is no way back.

use crate::{
    core::settings,
    entities::{Transaction, transaction},
    errors::{Error, Result},
};
use sea_orm::{Set, TransactionTrait, prelude::*};
use tracing::{info, instrument};

/// Applies a transaction and returns the new baseline balance.
///
/// Applying an already-applied transaction changes nothing and returns the current
/// baseline.
///
/// # Errors
/// Returns `NotFound` if the transaction does not exist, or a persistence error. On error
/// neither the baseline nor the transaction is changed.
#[instrument(skip(db))]
pub async fn apply_transaction(db: &DatabaseConnection, transaction_id: i64) -> Result<i64> {
    let txn = db.begin().await?;

    let transaction = Transaction::find_by_id(transaction_id)
        .one(&txn)
        .await?
        .ok_or_else(|| Error::transaction_not_found(transaction_id))?;

    if transaction.applied {
        let baseline = settings::get_baseline_balance(&txn).await?;
        txn.commit().await?;
        info!(transaction_id, "Transaction already applied");
        return Ok(baseline);
    }

    let amount_change = transaction.signed_amount();
    let new_baseline = settings::add_to_baseline(&txn, amount_change).await?;

    let mut model: transaction::ActiveModel = transaction.into();
    model.applied = Set(true);
    model.update(&txn).await?;

    txn.commit().await?;

    info!(transaction_id, amount_change, new_baseline, "Applied transaction to baseline");
    Ok(new_baseline)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::core::balance::compute_balance;
    use crate::core::settings::{get_baseline_balance, set_baseline_balance};
    use crate::core::transaction::{DueDateSpec, get_transaction_by_id};
    use crate::entities::TransactionType;
    use crate::test_utils::*;
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[tokio::test]
    async fn test_apply_deposit_and_withdrawal() -> Result<()> {
        let db = setup_test_db().await?;
        set_baseline_balance(&db, 100).await?;

        let deposit = create_fixed_transaction(&db, 1000, date(2024, 1, 1)).await?;
        let withdrawal = create_custom_transaction(
            &db,
            400,
            TransactionType::Withdraw,
            "Shop",
            DueDateSpec::Fixed(date(2024, 1, 2)),
        )
        .await?;

        assert_eq!(apply_transaction(&db, deposit.id).await?, 1100);
        assert_eq!(apply_transaction(&db, withdrawal.id).await?, 700);
        assert_eq!(get_baseline_balance(&db).await?, 700);

        let deposit = get_transaction_by_id(&db, deposit.id).await?.unwrap();
        assert!(deposit.applied);

        Ok(())
    }

    #[tokio::test]
    async fn test_apply_creates_missing_settings() -> Result<()> {
        let db = setup_test_db().await?;
        let deposit = create_fixed_transaction(&db, 250, date(2024, 1, 1)).await?;

        assert_eq!(apply_transaction(&db, deposit.id).await?, 250);

        Ok(())
    }

    #[tokio::test]
    async fn test_apply_counts_once() -> Result<()> {
        let db = setup_test_db().await?;
        let deposit = create_fixed_transaction(&db, 300, date(2024, 1, 1)).await?;

        assert_eq!(apply_transaction(&db, deposit.id).await?, 300);
        assert_eq!(apply_transaction(&db, deposit.id).await?, 300);
        assert_eq!(get_baseline_balance(&db).await?, 300);

        Ok(())
    }

    #[tokio::test]
    async fn test_apply_keeps_other_balances() -> Result<()> {
        let db = setup_test_db().await?;
        let early = create_fixed_transaction(&db, 1000, date(2024, 1, 1)).await?;
        let later = create_fixed_transaction(&db, 50, date(2024, 2, 1)).await?;

        assert_eq!(compute_balance(&db, later.id).await?, 1050);

        apply_transaction(&db, early.id).await?;

        // Moved from the aggregate into the baseline, so the balance is unchanged
        assert_eq!(compute_balance(&db, later.id).await?, 1050);
        assert_eq!(get_baseline_balance(&db).await?, 1000);

        Ok(())
    }

    #[tokio::test]
    async fn test_apply_failing_after_baseline_update_rolls_back() -> Result<()> {
        let db = setup_test_db().await?;
        set_baseline_balance(&db, 100).await?;
        let deposit = create_fixed_transaction(&db, 50, date(2024, 1, 1)).await?;

        // The baseline update succeeds, then marking the row applied fails
        db.execute_unprepared(
            "CREATE TRIGGER block_apply BEFORE UPDATE OF applied ON transactions \
             BEGIN SELECT RAISE(ABORT, 'apply blocked'); END;",
        )
        .await?;

        let result = apply_transaction(&db, deposit.id).await;
        assert!(matches!(result, Err(Error::Persistence(_))));
        assert_eq!(get_baseline_balance(&db).await?, 100);
        assert!(!get_transaction_by_id(&db, deposit.id).await?.unwrap().applied);

        db.execute_unprepared("DROP TRIGGER block_apply;").await?;
        assert_eq!(apply_transaction(&db, deposit.id).await?, 150);

        Ok(())
    }

    #[tokio::test]
    async fn test_apply_overflow_changes_nothing() -> Result<()> {
        let db = setup_test_db().await?;
        set_baseline_balance(&db, i64::MAX).await?;
        let deposit = create_fixed_transaction(&db, 10, date(2024, 1, 1)).await?;

        let result = apply_transaction(&db, deposit.id).await;
        assert!(matches!(result, Err(Error::BalanceOverflow)));
        assert_eq!(get_baseline_balance(&db).await?, i64::MAX);
        assert!(!get_transaction_by_id(&db, deposit.id).await?.unwrap().applied);

        Ok(())
    }

    #[tokio::test]
    async fn test_apply_not_found_changes_nothing() -> Result<()> {
        let db = setup_test_db().await?;
        set_baseline_balance(&db, 42).await?;

        let result = apply_transaction(&db, 999).await;
        assert!(matches!(result.unwrap_err(), Error::NotFound { id: 999, .. }));
        assert_eq!(get_baseline_balance(&db).await?, 42);

        Ok(())
    }
}
