//! Transaction business logic - Handles the transaction write path.
//!
//! Creating and updating a transaction validates its fields and runs the integrity guard
//! on the same database transaction as the write, so a rejected reference never leaves a
//! partial change behind. Deleting a transaction detaches its dependents in the same
//! atomic unit as the delete.

use crate::{
    core::integrity,
    entities::{Transaction, TransactionType, transaction},
    errors::{Error, Result},
};
use chrono::NaiveDate;
use sea_orm::{Set, TransactionTrait, prelude::*};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

/// Largest accepted amount in minor units.
pub const MAX_AMOUNT: i64 = 1_000_000_000_000_000;

/// How a transaction's due date is determined.
///
/// A fixed date and a relative reference are mutually exclusive, and a relative reference
/// always carries its offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DueDateSpec {
    /// Due on a fixed calendar date
    Fixed(NaiveDate),
    /// Due `offset_days` calendar days after another transaction's resolved due date
    Relative {
        /// Referenced transaction
        transaction_id: i64,
        /// May be negative
        offset_days: i32,
    },
    /// No due date; resolves to nothing
    Unanchored,
}

impl DueDateSpec {
    const fn into_columns(self) -> (Option<NaiveDate>, Option<i64>, Option<i32>) {
        match self {
            Self::Fixed(date) => (Some(date), None, None),
            Self::Relative {
                transaction_id,
                offset_days,
            } => (None, Some(transaction_id), Some(offset_days)),
            Self::Unanchored => (None, None, None),
        }
    }
}

impl From<&transaction::Model> for DueDateSpec {
    fn from(model: &transaction::Model) -> Self {
        match (model.relative_due_date_transaction_id, model.date) {
            (Some(transaction_id), _) => Self::Relative {
                transaction_id,
                offset_days: model.relative_due_date_offset_days.unwrap_or(0),
            },
            (None, Some(date)) => Self::Fixed(date),
            (None, None) => Self::Unanchored,
        }
    }
}

/// User-editable fields of a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionFields {
    /// Amount in minor units, from 1 to [`MAX_AMOUNT`]
    pub amount: i64,
    /// Deposit or withdrawal
    pub transaction_type: TransactionType,
    /// Counterparty, must not be blank
    pub party: String,
    /// Optional free text
    pub description: String,
    /// Fixed, relative or no due date
    pub due: DueDateSpec,
}

impl TransactionFields {
    fn validate(&self) -> Result<()> {
        if !(1..=MAX_AMOUNT).contains(&self.amount) {
            return Err(Error::InvalidAmount {
                amount: self.amount,
            });
        }

        if self.party.trim().is_empty() {
            return Err(Error::Validation {
                message: "Party cannot be empty".to_string(),
            });
        }

        Ok(())
    }

    fn write_to(self, model: &mut transaction::ActiveModel) {
        let (date, reference, offset) = self.due.into_columns();
        model.amount = Set(self.amount);
        model.transaction_type = Set(self.transaction_type);
        model.party = Set(self.party.trim().to_string());
        model.description = Set(self.description.trim().to_string());
        model.date = Set(date);
        model.relative_due_date_transaction_id = Set(reference);
        model.relative_due_date_offset_days = Set(offset);
    }
}

/// Creates a new transaction. It starts not applied and included in balance.
///
/// # Errors
/// Returns an error if:
/// - The amount is outside `1..=MAX_AMOUNT` or the party is blank
/// - The relative reference does not exist (`ReferenceNotFound`)
/// - The relative reference leads into a cycle (`CycleDetected`)
/// - The database insert fails
#[instrument(skip(db))]
pub async fn create_transaction(
    db: &DatabaseConnection,
    fields: TransactionFields,
) -> Result<transaction::Model> {
    fields.validate()?;

    let txn = db.begin().await?;

    integrity::check_due_date_reference(&txn, None, &fields.due).await?;

    let mut model = transaction::ActiveModel {
        applied: Set(false),
        include_in_balance: Set(true),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    };
    fields.write_to(&mut model);

    let result = model.insert(&txn).await?;
    txn.commit().await?;

    info!(transaction_id = result.id, "Created transaction");
    Ok(result)
}

/// Retrieves a specific transaction by its unique ID, applied or not.
pub async fn get_transaction_by_id(
    db: &DatabaseConnection,
    transaction_id: i64,
) -> Result<Option<transaction::Model>> {
    Transaction::find_by_id(transaction_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Replaces the editable fields of a transaction, re-validating its due date reference.
///
/// `applied`, `include_in_balance` and `created_at` are left untouched.
///
/// # Errors
/// Returns an error if:
/// - The amount is outside `1..=MAX_AMOUNT` or the party is blank
/// - The transaction does not exist (`NotFound`)
/// - The relative reference does not exist (`ReferenceNotFound`)
/// - The relative reference is this transaction or leads back to it (`CycleDetected`)
/// - The database update fails
#[instrument(skip(db))]
pub async fn update_transaction(
    db: &DatabaseConnection,
    transaction_id: i64,
    fields: TransactionFields,
) -> Result<transaction::Model> {
    fields.validate()?;

    let txn = db.begin().await?;

    let mut model: transaction::ActiveModel = Transaction::find_by_id(transaction_id)
        .one(&txn)
        .await?
        .ok_or_else(|| Error::transaction_not_found(transaction_id))?
        .into();

    integrity::check_due_date_reference(&txn, Some(transaction_id), &fields.due).await?;

    fields.write_to(&mut model);
    let result = model.update(&txn).await?;
    txn.commit().await?;

    info!(transaction_id, "Updated transaction");
    Ok(result)
}

/// Deletes a transaction. Transactions relative to it are rewritten to the fixed date
/// they resolved to before the delete, in the same database transaction.
///
/// # Errors
/// Returns `NotFound` if the transaction does not exist, or a persistence error. On error
/// nothing is changed.
#[instrument(skip(db))]
pub async fn delete_transaction(db: &DatabaseConnection, transaction_id: i64) -> Result<()> {
    let txn = db.begin().await?;

    let transaction = Transaction::find_by_id(transaction_id)
        .one(&txn)
        .await?
        .ok_or_else(|| Error::transaction_not_found(transaction_id))?;

    let detached = integrity::detach_dependents(&txn, transaction_id).await?;
    transaction.delete(&txn).await?;

    txn.commit().await?;

    info!(transaction_id, detached, "Deleted transaction");
    Ok(())
}

/// Sets whether a non-applied transaction contributes to balances.
///
/// # Errors
/// Returns `NotFound` if the transaction does not exist, or a persistence error.
#[instrument(skip(db))]
pub async fn toggle_include_in_balance(
    db: &DatabaseConnection,
    transaction_id: i64,
    include_in_balance: bool,
) -> Result<()> {
    let mut model: transaction::ActiveModel = Transaction::find_by_id(transaction_id)
        .one(db)
        .await?
        .ok_or_else(|| Error::transaction_not_found(transaction_id))?
        .into();

    model.include_in_balance = Set(include_in_balance);
    model.update(db).await?;

    Ok(())
}
