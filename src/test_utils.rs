//! Shared test utilities.
//!
//! This module provides common helper functions for setting up test databases
//! and creating test transactions with sensible defaults.

use crate::{
    core::transaction::{self, DueDateSpec, TransactionFields},
    entities::{self, TransactionType},
    errors::Result,
};
use chrono::{NaiveDate, TimeZone, Utc};
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};

/// Creates an in-memory `SQLite` database with all tables initialized.
/// This is the standard setup for all integration tests.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok(db)
}

/// Builds transaction fields with sensible defaults.
///
/// # Defaults
/// * `transaction_type`: Deposit
/// * `party`: `"Test party"`
/// * `description`: empty
pub fn fields(amount: i64, due: DueDateSpec) -> TransactionFields {
    TransactionFields {
        amount,
        transaction_type: TransactionType::Deposit,
        party: "Test party".to_string(),
        description: String::new(),
        due,
    }
}

/// Creates a deposit with the given due date through the normal write path.
pub async fn create_test_transaction(
    db: &DatabaseConnection,
    amount: i64,
    due: DueDateSpec,
) -> Result<entities::transaction::Model> {
    transaction::create_transaction(db, fields(amount, due)).await
}

/// Creates a deposit due on a fixed date.
pub async fn create_fixed_transaction(
    db: &DatabaseConnection,
    amount: i64,
    date: NaiveDate,
) -> Result<entities::transaction::Model> {
    create_test_transaction(db, amount, DueDateSpec::Fixed(date)).await
}

/// Creates a deposit due `offset_days` after `reference_id`.
pub async fn create_relative_transaction(
    db: &DatabaseConnection,
    amount: i64,
    reference_id: i64,
    offset_days: i32,
) -> Result<entities::transaction::Model> {
    create_test_transaction(
        db,
        amount,
        DueDateSpec::Relative {
            transaction_id: reference_id,
            offset_days,
        },
    )
    .await
}

/// Creates a transaction with custom type and party.
pub async fn create_custom_transaction(
    db: &DatabaseConnection,
    amount: i64,
    transaction_type: TransactionType,
    party: &str,
    due: DueDateSpec,
) -> Result<entities::transaction::Model> {
    transaction::create_transaction(
        db,
        TransactionFields {
            amount,
            transaction_type,
            party: party.to_string(),
            description: String::new(),
            due,
        },
    )
    .await
}

/// Creates an unanchored deposit with a description.
pub async fn create_described_transaction(
    db: &DatabaseConnection,
    description: &str,
) -> Result<entities::transaction::Model> {
    let mut input = fields(10, DueDateSpec::Unanchored);
    input.description = description.to_string();
    transaction::create_transaction(db, input).await
}

/// Inserts a transaction directly, bypassing the integrity guard. Used to reproduce
/// legacy rows such as dangling references.
pub async fn insert_raw_transaction(
    db: &DatabaseConnection,
    amount: i64,
    date: Option<NaiveDate>,
    reference_id: Option<i64>,
    offset_days: Option<i32>,
) -> Result<entities::transaction::Model> {
    let model = entities::transaction::ActiveModel {
        amount: Set(amount),
        transaction_type: Set(TransactionType::Deposit),
        party: Set("Legacy".to_string()),
        description: Set(String::new()),
        date: Set(date),
        relative_due_date_transaction_id: Set(reference_id),
        relative_due_date_offset_days: Set(offset_days),
        applied: Set(false),
        include_in_balance: Set(true),
        created_at: Set(Utc::now()),
        ..Default::default()
    };
    Ok(model.insert(db).await?)
}

/// Inserts two deposits that reference each other.
pub async fn insert_raw_cycle(
    db: &DatabaseConnection,
    amount: i64,
) -> Result<(entities::transaction::Model, entities::transaction::Model)> {
    let first = insert_raw_transaction(db, amount, None, None, None).await?;
    let second = insert_raw_transaction(db, amount, None, Some(first.id), Some(1)).await?;

    let mut first: entities::transaction::ActiveModel = first.into();
    first.relative_due_date_transaction_id = Set(Some(second.id));
    first.relative_due_date_offset_days = Set(Some(1));
    let first = first.update(db).await?;

    Ok((first, second))
}

/// Builds an in-memory transaction row, never persisted.
///
/// # Defaults
/// * no due date
/// * not applied, included in balance
pub fn model(
    id: i64,
    amount: i64,
    transaction_type: TransactionType,
) -> entities::transaction::Model {
    entities::transaction::Model {
        id,
        amount,
        transaction_type,
        party: "Test party".to_string(),
        description: String::new(),
        date: None,
        relative_due_date_transaction_id: None,
        relative_due_date_offset_days: None,
        applied: false,
        include_in_balance: true,
        created_at: Utc.timestamp_opt(1_700_000_000 + id, 0).single().unwrap_or_default(),
    }
}
