//! Transaction entity - Represents a pending or applied deposit/withdrawal.
//!
//! The due date is either a fixed `date` or relative to another transaction through
//! `relative_due_date_transaction_id` plus `relative_due_date_offset_days`. The reference
//! is weak: there is no foreign key, so it may point at a transaction that no longer exists.
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Direction of a transaction, stored as `"DEPOSIT"` or `"WITHDRAW"`.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "Text")]
pub enum TransactionType {
    /// Money coming in
    #[sea_orm(string_value = "DEPOSIT")]
    Deposit,
    /// Money going out
    #[sea_orm(string_value = "WITHDRAW")]
    Withdraw,
}

impl TransactionType {
    /// `+1` for deposits, `-1` for withdrawals.
    #[must_use]
    pub const fn sign(self) -> i64 {
        match self {
            Self::Deposit => 1,
            Self::Withdraw => -1,
        }
    }
}

/// Transaction database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "transactions")]
pub struct Model {
    /// Unique identifier for the transaction
    #[sea_orm(primary_key)]
    pub id: i64,
    /// Unsigned amount in minor currency units, always positive
    pub amount: i64,
    /// Deposit or withdrawal
    pub transaction_type: TransactionType,
    /// Counterparty name
    pub party: String,
    /// Free-form description, empty when not given
    pub description: String,
    /// Fixed due date
    pub date: Option<Date>,
    /// Transaction whose resolved due date this one is relative to
    pub relative_due_date_transaction_id: Option<i64>,
    /// Calendar days added to the referenced transaction's resolved due date
    pub relative_due_date_offset_days: Option<i32>,
    /// Folded into the baseline and excluded from every balance
    pub applied: bool,
    /// Soft exclude from balances while not applied
    pub include_in_balance: bool,
    /// Insertion timestamp, used as a stable ordering tie-break
    pub created_at: DateTimeUtc,
}

impl Model {
    /// Amount with the sign of the transaction type applied.
    #[must_use]
    pub const fn signed_amount(&self) -> i64 {
        self.amount * self.transaction_type.sign()
    }

    /// Whether this transaction contributes to computed balances.
    #[must_use]
    pub const fn is_eligible(&self) -> bool {
        !self.applied && self.include_in_balance
    }
}

/// Relative due dates are weak references, so no relation is declared.
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
