//! Settings entity - The singleton row holding the baseline balance.
//!
//! Only the apply engine and the explicit admin edit move `baseline_balance`.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Settings database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "settings")]
pub struct Model {
    /// Unique identifier
    #[sea_orm(primary_key)]
    pub id: i32,
    /// Balance checkpoint that applied transactions have been folded into
    pub baseline_balance: i64,
    /// When the baseline was last modified
    pub updated_at: DateTimeUtc,
}

/// `Settings` has no relationships with other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
