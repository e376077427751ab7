//! Settings business logic - Reads and moves the baseline balance.
//!
//! The settings table holds a single row. It is created on first use with the requested
//! initial baseline, so every reader can assume it exists.

use crate::{
    entities::{Settings, settings},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, prelude::*};
use tracing::info;

/// Returns the settings row, inserting it with `initial_baseline` if it does not exist yet.
pub async fn get_or_create_settings<C>(db: &C, initial_baseline: i64) -> Result<settings::Model>
where
    C: ConnectionTrait,
{
    let existing = Settings::find()
        .order_by_asc(settings::Column::Id)
        .one(db)
        .await?;

    if let Some(settings) = existing {
        return Ok(settings);
    }

    let settings = settings::ActiveModel {
        baseline_balance: Set(initial_baseline),
        updated_at: Set(chrono::Utc::now()),
        ..Default::default()
    };
    let created = settings.insert(db).await?;
    info!(
        baseline_balance = created.baseline_balance,
        "Created settings row"
    );
    Ok(created)
}

/// Returns the settings row, creating it with a zero baseline if needed.
pub async fn get_settings(db: &DatabaseConnection) -> Result<settings::Model> {
    get_or_create_settings(db, 0).await
}

/// Ensures the settings row exists, seeding it with `initial_baseline`.
///
/// An existing row is left untouched, so this is safe to call on every start.
pub async fn ensure_settings(
    db: &DatabaseConnection,
    initial_baseline: i64,
) -> Result<settings::Model> {
    get_or_create_settings(db, initial_baseline).await
}

/// Returns the current baseline balance, 0 while the settings row does not exist.
///
/// This is a pure read; the row is only created by writers.
pub async fn get_baseline_balance<C>(db: &C) -> Result<i64>
where
    C: ConnectionTrait,
{
    let settings = Settings::find()
        .order_by_asc(settings::Column::Id)
        .one(db)
        .await?;
    Ok(settings.map_or(0, |settings| settings.baseline_balance))
}

/// Overwrites the baseline balance. This is the explicit admin edit; applying a
/// transaction moves the baseline through [`crate::core::apply::apply_transaction`].
pub async fn set_baseline_balance(
    db: &DatabaseConnection,
    baseline_balance: i64,
) -> Result<settings::Model> {
    let mut settings: settings::ActiveModel = get_or_create_settings(db, 0).await?.into();
    settings.baseline_balance = Set(baseline_balance);
    settings.updated_at = Set(chrono::Utc::now());

    let updated = settings.update(db).await?;
    info!(baseline_balance, "Baseline balance set");
    Ok(updated)
}

/// Adds `delta` to the baseline with a single `UPDATE settings SET baseline_balance =
/// baseline_balance + ?` and returns the new value.
///
/// # Errors
/// Returns `BalanceOverflow`, without writing, if the new baseline would not fit in an
/// `i64`.
pub(crate) async fn add_to_baseline<C>(db: &C, delta: i64) -> Result<i64>
where
    C: ConnectionTrait,
{
    use sea_orm::sea_query::Expr;

    let settings = get_or_create_settings(db, 0).await?;
    if settings.baseline_balance.checked_add(delta).is_none() {
        return Err(Error::BalanceOverflow);
    }

    Settings::update_many()
        .col_expr(
            settings::Column::BaselineBalance,
            Expr::col(settings::Column::BaselineBalance).add(delta),
        )
        .col_expr(settings::Column::UpdatedAt, Expr::value(chrono::Utc::now()))
        .filter(settings::Column::Id.eq(settings.id))
        .exec(db)
        .await?;

    get_baseline_balance(db).await
}
