//! Integrity guard for the relative due date graph.
//!
//! Writes that set a relative due date are checked before anything is persisted: the
//! referenced transaction must exist and its chain must not lead back to the transaction
//! being written. Deleting a transaction rewrites its dependents to the fixed date they
//! resolved to just before the delete, so no reference is left dangling.

use crate::{
    core::{due_date::DueDateGraph, transaction::DueDateSpec},
    entities::{Transaction, transaction},
    errors::{Error, Result},
};
use sea_orm::{ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set};
use std::collections::HashSet;
use tracing::{debug, warn};

/// Checks a due date about to be written for `transaction_id` (`None` while creating).
///
/// Fixed and unanchored due dates always pass.
///
/// # Errors
/// * `CycleDetected` - the reference is the transaction itself, its chain leads back to
///   the transaction, or the chain already contains a cycle
/// * `ReferenceNotFound` - the referenced transaction does not exist
pub async fn check_due_date_reference<C>(
    db: &C,
    transaction_id: Option<i64>,
    due: &DueDateSpec,
) -> Result<()>
where
    C: ConnectionTrait,
{
    let DueDateSpec::Relative {
        transaction_id: reference_id,
        ..
    } = *due
    else {
        return Ok(());
    };

    if transaction_id == Some(reference_id) {
        return Err(Error::CycleDetected {
            transaction_id,
            reference_id,
        });
    }

    let graph = DueDateGraph::load(db).await?;
    check_reference_chain(&graph, transaction_id, reference_id)
}

/// Walks forward from `reference_id` through `graph`.
///
/// A missing node further up the chain ends the walk; only the first link has to exist.
pub fn check_reference_chain(
    graph: &DueDateGraph,
    transaction_id: Option<i64>,
    reference_id: i64,
) -> Result<()> {
    if !graph.contains(reference_id) {
        return Err(Error::ReferenceNotFound { id: reference_id });
    }

    let mut visited: HashSet<i64> = transaction_id.into_iter().collect();
    let mut current = Some(reference_id);

    while let Some(id) = current {
        if !graph.contains(id) {
            break;
        }
        if !visited.insert(id) {
            warn!(
                ?transaction_id,
                reference_id,
                cycle_at = id,
                "Rejected due date reference that leads into a cycle"
            );
            return Err(Error::CycleDetected {
                transaction_id,
                reference_id,
            });
        }
        current = graph.reference_of(id);
    }

    Ok(())
}

/// Rewrites every transaction that is relative to `deleted_id` to carry its currently
/// resolved due date as a fixed date, clearing the reference. A dependent whose chain does
/// not resolve is left without a due date.
///
/// Must run on the same database transaction as the delete. Returns the number of
/// dependents rewritten.
pub async fn detach_dependents<C>(db: &C, deleted_id: i64) -> Result<usize>
where
    C: ConnectionTrait,
{
    let graph = DueDateGraph::load(db).await?;

    let dependents = Transaction::find()
        .filter(transaction::Column::RelativeDueDateTransactionId.eq(deleted_id))
        .filter(transaction::Column::Id.ne(deleted_id))
        .all(db)
        .await?;

    let count = dependents.len();
    for dependent in dependents {
        let resolved = graph.resolve(dependent.id);
        debug!(
            dependent_id = dependent.id,
            deleted_id,
            ?resolved,
            "Detaching dependent from deleted transaction"
        );

        let mut active: transaction::ActiveModel = dependent.into();
        active.date = Set(resolved.date());
        active.relative_due_date_transaction_id = Set(None);
        active.relative_due_date_offset_days = Set(None);
        active.update(db).await?;
    }

    Ok(count)
}
