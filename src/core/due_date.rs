//! Due date resolution - Follows relative due date chains to a fixed date.
//!
//! Relative due dates form a directed graph that may contain dangling links or, in
//! corrupted data, cycles. [`DueDateGraph`] holds an explicit id-to-node map and resolves
//! with an iterative walk over a visited set, so resolution always terminates and never
//! yields a date for a broken chain.

use crate::{
    entities::{Transaction, transaction},
    errors::{Error, Result},
};
use chrono::{NaiveDate, TimeDelta};
use sea_orm::{ConnectionTrait, DatabaseConnection, EntityTrait};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use tracing::warn;

/// Outcome of resolving a transaction's due date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DueDate {
    /// The chain ended at a fixed date
    Resolved(NaiveDate),
    /// The chain ended at a transaction with neither a date nor a reference
    Unanchored,
    /// The chain points at a transaction that does not exist
    Dangling {
        /// Id that could not be found
        missing_id: i64,
    },
    /// The chain revisits a transaction
    Cycle {
        /// First transaction seen twice
        at: i64,
    },
    /// Adding the accumulated offset left the representable calendar
    OutOfRange,
}

impl DueDate {
    /// The resolved date, if any.
    #[must_use]
    pub const fn date(self) -> Option<NaiveDate> {
        match self {
            Self::Resolved(date) => Some(date),
            _ => None,
        }
    }

    /// Whether a date was resolved.
    #[must_use]
    pub const fn is_resolved(self) -> bool {
        matches!(self, Self::Resolved(_))
    }
}

/// The due date fields of a single transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DueDateNode {
    /// Fixed due date
    pub date: Option<NaiveDate>,
    /// Transaction this one is relative to
    pub reference: Option<i64>,
    /// Offset from the referenced transaction, 0 when missing
    pub offset_days: i32,
}

impl From<&transaction::Model> for DueDateNode {
    fn from(model: &transaction::Model) -> Self {
        Self {
            date: model.date,
            reference: model.relative_due_date_transaction_id,
            offset_days: model.relative_due_date_offset_days.unwrap_or(0),
        }
    }
}

/// Adjacency map of relative due date references, keyed by transaction id.
#[derive(Debug, Clone, Default)]
pub struct DueDateGraph {
    nodes: HashMap<i64, DueDateNode>,
}

impl DueDateGraph {
    /// Builds the graph from transaction rows.
    pub fn from_transactions<'a, I>(transactions: I) -> Self
    where
        I: IntoIterator<Item = &'a transaction::Model>,
    {
        let nodes = transactions
            .into_iter()
            .map(|model| (model.id, DueDateNode::from(model)))
            .collect();
        Self { nodes }
    }

    /// Loads every transaction, applied or not, since applied transactions can still
    /// anchor other transactions' due dates.
    pub async fn load<C>(db: &C) -> Result<Self>
    where
        C: ConnectionTrait,
    {
        let transactions = Transaction::find().all(db).await?;
        Ok(Self::from_transactions(&transactions))
    }

    /// Inserts or replaces a node.
    pub fn insert(&mut self, id: i64, node: DueDateNode) {
        self.nodes.insert(id, node);
    }

    /// Whether the graph knows this id.
    #[must_use]
    pub fn contains(&self, id: i64) -> bool {
        self.nodes.contains_key(&id)
    }

    /// The transaction `id` is relative to, if `id` exists and has a reference.
    #[must_use]
    pub fn reference_of(&self, id: i64) -> Option<i64> {
        self.nodes.get(&id).and_then(|node| node.reference)
    }

    /// Ids of the transactions directly relative to `id`.
    #[must_use]
    pub fn dependents_of(&self, id: i64) -> Vec<i64> {
        let mut dependents: Vec<i64> = self
            .nodes
            .iter()
            .filter(|(_, node)| node.reference == Some(id))
            .map(|(dependent, _)| *dependent)
            .collect();
        dependents.sort_unstable();
        dependents
    }

    /// Resolves the due date of `id`.
    ///
    /// The walk accumulates the offset of every node that holds a reference and adds the
    /// total to the terminal fixed date. A reference takes precedence over a fixed date on
    /// the same node.
    #[must_use]
    pub fn resolve(&self, id: i64) -> DueDate {
        let mut visited = HashSet::new();
        let mut offset_days: i64 = 0;
        let mut current = id;

        loop {
            let Some(node) = self.nodes.get(&current) else {
                return DueDate::Dangling {
                    missing_id: current,
                };
            };

            if !visited.insert(current) {
                warn!(
                    transaction_id = id,
                    cycle_at = current,
                    "Due date reference cycle in stored data"
                );
                return DueDate::Cycle { at: current };
            }

            match (node.reference, node.date) {
                (Some(next), _) => {
                    offset_days += i64::from(node.offset_days);
                    current = next;
                }
                (None, Some(date)) => return add_days(date, offset_days),
                (None, None) => return DueDate::Unanchored,
            }
        }
    }

    /// Resolves every transaction in the graph, agreeing with [`Self::resolve`] for
    /// each id.
    ///
    /// Each node is walked once: a walk stops at the first node already settled and
    /// the walked path is settled on the way back, so the whole pass is linear.
    #[must_use]
    pub fn resolve_all(&self) -> HashMap<i64, DueDate> {
        let mut settled: HashMap<i64, (Anchor, i64)> = HashMap::with_capacity(self.nodes.len());

        for &start in self.nodes.keys() {
            if settled.contains_key(&start) {
                continue;
            }

            let mut path = Vec::new();
            let mut on_path = HashSet::new();
            let mut current = start;

            let ending = loop {
                if let Some(&(anchor, offset_days)) = settled.get(&current) {
                    break (anchor, offset_days);
                }
                let Some(node) = self.nodes.get(&current) else {
                    break (
                        Anchor::Failed(DueDate::Dangling {
                            missing_id: current,
                        }),
                        0,
                    );
                };

                if !on_path.insert(current) {
                    // Every member of the cycle is its own first revisit
                    let entry = path.iter().position(|&id| id == current).unwrap_or(0);
                    warn!(
                        transaction_id = start,
                        cycle_at = current,
                        "Due date reference cycle in stored data"
                    );
                    for &member in &path[entry..] {
                        let cycle = Anchor::Failed(DueDate::Cycle { at: member });
                        settled.insert(member, (cycle, 0));
                    }
                    path.truncate(entry);
                    break (Anchor::Failed(DueDate::Cycle { at: current }), 0);
                }

                path.push(current);
                match (node.reference, node.date) {
                    (Some(next), _) => current = next,
                    (None, Some(date)) => break (Anchor::Date(date), 0),
                    (None, None) => break (Anchor::Failed(DueDate::Unanchored), 0),
                }
            };

            let (anchor, mut offset_days) = ending;
            for &id in path.iter().rev() {
                if let Some(node) = self.nodes.get(&id).filter(|node| node.reference.is_some()) {
                    offset_days += i64::from(node.offset_days);
                }
                settled.insert(id, (anchor, offset_days));
            }
        }

        settled
            .into_iter()
            .map(|(id, (anchor, offset_days))| {
                let due = match anchor {
                    Anchor::Date(date) => add_days(date, offset_days),
                    Anchor::Failed(due) => due,
                };
                (id, due)
            })
            .collect()
    }
}

/// Where a walk ended, before the accumulated offset is applied.
#[derive(Debug, Clone, Copy)]
enum Anchor {
    Date(NaiveDate),
    Failed(DueDate),
}

fn add_days(date: NaiveDate, days: i64) -> DueDate {
    TimeDelta::try_days(days)
        .and_then(|delta| date.checked_add_signed(delta))
        .map_or(DueDate::OutOfRange, DueDate::Resolved)
}

/// Resolves the effective due date of a stored transaction.
///
/// Returns `Ok(None)` when the chain is unanchored, dangling or cyclic. Callers treat that
/// as "no due date", not as a failure.
///
/// # Errors
/// Returns `NotFound` if the transaction does not exist, or a persistence error.
pub async fn resolve_due_date(
    db: &DatabaseConnection,
    transaction_id: i64,
) -> Result<Option<NaiveDate>> {
    let graph = DueDateGraph::load(db).await?;
    if !graph.contains(transaction_id) {
        return Err(Error::transaction_not_found(transaction_id));
    }
    Ok(graph.resolve(transaction_id).date())
}
