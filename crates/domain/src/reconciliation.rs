//! Reconciliation planning between persisted and desired assignments.

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::role_assignment::{AssignmentSet, RoleAssignmentKey, RoleAssignmentRecord};

/// Minimal set of edits turning the current assignments into the desired
/// ones. Entries within each group are in key order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconciliationPlan {
    to_delete: Vec<RoleAssignmentKey>,
    to_add: Vec<RoleAssignmentRecord>,
    to_update: Vec<RoleAssignmentRecord>,
}

impl ReconciliationPlan {
    /// Keys to remove. Applied first.
    #[must_use]
    pub fn to_delete(&self) -> &[RoleAssignmentKey] {
        &self.to_delete
    }

    /// Records to create. Applied after deletions.
    #[must_use]
    pub fn to_add(&self) -> &[RoleAssignmentRecord] {
        &self.to_add
    }

    /// Records whose window or description changes. Applied last.
    #[must_use]
    pub fn to_update(&self) -> &[RoleAssignmentRecord] {
        &self.to_update
    }

    /// Total number of planned mutations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.to_delete.len() + self.to_add.len() + self.to_update.len()
    }

    /// Returns true when nothing needs to change.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Computes the edits that bring `current` to `desired`.
///
/// A current record missing from `desired` whose end date is an explicit
/// timestamp before `now` has already lapsed and is left untouched. Desired
/// server-time boundaries are compared against the timestamps the store
/// already holds for them.
#[must_use]
pub fn diff(
    current: &AssignmentSet,
    desired: &AssignmentSet,
    now: NaiveDateTime,
) -> ReconciliationPlan {
    let to_delete = current
        .iter()
        .filter(|record| !desired.contains_key(record.key()))
        .filter(|record| !record.end_date().is_explicitly_before(now))
        .map(|record| record.key().clone())
        .collect();

    let mut to_add = Vec::new();
    let mut to_update = Vec::new();
    for record in desired.iter() {
        match current.get(record.key()) {
            None => to_add.push(record.clone()),
            Some(existing)
                if existing.normalize() != record.normalize_against(existing, now) =>
            {
                to_update.push(record.clone());
            }
            Some(_) => {}
        }
    }

    ReconciliationPlan {
        to_delete,
        to_add,
        to_update,
    }
}
