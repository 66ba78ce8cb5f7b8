use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

use respsync_core::{AppError, AppResult};

use super::{RoleAssignmentKey, RoleAssignmentRecord};

/// Records indexed by key, at most one record per key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssignmentSet {
    records: BTreeMap<RoleAssignmentKey, RoleAssignmentRecord>,
}

impl AssignmentSet {
    /// Builds a set from caller-supplied records.
    ///
    /// Exact duplicates collapse. Two different records with one key are
    /// rejected because the intended state is ambiguous.
    pub fn from_desired(records: impl IntoIterator<Item = RoleAssignmentRecord>) -> AppResult<Self> {
        let mut set = Self::default();
        for record in records {
            match set.records.entry(record.key().clone()) {
                Entry::Vacant(entry) => {
                    entry.insert(record);
                }
                Entry::Occupied(entry) if entry.get() == &record => {}
                Entry::Occupied(entry) => {
                    return Err(AppError::Validation(format!(
                        "role assignment '{}' is listed more than once with different values",
                        entry.key()
                    )));
                }
            }
        }

        Ok(set)
    }

    /// Builds a set from persisted records, keeping the first row per key.
    ///
    /// Returns the set and the rows that were shadowed by an earlier row.
    #[must_use]
    pub fn from_persisted(
        records: impl IntoIterator<Item = RoleAssignmentRecord>,
    ) -> (Self, Vec<RoleAssignmentRecord>) {
        let mut set = Self::default();
        let mut shadowed = Vec::new();
        for record in records {
            match set.records.entry(record.key().clone()) {
                Entry::Vacant(entry) => {
                    entry.insert(record);
                }
                Entry::Occupied(_) => shadowed.push(record),
            }
        }

        (set, shadowed)
    }

    /// Returns the record stored for `key`.
    #[must_use]
    pub fn get(&self, key: &RoleAssignmentKey) -> Option<&RoleAssignmentRecord> {
        self.records.get(key)
    }

    /// Returns true when a record exists for `key`.
    #[must_use]
    pub fn contains_key(&self, key: &RoleAssignmentKey) -> bool {
        self.records.contains_key(key)
    }

    /// Iterates records in key order.
    pub fn iter(&self) -> impl Iterator<Item = &RoleAssignmentRecord> {
        self.records.values()
    }

    /// Returns the number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true when the set holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
