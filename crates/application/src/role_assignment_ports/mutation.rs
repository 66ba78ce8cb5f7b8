use respsync_domain::{RoleAssignmentKey, RoleAssignmentRecord, TemporalValue};

/// Kind of single-assignment change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MutationKind {
    /// Grant a new assignment.
    Add,
    /// Change the window or description of an existing assignment.
    Update,
    /// Remove an assignment by key.
    Delete,
}

impl MutationKind {
    /// Returns a stable label for logs and error messages.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

/// How the store resolves the role named by a mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RoleLookup {
    /// Match role name and application name.
    Qualified,
    /// Match role name only.
    Unqualified,
}

/// Parameters of one store mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssignmentMutation {
    /// Kind of change.
    pub kind: MutationKind,
    /// Identity (user name) owning the assignment.
    pub identity: String,
    /// Assignment key.
    pub key: RoleAssignmentKey,
    /// Role resolution strategy.
    pub lookup: RoleLookup,
    /// Start of the validity window. `Null` for deletions.
    pub start_date: TemporalValue,
    /// End of the validity window. `Null` for deletions.
    pub end_date: TemporalValue,
    /// Description, when the store supports one.
    pub description: Option<String>,
}

impl AssignmentMutation {
    /// Builds an add or update mutation from a record.
    #[must_use]
    pub fn for_record(
        kind: MutationKind,
        identity: &str,
        record: &RoleAssignmentRecord,
        include_description: bool,
    ) -> Self {
        Self {
            kind,
            identity: identity.to_owned(),
            key: record.key().clone(),
            lookup: RoleLookup::Qualified,
            start_date: record.start_date(),
            end_date: record.end_date(),
            description: record
                .description()
                .filter(|_| include_description)
                .map(ToOwned::to_owned),
        }
    }

    /// Builds a deletion by key.
    #[must_use]
    pub fn delete(identity: &str, key: &RoleAssignmentKey) -> Self {
        Self {
            kind: MutationKind::Delete,
            identity: identity.to_owned(),
            key: key.clone(),
            lookup: RoleLookup::Qualified,
            start_date: TemporalValue::Null,
            end_date: TemporalValue::Null,
            description: None,
        }
    }
}
