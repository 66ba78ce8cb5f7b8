//! Role ("responsibility") assignment records and their comparison rules.

mod codec;
mod set;
mod temporal;

use respsync_core::{AppError, AppResult, NonEmptyString};
use serde::{Deserialize, Serialize};

pub use codec::FIELD_DELIMITER;
pub use set::AssignmentSet;
pub use temporal::{NormalizedTemporal, TemporalValue};

/// Identity of an assignment, independent of validity window or description.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RoleAssignmentKey {
    role_name: NonEmptyString,
    application_name: NonEmptyString,
    security_group_name: NonEmptyString,
}

impl RoleAssignmentKey {
    /// Creates a key from its three mandatory name parts.
    pub fn new(
        role_name: impl Into<String>,
        application_name: impl Into<String>,
        security_group_name: impl Into<String>,
    ) -> AppResult<Self> {
        let part = |label: &str, value: String| {
            NonEmptyString::new(value).map_err(|_| {
                AppError::Validation(format!("role assignment {label} must not be empty"))
            })
        };

        Ok(Self {
            role_name: part("role name", role_name.into())?,
            application_name: part("application name", application_name.into())?,
            security_group_name: part("security group name", security_group_name.into())?,
        })
    }

    /// Returns the role (responsibility) name.
    #[must_use]
    pub fn role_name(&self) -> &str {
        self.role_name.as_str()
    }

    /// Returns the owning application name.
    #[must_use]
    pub fn application_name(&self) -> &str {
        self.application_name.as_str()
    }

    /// Returns the security group name.
    #[must_use]
    pub fn security_group_name(&self) -> &str {
        self.security_group_name.as_str()
    }
}

impl std::fmt::Display for RoleAssignmentKey {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            formatter,
            "{}{FIELD_DELIMITER}{}{FIELD_DELIMITER}{}",
            self.role_name, self.application_name, self.security_group_name
        )
    }
}

/// One role assignment with its validity window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleAssignmentRecord {
    key: RoleAssignmentKey,
    description: Option<String>,
    start_date: TemporalValue,
    end_date: TemporalValue,
}

impl RoleAssignmentRecord {
    /// Creates a record. Blank descriptions are treated as absent.
    #[must_use]
    pub fn new(
        key: RoleAssignmentKey,
        description: Option<String>,
        start_date: TemporalValue,
        end_date: TemporalValue,
    ) -> Self {
        Self {
            key,
            description: description.filter(|value| !value.trim().is_empty()),
            start_date,
            end_date,
        }
    }

    /// Returns the assignment key.
    #[must_use]
    pub fn key(&self) -> &RoleAssignmentKey {
        &self.key
    }

    /// Returns the optional description.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Returns the start of the validity window.
    #[must_use]
    pub fn start_date(&self) -> TemporalValue {
        self.start_date
    }

    /// Returns the end of the validity window.
    #[must_use]
    pub fn end_date(&self) -> TemporalValue {
        self.end_date
    }

    /// Returns the same record with the description removed.
    #[must_use]
    pub fn without_description(self) -> Self {
        Self {
            description: None,
            ..self
        }
    }

    /// Returns true when the validity window contains `now`.
    ///
    /// A server-time start counts as already started.
    #[must_use]
    pub fn is_active_at(&self, now: chrono::NaiveDateTime) -> bool {
        let started = match self.start_date {
            TemporalValue::Explicit(start) => start <= now,
            TemporalValue::Null | TemporalValue::ServerNow => true,
        };
        let ended = match self.end_date {
            TemporalValue::Explicit(end) => end <= now,
            TemporalValue::Null | TemporalValue::ServerNow => false,
        };

        started && !ended
    }

    /// Returns the day-resolution comparison form of this record.
    #[must_use]
    pub fn normalize(&self) -> NormalizedRecord {
        NormalizedRecord {
            key: self.key.clone(),
            description: self.description.clone(),
            start_date: self.start_date.truncated_to_day(),
            end_date: self.end_date.truncated_to_day(),
        }
    }

    /// Returns the comparison form of this desired record as it would read
    /// back next to the persisted `current` record.
    ///
    /// The store replaces a server-time start with a timestamp when writing,
    /// so a desired `ServerNow` start matches any explicit current start. A
    /// `ServerNow` end matches an explicit current end only once that end has
    /// passed at `now`; an end still in the future must be moved.
    #[must_use]
    pub fn normalize_against(
        &self,
        current: &Self,
        now: chrono::NaiveDateTime,
    ) -> NormalizedRecord {
        let start_date = match (self.start_date, current.start_date) {
            (TemporalValue::ServerNow, TemporalValue::Explicit(_)) => current.start_date,
            (start_date, _) => start_date,
        };
        let end_date = match (self.end_date, current.end_date) {
            (TemporalValue::ServerNow, TemporalValue::Explicit(end)) if end <= now => {
                current.end_date
            }
            (end_date, _) => end_date,
        };

        NormalizedRecord {
            key: self.key.clone(),
            description: self.description.clone(),
            start_date: start_date.truncated_to_day(),
            end_date: end_date.truncated_to_day(),
        }
    }
}

/// Comparison-only projection of a record with dates truncated to days.
///
/// Never serialized back to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedRecord {
    key: RoleAssignmentKey,
    description: Option<String>,
    start_date: NormalizedTemporal,
    end_date: NormalizedTemporal,
}
