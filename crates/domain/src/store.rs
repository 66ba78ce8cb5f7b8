use std::str::FromStr;

use respsync_core::AppError;
use serde::{Deserialize, Serialize};

/// Which assignment source a current-state query reads.
///
/// Only meaningful under the multi-view store layout; the legacy layout has a
/// single assignment table and ignores the scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentScope {
    /// Assignments granted to the identity directly.
    Direct,
    /// Assignments inherited through role hierarchies.
    Indirect,
    /// The single-table legacy source.
    Legacy,
}

impl AssignmentScope {
    /// Returns a stable transport value for this scope.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Direct => "direct",
            Self::Indirect => "indirect",
            Self::Legacy => "legacy",
        }
    }
}

impl FromStr for AssignmentScope {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "direct" => Ok(Self::Direct),
            "indirect" => Ok(Self::Indirect),
            "legacy" => Ok(Self::Legacy),
            _ => Err(AppError::Validation(format!(
                "unknown assignment scope '{value}'"
            ))),
        }
    }
}

/// Store features detected once per session and passed to every adapter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreCapabilities {
    /// Assignment views expose a description column.
    pub description_column: bool,
    /// Assignments are read from separate direct/indirect views instead of
    /// the legacy table.
    pub multi_view_layout: bool,
}

impl StoreCapabilities {
    /// Returns the scope used when reading assignments that reconciliation
    /// is allowed to change.
    #[must_use]
    pub fn managed_scope(&self) -> AssignmentScope {
        if self.multi_view_layout {
            AssignmentScope::Direct
        } else {
            AssignmentScope::Legacy
        }
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::{AssignmentScope, StoreCapabilities};

    #[test]
    fn scope_roundtrip_transport_value() {
        for scope in [
            AssignmentScope::Direct,
            AssignmentScope::Indirect,
            AssignmentScope::Legacy,
        ] {
            assert!(matches!(AssignmentScope::from_str(scope.as_str()), Ok(parsed) if parsed == scope));
        }
    }

    #[test]
    fn unknown_scope_is_rejected() {
        assert!(AssignmentScope::from_str("inherited").is_err());
    }

    #[test]
    fn managed_scope_follows_layout() {
        let legacy = StoreCapabilities::default();
        let views = StoreCapabilities {
            description_column: true,
            multi_view_layout: true,
        };

        assert_eq!(legacy.managed_scope(), AssignmentScope::Legacy);
        assert_eq!(views.managed_scope(), AssignmentScope::Direct);
    }
}
