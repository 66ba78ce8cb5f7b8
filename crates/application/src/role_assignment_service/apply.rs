use std::sync::Arc;

use respsync_core::{AppError, AppResult};
use respsync_domain::{ReconciliationPlan, RoleAssignmentKey, RoleAssignmentRecord, StoreCapabilities};
use tracing::{debug, warn};

use crate::role_assignment_ports::{
    AssignmentMutation, MutationKind, RoleAssignmentStore, RoleLookup,
};

/// Store-call outcome classes the engine branches on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ErrorClass {
    /// Data-quality problem limited to one assignment.
    NotFound,
    /// Anything else; aborts the reconciliation.
    Other,
}

impl ErrorClass {
    fn of(error: &AppError) -> Self {
        match error {
            AppError::NotFound(_) => Self::NotFound,
            _ => Self::Other,
        }
    }
}

/// One plan entry that could not be applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureRecord {
    /// Mutation that failed.
    pub kind: MutationKind,
    /// Wire form of the record, or the key for deletions.
    pub subject: String,
    /// Underlying store error message.
    pub cause: String,
}

impl std::fmt::Display for FailureRecord {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            formatter,
            "{} '{}' failed: {}",
            self.kind.as_str(),
            self.subject,
            self.cause
        )
    }
}

/// Failures collected while applying a plan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorLog {
    failures: Vec<FailureRecord>,
}

impl ErrorLog {
    fn record(&mut self, failure: FailureRecord) {
        self.failures.push(failure);
    }

    /// Returns the collected failures in application order.
    #[must_use]
    pub fn failures(&self) -> &[FailureRecord] {
        &self.failures
    }

    /// Returns true when every entry was applied.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    /// Converts the log into a single aggregated error, if it has entries.
    pub fn into_result(self) -> AppResult<()> {
        if self.failures.is_empty() {
            return Ok(());
        }

        Err(AppError::Aggregated(
            self.failures.iter().map(ToString::to_string).collect(),
        ))
    }
}

/// Executes reconciliation plans against the store one mutation at a time.
#[derive(Clone)]
pub struct ApplyEngine {
    store: Arc<dyn RoleAssignmentStore>,
    capabilities: StoreCapabilities,
}

impl ApplyEngine {
    /// Creates an engine bound to one store session.
    #[must_use]
    pub fn new(store: Arc<dyn RoleAssignmentStore>, capabilities: StoreCapabilities) -> Self {
        Self {
            store,
            capabilities,
        }
    }

    /// Applies deletions, then additions, then updates.
    ///
    /// Entries whose role cannot be resolved are collected in the returned
    /// log and the remaining entries are still attempted. Any other store
    /// error stops the plan and is returned as is; mutations issued before
    /// it stay applied.
    pub async fn apply(&self, plan: &ReconciliationPlan, identity: &str) -> AppResult<ErrorLog> {
        let mut log = ErrorLog::default();

        for key in plan.to_delete() {
            self.delete(identity, key, &mut log).await?;
        }

        for record in plan.to_add() {
            self.write(MutationKind::Add, identity, record, &mut log)
                .await?;
        }

        for record in plan.to_update() {
            self.write(MutationKind::Update, identity, record, &mut log)
                .await?;
        }

        Ok(log)
    }

    async fn delete(
        &self,
        identity: &str,
        key: &RoleAssignmentKey,
        log: &mut ErrorLog,
    ) -> AppResult<()> {
        let mutation = AssignmentMutation::delete(identity, key);
        match self.store.mutate_assignment(&mutation).await {
            Ok(()) => {
                debug!(identity = %identity, assignment = %key, "assignment removed");
                Ok(())
            }
            Err(error) if ErrorClass::of(&error) == ErrorClass::NotFound => {
                warn!(identity = %identity, assignment = %key, error = %error, "assignment removal failed");
                log.record(FailureRecord {
                    kind: MutationKind::Delete,
                    subject: key.to_string(),
                    cause: error.to_string(),
                });
                Ok(())
            }
            Err(error) => Err(error),
        }
    }

    async fn write(
        &self,
        kind: MutationKind,
        identity: &str,
        record: &RoleAssignmentRecord,
        log: &mut ErrorLog,
    ) -> AppResult<()> {
        let mut mutation = AssignmentMutation::for_record(
            kind,
            identity,
            record,
            self.capabilities.description_column,
        );

        let qualified_error = match self.store.mutate_assignment(&mutation).await {
            Ok(()) => {
                debug!(identity = %identity, assignment = %record.key(), kind = kind.as_str(), "assignment applied");
                return Ok(());
            }
            Err(error) if ErrorClass::of(&error) == ErrorClass::NotFound => error,
            Err(error) => return Err(error),
        };

        warn!(
            identity = %identity,
            assignment = %record.key(),
            kind = kind.as_str(),
            error = %qualified_error,
            "role not resolved with its application; retrying by role name only"
        );
        mutation.lookup = RoleLookup::Unqualified;

        match self.store.mutate_assignment(&mutation).await {
            Ok(()) => {
                debug!(identity = %identity, assignment = %record.key(), kind = kind.as_str(), "assignment applied by role name");
                Ok(())
            }
            Err(error) if ErrorClass::of(&error) == ErrorClass::NotFound => {
                warn!(
                    identity = %identity,
                    assignment = %record.key(),
                    kind = kind.as_str(),
                    error = %error,
                    "assignment could not be resolved"
                );
                log.record(FailureRecord {
                    kind,
                    subject: record.to_wire(self.capabilities.description_column),
                    cause: error.to_string(),
                });
                Ok(())
            }
            Err(error) => Err(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use respsync_core::AppError;

    use super::{ErrorClass, ErrorLog, FailureRecord};
    use crate::MutationKind;

    #[test]
    fn only_not_found_is_recoverable() {
        assert_eq!(
            ErrorClass::of(&AppError::NotFound("role".to_owned())),
            ErrorClass::NotFound
        );
        assert_eq!(
            ErrorClass::of(&AppError::Internal("connection reset".to_owned())),
            ErrorClass::Other
        );
        assert_eq!(
            ErrorClass::of(&AppError::Conflict("duplicate".to_owned())),
            ErrorClass::Other
        );
    }

    #[test]
    fn empty_log_is_success() {
        assert!(ErrorLog::default().into_result().is_ok());
    }

    #[test]
    fn log_aggregates_every_failure() {
        let mut log = ErrorLog::default();
        log.record(FailureRecord {
            kind: MutationKind::Add,
            subject: "RoleA||AppX||GroupY||2024-01-01 00:00:00.0||null".to_owned(),
            cause: "not found: role 'RoleA' was not found".to_owned(),
        });
        log.record(FailureRecord {
            kind: MutationKind::Delete,
            subject: "RoleB||AppX||GroupY".to_owned(),
            cause: "not found: assignment was not found".to_owned(),
        });

        let Err(AppError::Aggregated(messages)) = log.into_result() else {
            panic!("expected aggregated error");
        };
        assert_eq!(messages.len(), 2);
        assert!(messages[0].starts_with("add 'RoleA||AppX||GroupY"));
        assert!(messages[1].starts_with("delete 'RoleB||AppX||GroupY'"));
    }
}
