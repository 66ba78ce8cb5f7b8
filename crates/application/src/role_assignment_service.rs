use std::sync::Arc;

use respsync_core::{AppError, AppResult, NonEmptyString};
use respsync_domain::{AssignmentScope, AssignmentSet, RoleAssignmentRecord, StoreCapabilities};
use serde::Serialize;
use tracing::warn;

use crate::role_assignment_ports::{Clock, RoleAssignmentStore};

mod apply;
mod read;
mod reconcile;

pub use apply::{ApplyEngine, ErrorLog, FailureRecord};

/// Counts of mutations applied by a successful reconciliation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReconciliationSummary {
    /// Assignments removed.
    pub deleted: usize,
    /// Assignments granted.
    pub added: usize,
    /// Assignments whose window or description changed.
    pub updated: usize,
}

/// Application service reconciling an identity's role assignments.
#[derive(Clone)]
pub struct RoleAssignmentService {
    store: Arc<dyn RoleAssignmentStore>,
    clock: Arc<dyn Clock>,
    capabilities: StoreCapabilities,
}

impl RoleAssignmentService {
    /// Creates a new service from required dependencies.
    ///
    /// `capabilities` must be the flags detected for the store's session.
    #[must_use]
    pub fn new(
        store: Arc<dyn RoleAssignmentStore>,
        clock: Arc<dyn Clock>,
        capabilities: StoreCapabilities,
    ) -> Self {
        Self {
            store,
            clock,
            capabilities,
        }
    }

    fn validated_identity(identity: &str) -> AppResult<NonEmptyString> {
        NonEmptyString::new(identity)
            .map_err(|_| AppError::Validation("identity must not be empty".to_owned()))
    }

    fn fit_to_store(&self, record: RoleAssignmentRecord) -> RoleAssignmentRecord {
        if self.capabilities.description_column {
            record
        } else {
            record.without_description()
        }
    }

    fn parse_desired(&self, desired: &[String]) -> AppResult<AssignmentSet> {
        let records = desired
            .iter()
            .map(|raw| RoleAssignmentRecord::parse(raw).map(|record| self.fit_to_store(record)))
            .collect::<AppResult<Vec<_>>>()?;

        AssignmentSet::from_desired(records)
    }

    async fn fetch_records(
        &self,
        identity: &str,
        scope: AssignmentScope,
        active_only: bool,
    ) -> AppResult<Vec<RoleAssignmentRecord>> {
        let rows = self
            .store
            .fetch_current_assignments(identity, scope, active_only)
            .await
            .map_err(|error| match error {
                AppError::StoreQuery(message) => AppError::StoreQuery(message),
                other => AppError::StoreQuery(format!(
                    "failed to fetch assignments for '{identity}': {other}"
                )),
            })?;

        rows.iter()
            .map(|raw| {
                RoleAssignmentRecord::parse(raw)
                    .map(|record| self.fit_to_store(record))
                    .map_err(|error| {
                        AppError::StoreQuery(format!(
                            "store returned an unreadable assignment for '{identity}': {error}"
                        ))
                    })
            })
            .collect()
    }

    async fn fetch_current(&self, identity: &str) -> AppResult<AssignmentSet> {
        let records = self
            .fetch_records(identity, self.capabilities.managed_scope(), false)
            .await?;
        let (current, shadowed) = AssignmentSet::from_persisted(records);

        for record in &shadowed {
            warn!(
                identity = %identity,
                assignment = %record.key(),
                "ignoring duplicate persisted assignment; the first row is reconciled"
            );
        }

        Ok(current)
    }
}
