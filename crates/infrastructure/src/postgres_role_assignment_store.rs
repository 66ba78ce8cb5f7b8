use async_trait::async_trait;
use chrono::NaiveDateTime;
use sqlx::{FromRow, PgPool};
use tracing::debug;

use respsync_application::{AssignmentMutation, MutationKind, RoleAssignmentStore, RoleLookup};
use respsync_core::{AppError, AppResult};
use respsync_domain::{
    AssignmentScope, RoleAssignmentKey, RoleAssignmentRecord, StoreCapabilities, TemporalValue,
};

mod capabilities;
mod mutations;
mod query;

pub use capabilities::detect_store_capabilities;

/// PostgreSQL-backed role assignment store.
#[derive(Clone)]
pub struct PostgresRoleAssignmentStore {
    pool: PgPool,
    capabilities: StoreCapabilities,
}

impl PostgresRoleAssignmentStore {
    /// Creates a store with the provided connection pool.
    ///
    /// `capabilities` must describe the schema behind `pool`; use
    /// [`detect_store_capabilities`] once per session.
    #[must_use]
    pub fn new(pool: PgPool, capabilities: StoreCapabilities) -> Self {
        Self { pool, capabilities }
    }

    /// Returns the capabilities this store was created with.
    #[must_use]
    pub fn capabilities(&self) -> StoreCapabilities {
        self.capabilities
    }
}

#[derive(Debug, FromRow)]
struct AssignmentRow {
    responsibility_name: String,
    application_name: String,
    security_group_name: String,
    description: Option<String>,
    start_date: Option<NaiveDateTime>,
    end_date: Option<NaiveDateTime>,
}

impl AssignmentRow {
    fn into_record(self) -> AppResult<RoleAssignmentRecord> {
        let key = RoleAssignmentKey::new(
            self.responsibility_name,
            self.application_name,
            self.security_group_name,
        )?;

        Ok(RoleAssignmentRecord::new(
            key,
            self.description,
            stored_temporal(self.start_date),
            stored_temporal(self.end_date),
        ))
    }
}

fn stored_temporal(value: Option<NaiveDateTime>) -> TemporalValue {
    value.map_or(TemporalValue::Null, TemporalValue::Explicit)
}

#[async_trait]
impl RoleAssignmentStore for PostgresRoleAssignmentStore {
    async fn fetch_current_assignments(
        &self,
        identity: &str,
        scope: AssignmentScope,
        active_only: bool,
    ) -> AppResult<Vec<String>> {
        self.fetch_current_assignments_impl(identity, scope, active_only)
            .await
    }

    async fn mutate_assignment(&self, mutation: &AssignmentMutation) -> AppResult<()> {
        let responsibility_id = self.resolve_responsibility(&mutation.key, mutation.lookup).await?;
        let security_group_id = self
            .resolve_security_group(mutation.key.security_group_name())
            .await?;

        match mutation.kind {
            MutationKind::Add => {
                self.insert_assignment(mutation, responsibility_id, security_group_id)
                    .await?
            }
            MutationKind::Update => {
                self.update_assignment(mutation, responsibility_id, security_group_id)
                    .await?
            }
            MutationKind::Delete => {
                self.delete_assignment(mutation, responsibility_id, security_group_id)
                    .await?
            }
        }

        debug!(
            identity = %mutation.identity,
            assignment = %mutation.key,
            kind = mutation.kind.as_str(),
            "assignment mutation stored"
        );

        Ok(())
    }
}
