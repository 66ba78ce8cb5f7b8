use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use respsync_application::{
    AssignmentMutation, Clock, MutationKind, RoleAssignmentStore, RoleLookup,
};
use respsync_core::{AppError, AppResult};
use respsync_domain::{
    AssignmentScope, RoleAssignmentKey, RoleAssignmentRecord, StoreCapabilities, TemporalValue,
};

/// Grant position: identity, assignment key, inherited flag.
type GrantKey = (String, RoleAssignmentKey, bool);

#[derive(Debug, Default)]
struct InMemoryState {
    /// Catalog of (role name, application name) in registration order.
    responsibilities: Vec<(String, String)>,
    security_groups: BTreeSet<String>,
    grants: BTreeMap<GrantKey, RoleAssignmentRecord>,
}

/// In-memory role assignment store with the same resolution rules as the
/// PostgreSQL adapter.
pub struct InMemoryRoleAssignmentStore {
    clock: Arc<dyn Clock>,
    capabilities: StoreCapabilities,
    state: RwLock<InMemoryState>,
}

impl InMemoryRoleAssignmentStore {
    /// Creates an empty store. `clock` stands in for the server time.
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>, capabilities: StoreCapabilities) -> Self {
        Self {
            clock,
            capabilities,
            state: RwLock::new(InMemoryState::default()),
        }
    }

    /// Registers a responsibility in the catalog.
    #[must_use]
    pub fn with_responsibility(
        mut self,
        role_name: impl Into<String>,
        application_name: impl Into<String>,
    ) -> Self {
        self.state
            .get_mut()
            .responsibilities
            .push((role_name.into(), application_name.into()));
        self
    }

    /// Registers a security group.
    #[must_use]
    pub fn with_security_group(mut self, name: impl Into<String>) -> Self {
        self.state.get_mut().security_groups.insert(name.into());
        self
    }

    /// Seeds an assignment without catalog checks. Inherited assignments are
    /// only visible through the indirect scope of the multi-view layout.
    #[must_use]
    pub fn with_assignment(
        mut self,
        identity: impl Into<String>,
        record: RoleAssignmentRecord,
        inherited: bool,
    ) -> Self {
        let grant_key = (identity.into(), record.key().clone(), inherited);
        self.state.get_mut().grants.insert(grant_key, record);
        self
    }

    /// Returns the capabilities this store reports.
    #[must_use]
    pub fn capabilities(&self) -> StoreCapabilities {
        self.capabilities
    }

    fn scope_includes(&self, scope: AssignmentScope, inherited: bool) -> bool {
        match (self.capabilities.multi_view_layout, scope) {
            (true, AssignmentScope::Direct) => !inherited,
            (true, AssignmentScope::Indirect) => inherited,
            (true, AssignmentScope::Legacy) | (false, _) => true,
        }
    }

    fn server_value(&self, value: TemporalValue) -> TemporalValue {
        match value {
            TemporalValue::ServerNow => TemporalValue::Explicit(self.clock.now()),
            other => other,
        }
    }

    fn stored_record(
        &self,
        key: RoleAssignmentKey,
        mutation: &AssignmentMutation,
    ) -> RoleAssignmentRecord {
        let description = mutation
            .description
            .clone()
            .filter(|_| self.capabilities.description_column);

        RoleAssignmentRecord::new(
            key,
            description,
            self.server_value(mutation.start_date),
            self.server_value(mutation.end_date),
        )
    }
}

impl InMemoryState {
    fn resolve_key(
        &self,
        key: &RoleAssignmentKey,
        lookup: RoleLookup,
    ) -> AppResult<RoleAssignmentKey> {
        let responsibility = self
            .responsibilities
            .iter()
            .find(|(role_name, application_name)| {
                role_name == key.role_name()
                    && (lookup == RoleLookup::Unqualified
                        || application_name == key.application_name())
            })
            .ok_or_else(|| match lookup {
                RoleLookup::Qualified => AppError::NotFound(format!(
                    "responsibility '{}' does not exist in application '{}'",
                    key.role_name(),
                    key.application_name()
                )),
                RoleLookup::Unqualified => AppError::NotFound(format!(
                    "responsibility '{}' does not exist",
                    key.role_name()
                )),
            })?;

        if !self.security_groups.contains(key.security_group_name()) {
            return Err(AppError::NotFound(format!(
                "security group '{}' does not exist",
                key.security_group_name()
            )));
        }

        RoleAssignmentKey::new(
            responsibility.0.as_str(),
            responsibility.1.as_str(),
            key.security_group_name(),
        )
    }
}

#[async_trait]
impl RoleAssignmentStore for InMemoryRoleAssignmentStore {
    async fn fetch_current_assignments(
        &self,
        identity: &str,
        scope: AssignmentScope,
        active_only: bool,
    ) -> AppResult<Vec<String>> {
        let now = self.clock.now();
        let state = self.state.read().await;

        Ok(state
            .grants
            .iter()
            .filter(|((stored_identity, _, inherited), _)| {
                stored_identity == identity && self.scope_includes(scope, *inherited)
            })
            .filter(|(_, record)| !active_only || record.is_active_at(now))
            .map(|(_, record)| record.to_wire(self.capabilities.description_column))
            .collect())
    }

    async fn mutate_assignment(&self, mutation: &AssignmentMutation) -> AppResult<()> {
        let mut state = self.state.write().await;
        let resolved = state.resolve_key(&mutation.key, mutation.lookup)?;
        let grant_key = (mutation.identity.clone(), resolved.clone(), false);

        match mutation.kind {
            MutationKind::Add => {
                if state.grants.contains_key(&grant_key) {
                    return Err(AppError::Conflict(format!(
                        "assignment '{resolved}' already exists for '{}'",
                        mutation.identity
                    )));
                }
                let record = self.stored_record(resolved, mutation);
                state.grants.insert(grant_key, record);
            }
            MutationKind::Update => {
                if !state.grants.contains_key(&grant_key) {
                    return Err(AppError::NotFound(format!(
                        "assignment '{resolved}' for '{}' was not found",
                        mutation.identity
                    )));
                }
                let record = self.stored_record(resolved, mutation);
                state.grants.insert(grant_key, record);
            }
            MutationKind::Delete => {
                if state.grants.remove(&grant_key).is_none() {
                    return Err(AppError::NotFound(format!(
                        "assignment '{resolved}' for '{}' was not found",
                        mutation.identity
                    )));
                }
            }
        }

        debug!(
            identity = %mutation.identity,
            assignment = %mutation.key,
            kind = mutation.kind.as_str(),
            "assignment mutation stored in memory"
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests;
