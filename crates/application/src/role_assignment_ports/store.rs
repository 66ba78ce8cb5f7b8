use async_trait::async_trait;

use respsync_core::AppResult;
use respsync_domain::AssignmentScope;

use super::mutation::AssignmentMutation;

/// Port to the external store that persists role assignments.
///
/// Implementations are configured with the session's store capabilities and
/// must report unresolvable roles, applications, security groups or
/// assignments as `AppError::NotFound`.
#[async_trait]
pub trait RoleAssignmentStore: Send + Sync {
    /// Lists an identity's persisted assignments in delimited wire form.
    async fn fetch_current_assignments(
        &self,
        identity: &str,
        scope: AssignmentScope,
        active_only: bool,
    ) -> AppResult<Vec<String>>;

    /// Applies one assignment mutation as its own unit of work.
    async fn mutate_assignment(&self, mutation: &AssignmentMutation) -> AppResult<()>;
}
