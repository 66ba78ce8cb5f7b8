use super::*;

impl RoleAssignmentService {
    /// Lists an identity's assignments from the requested source.
    ///
    /// With `active_only`, only assignments whose window contains the current
    /// time are returned.
    pub async fn list_assignments(
        &self,
        identity: &str,
        scope: AssignmentScope,
        active_only: bool,
    ) -> AppResult<Vec<RoleAssignmentRecord>> {
        let identity = Self::validated_identity(identity)?;
        self.fetch_records(identity.as_str(), scope, active_only)
            .await
    }
}
