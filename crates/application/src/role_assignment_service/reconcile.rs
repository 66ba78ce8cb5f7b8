use super::*;

use respsync_domain::{ReconciliationPlan, diff};
use tracing::info;

impl RoleAssignmentService {
    /// Brings an identity's assignments in line with `desired`.
    ///
    /// Every desired record is parsed before the store is touched, and the
    /// current assignments are fetched fresh. Unresolvable assignments are
    /// reported together as `AppError::Aggregated` after the whole plan has
    /// been attempted; any other store error aborts immediately.
    pub async fn reconcile(
        &self,
        identity: &str,
        desired: &[String],
    ) -> AppResult<ReconciliationSummary> {
        let identity = Self::validated_identity(identity)?;
        let plan = self.plan(identity.as_str(), desired).await?;

        info!(
            identity = %identity,
            deletes = plan.to_delete().len(),
            adds = plan.to_add().len(),
            updates = plan.to_update().len(),
            "role assignment plan computed"
        );

        let engine = ApplyEngine::new(self.store.clone(), self.capabilities);
        let log = engine.apply(&plan, identity.as_str()).await?;
        if !log.is_empty() {
            warn!(
                identity = %identity,
                failures = log.failures().len(),
                "role assignment reconciliation finished with failures"
            );
        }
        log.into_result()?;

        Ok(ReconciliationSummary {
            deleted: plan.to_delete().len(),
            added: plan.to_add().len(),
            updated: plan.to_update().len(),
        })
    }

    /// Computes the plan `reconcile` would apply without changing the store.
    pub async fn plan(&self, identity: &str, desired: &[String]) -> AppResult<ReconciliationPlan> {
        let identity = Self::validated_identity(identity)?;
        let desired = self.parse_desired(desired)?;
        let current = self.fetch_current(identity.as_str()).await?;

        Ok(diff(&current, &desired, self.clock.now()))
    }

    /// Reconciles from an account's multi-valued assignment attribute.
    ///
    /// `None` means the attribute was not part of the account change and
    /// leaves assignments untouched. An empty list removes every active
    /// assignment.
    pub async fn reconcile_account_attribute(
        &self,
        identity: &str,
        values: Option<&[String]>,
    ) -> AppResult<Option<ReconciliationSummary>> {
        match values {
            Some(values) => self.reconcile(identity, values).await.map(Some),
            None => Ok(None),
        }
    }
}
