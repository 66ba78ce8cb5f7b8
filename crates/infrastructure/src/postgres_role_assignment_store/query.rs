use super::*;

impl PostgresRoleAssignmentStore {
    pub(super) async fn fetch_current_assignments_impl(
        &self,
        identity: &str,
        scope: AssignmentScope,
        active_only: bool,
    ) -> AppResult<Vec<String>> {
        let sql = assignment_query(self.capabilities, scope, active_only);
        let rows = sqlx::query_as::<_, AssignmentRow>(&sql)
            .bind(identity)
            .fetch_all(&self.pool)
            .await
            .map_err(|error| {
                AppError::StoreQuery(format!(
                    "failed to fetch assignments for '{identity}': {error}"
                ))
            })?;

        rows.into_iter()
            .map(|row| {
                row.into_record()
                    .map(|record| record.to_wire(self.capabilities.description_column))
            })
            .collect()
    }
}

/// Builds the current-assignment query for the detected layout.
///
/// The legacy layout has one table, so `scope` only selects a view under the
/// multi-view layout. Rows come back in key order, oldest start first, so
/// the first row of a duplicated key is deterministic.
pub(super) fn assignment_query(
    capabilities: StoreCapabilities,
    scope: AssignmentScope,
    active_only: bool,
) -> String {
    let source = match (capabilities.multi_view_layout, scope) {
        (true, AssignmentScope::Direct) => "user_resp_groups_direct".to_owned(),
        (true, AssignmentScope::Indirect) => "user_resp_groups_indirect".to_owned(),
        (true, AssignmentScope::Legacy) | (false, _) => {
            legacy_source(capabilities.description_column)
        }
    };
    let description = if capabilities.description_column {
        "grants.description"
    } else {
        "NULL::TEXT AS description"
    };
    let active_filter = if active_only {
        r#"
            AND (grants.start_date IS NULL OR grants.start_date <= (CURRENT_TIMESTAMP AT TIME ZONE 'UTC'))
            AND (grants.end_date IS NULL OR grants.end_date > (CURRENT_TIMESTAMP AT TIME ZONE 'UTC'))"#
    } else {
        ""
    };

    format!(
        r#"
        SELECT
            grants.responsibility_name,
            grants.application_name,
            grants.security_group_name,
            {description},
            grants.start_date,
            grants.end_date
        FROM {source} AS grants
        WHERE grants.user_name = $1{active_filter}
        ORDER BY
            grants.responsibility_name,
            grants.application_name,
            grants.security_group_name,
            grants.start_date NULLS FIRST
        "#
    )
}

fn legacy_source(description_column: bool) -> String {
    let description = if description_column {
        "legacy.description"
    } else {
        "NULL::TEXT AS description"
    };

    format!(
        r#"(
            SELECT
                legacy.user_name,
                responsibilities.name AS responsibility_name,
                applications.name AS application_name,
                security_groups.name AS security_group_name,
                {description},
                legacy.start_date,
                legacy.end_date
            FROM user_resp_groups AS legacy
            JOIN responsibilities ON responsibilities.id = legacy.responsibility_id
            JOIN applications ON applications.id = responsibilities.application_id
            JOIN security_groups ON security_groups.id = legacy.security_group_id
        )"#
    )
}
