use super::*;

/// Bind values for one temporal column: the server-time flag and the
/// explicit timestamp, if any.
fn temporal_binds(value: TemporalValue) -> (bool, Option<NaiveDateTime>) {
    match value {
        TemporalValue::Explicit(timestamp) => (false, Some(timestamp)),
        TemporalValue::Null => (false, None),
        TemporalValue::ServerNow => (true, None),
    }
}

impl PostgresRoleAssignmentStore {
    pub(super) async fn resolve_responsibility(
        &self,
        key: &RoleAssignmentKey,
        lookup: RoleLookup,
    ) -> AppResult<i64> {
        let responsibility_id = match lookup {
            RoleLookup::Qualified => sqlx::query_scalar::<_, i64>(
                r#"
                SELECT responsibilities.id
                FROM responsibilities
                JOIN applications ON applications.id = responsibilities.application_id
                WHERE responsibilities.name = $1
                    AND applications.name = $2
                "#,
            )
            .bind(key.role_name())
            .bind(key.application_name())
            .fetch_optional(&self.pool)
            .await,
            RoleLookup::Unqualified => sqlx::query_scalar::<_, i64>(
                r#"
                SELECT id
                FROM responsibilities
                WHERE name = $1
                ORDER BY id
                LIMIT 1
                "#,
            )
            .bind(key.role_name())
            .fetch_optional(&self.pool)
            .await,
        }
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to resolve responsibility '{}': {error}",
                key.role_name()
            ))
        })?;

        responsibility_id.ok_or_else(|| match lookup {
            RoleLookup::Qualified => AppError::NotFound(format!(
                "responsibility '{}' does not exist in application '{}'",
                key.role_name(),
                key.application_name()
            )),
            RoleLookup::Unqualified => AppError::NotFound(format!(
                "responsibility '{}' does not exist",
                key.role_name()
            )),
        })
    }

    pub(super) async fn resolve_security_group(&self, name: &str) -> AppResult<i64> {
        sqlx::query_scalar::<_, i64>(
            r#"
            SELECT id
            FROM security_groups
            WHERE name = $1
            "#,
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to resolve security group '{name}': {error}"))
        })?
        .ok_or_else(|| AppError::NotFound(format!("security group '{name}' does not exist")))
    }

    pub(super) async fn insert_assignment(
        &self,
        mutation: &AssignmentMutation,
        responsibility_id: i64,
        security_group_id: i64,
    ) -> AppResult<()> {
        let sql = if self.capabilities.description_column {
            r#"
            INSERT INTO user_resp_groups (
                user_name,
                responsibility_id,
                security_group_id,
                start_date,
                end_date,
                description
            )
            VALUES (
                $1,
                $2,
                $3,
                CASE WHEN $4 THEN (CURRENT_TIMESTAMP AT TIME ZONE 'UTC') ELSE $5::TIMESTAMP END,
                CASE WHEN $6 THEN (CURRENT_TIMESTAMP AT TIME ZONE 'UTC') ELSE $7::TIMESTAMP END,
                $8
            )
            "#
        } else {
            r#"
            INSERT INTO user_resp_groups (
                user_name,
                responsibility_id,
                security_group_id,
                start_date,
                end_date
            )
            VALUES (
                $1,
                $2,
                $3,
                CASE WHEN $4 THEN (CURRENT_TIMESTAMP AT TIME ZONE 'UTC') ELSE $5::TIMESTAMP END,
                CASE WHEN $6 THEN (CURRENT_TIMESTAMP AT TIME ZONE 'UTC') ELSE $7::TIMESTAMP END
            )
            "#
        };

        let (start_now, start_date) = temporal_binds(mutation.start_date);
        let (end_now, end_date) = temporal_binds(mutation.end_date);
        let mut query = sqlx::query(sql)
            .bind(mutation.identity.as_str())
            .bind(responsibility_id)
            .bind(security_group_id)
            .bind(start_now)
            .bind(start_date)
            .bind(end_now)
            .bind(end_date);
        if self.capabilities.description_column {
            query = query.bind(mutation.description.as_deref());
        }

        query
            .execute(&self.pool)
            .await
            .map_err(|error| map_assignment_conflict(error, mutation))?;

        Ok(())
    }

    pub(super) async fn update_assignment(
        &self,
        mutation: &AssignmentMutation,
        responsibility_id: i64,
        security_group_id: i64,
    ) -> AppResult<()> {
        let description_set = if self.capabilities.description_column {
            ", description = $8"
        } else {
            ""
        };
        let sql = format!(
            r#"
            UPDATE user_resp_groups
            SET
                start_date = CASE WHEN $4 THEN (CURRENT_TIMESTAMP AT TIME ZONE 'UTC') ELSE $5::TIMESTAMP END,
                end_date = CASE WHEN $6 THEN (CURRENT_TIMESTAMP AT TIME ZONE 'UTC') ELSE $7::TIMESTAMP END{description_set}
            WHERE user_name = $1
                AND responsibility_id = $2
                AND security_group_id = $3{direct_filter}
            "#,
            direct_filter = self.direct_grant_filter(),
        );

        let (start_now, start_date) = temporal_binds(mutation.start_date);
        let (end_now, end_date) = temporal_binds(mutation.end_date);
        let mut query = sqlx::query(&sql)
            .bind(mutation.identity.as_str())
            .bind(responsibility_id)
            .bind(security_group_id)
            .bind(start_now)
            .bind(start_date)
            .bind(end_now)
            .bind(end_date);
        if self.capabilities.description_column {
            query = query.bind(mutation.description.as_deref());
        }

        let rows_affected = query
            .execute(&self.pool)
            .await
            .map_err(|error| {
                AppError::Internal(format!(
                    "failed to update assignment '{}' for '{}': {error}",
                    mutation.key, mutation.identity
                ))
            })?
            .rows_affected();

        if rows_affected == 0 {
            return Err(AppError::NotFound(format!(
                "assignment '{}' for '{}' was not found",
                mutation.key, mutation.identity
            )));
        }

        Ok(())
    }

    pub(super) async fn delete_assignment(
        &self,
        mutation: &AssignmentMutation,
        responsibility_id: i64,
        security_group_id: i64,
    ) -> AppResult<()> {
        let sql = format!(
            r#"
            DELETE FROM user_resp_groups
            WHERE user_name = $1
                AND responsibility_id = $2
                AND security_group_id = $3{direct_filter}
            "#,
            direct_filter = self.direct_grant_filter(),
        );

        let rows_affected = sqlx::query(&sql)
            .bind(mutation.identity.as_str())
            .bind(responsibility_id)
            .bind(security_group_id)
            .execute(&self.pool)
            .await
            .map_err(|error| {
                AppError::Internal(format!(
                    "failed to remove assignment '{}' for '{}': {error}",
                    mutation.key, mutation.identity
                ))
            })?
            .rows_affected();

        if rows_affected == 0 {
            return Err(AppError::NotFound(format!(
                "assignment '{}' for '{}' was not found",
                mutation.key, mutation.identity
            )));
        }

        Ok(())
    }

    /// Inherited grants share the base table under the multi-view layout and
    /// are never written directly.
    fn direct_grant_filter(&self) -> &'static str {
        if self.capabilities.multi_view_layout {
            "\n                AND NOT inherited"
        } else {
            ""
        }
    }
}

fn map_assignment_conflict(error: sqlx::Error, mutation: &AssignmentMutation) -> AppError {
    if let sqlx::Error::Database(database_error) = &error
        && database_error.code().as_deref() == Some("23505")
    {
        return AppError::Conflict(format!(
            "assignment '{}' already exists for '{}'",
            mutation.key, mutation.identity
        ));
    }

    AppError::Internal(format!(
        "failed to add assignment '{}' for '{}': {error}",
        mutation.key, mutation.identity
    ))
}
