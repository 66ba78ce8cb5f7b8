use sqlx::PgPool;
use tracing::info;

use respsync_core::{AppError, AppResult};
use respsync_domain::StoreCapabilities;

const DIRECT_VIEW: &str = "user_resp_groups_direct";
const LEGACY_TABLE: &str = "user_resp_groups";

/// Detects the assignment schema layout behind `pool`.
///
/// Run once per session; the result is passed to the store and the
/// reconciliation service so both agree on the shape of every record.
pub async fn detect_store_capabilities(pool: &PgPool) -> AppResult<StoreCapabilities> {
    let multi_view_layout = sqlx::query_scalar::<_, bool>(
        r#"
        SELECT EXISTS (
            SELECT 1
            FROM information_schema.views
            WHERE table_schema = current_schema()
                AND table_name = $1
        )
        "#,
    )
    .bind(DIRECT_VIEW)
    .fetch_one(pool)
    .await
    .map_err(|error| {
        AppError::StoreQuery(format!("failed to detect assignment view layout: {error}"))
    })?;

    let assignment_relation = if multi_view_layout {
        DIRECT_VIEW
    } else {
        LEGACY_TABLE
    };

    let description_column = sqlx::query_scalar::<_, bool>(
        r#"
        SELECT EXISTS (
            SELECT 1
            FROM information_schema.columns
            WHERE table_schema = current_schema()
                AND table_name = $1
                AND column_name = 'description'
        )
        "#,
    )
    .bind(assignment_relation)
    .fetch_one(pool)
    .await
    .map_err(|error| {
        AppError::StoreQuery(format!(
            "failed to detect assignment description column: {error}"
        ))
    })?;

    let capabilities = StoreCapabilities {
        description_column,
        multi_view_layout,
    };

    info!(
        description_column = capabilities.description_column,
        multi_view_layout = capabilities.multi_view_layout,
        "assignment store capabilities detected"
    );

    Ok(capabilities)
}
