//! Role assignment reconciliation runner.

#![forbid(unsafe_code)]

mod reconciler_config;

use std::sync::Arc;

use respsync_application::{ReconciliationSummary, RoleAssignmentService};
use respsync_core::{AppError, AppResult};
use respsync_domain::{
    AssignmentScope, ReconciliationPlan, RoleAssignmentRecord, StoreCapabilities,
};
use respsync_infrastructure::{
    PostgresRoleAssignmentStore, SystemClock, detect_store_capabilities,
};

use clap::Parser;
use serde::Serialize;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::reconciler_config::{ReconcilerCli, ReconcilerCommand, ReconcilerConfig};

#[derive(Debug, Serialize)]
struct ReconcileOutput<'a> {
    identity: &'a str,
    summary: ReconciliationSummary,
}

#[derive(Debug, Serialize)]
struct PlanOutput<'a> {
    identity: &'a str,
    plan: &'a ReconciliationPlan,
}

#[derive(Debug, Serialize)]
struct ListOutput<'a> {
    identity: &'a str,
    scope: AssignmentScope,
    active_only: bool,
    assignments: Vec<RoleAssignmentRecord>,
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let command = ReconcilerCli::parse().command;
    let config = ReconcilerConfig::load()?;
    let pool = connect_pool(&config).await?;

    match command {
        ReconcilerCommand::Migrate => {
            sqlx::migrate!("../../crates/infrastructure/migrations")
                .run(&pool)
                .await
                .map_err(|error| {
                    AppError::Internal(format!("failed to run migrations: {error}"))
                })?;
            info!("database migrations applied successfully");
            Ok(())
        }
        ReconcilerCommand::Reconcile { identity, records } => {
            let (service, _) = build_service(pool).await?;
            let desired = read_records(records).await?;
            let summary = service
                .reconcile(identity.as_str(), &desired)
                .await
                .inspect_err(|error| {
                    error!(
                        identity = %identity,
                        error = %error,
                        "role assignment reconciliation failed"
                    );
                })?;

            info!(
                identity = %identity,
                deleted = summary.deleted,
                added = summary.added,
                updated = summary.updated,
                "role assignments reconciled"
            );
            print_json(&ReconcileOutput {
                identity: identity.as_str(),
                summary,
            })
        }
        ReconcilerCommand::Plan { identity, records } => {
            let (service, _) = build_service(pool).await?;
            let desired = read_records(records).await?;
            let plan = service.plan(identity.as_str(), &desired).await?;

            print_json(&PlanOutput {
                identity: identity.as_str(),
                plan: &plan,
            })
        }
        ReconcilerCommand::List {
            identity,
            scope,
            active_only,
        } => {
            let (service, capabilities) = build_service(pool).await?;
            let scope = scope.unwrap_or_else(|| capabilities.managed_scope());
            let assignments = service
                .list_assignments(identity.as_str(), scope, active_only)
                .await?;

            print_json(&ListOutput {
                identity: identity.as_str(),
                scope,
                active_only,
                assignments,
            })
        }
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

async fn connect_pool(config: &ReconcilerConfig) -> AppResult<PgPool> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(config.database_url.as_str())
        .await
        .map_err(|error| AppError::Internal(format!("failed to connect to database: {error}")))
}

async fn build_service(pool: PgPool) -> AppResult<(RoleAssignmentService, StoreCapabilities)> {
    let capabilities = detect_store_capabilities(&pool).await?;
    let store = Arc::new(PostgresRoleAssignmentStore::new(pool, capabilities));
    let service = RoleAssignmentService::new(store, Arc::new(SystemClock), capabilities);

    Ok((service, capabilities))
}

async fn read_records(records: Vec<String>) -> AppResult<Vec<String>> {
    if !records.is_empty() {
        return Ok(records);
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut records = Vec::new();
    while let Some(line) = lines.next_line().await.map_err(|error| {
        AppError::Internal(format!("failed to read records from stdin: {error}"))
    })? {
        if !line.trim().is_empty() {
            records.push(line);
        }
    }

    Ok(records)
}

fn print_json(value: &impl Serialize) -> AppResult<()> {
    let output = serde_json::to_string_pretty(value)
        .map_err(|error| AppError::Internal(format!("failed to serialize output: {error}")))?;
    println!("{output}");

    Ok(())
}
