use std::env;

use clap::{Parser, Subcommand};
use respsync_core::{AppError, AppResult};
use respsync_domain::AssignmentScope;

#[derive(Debug, Clone)]
pub struct ReconcilerConfig {
    pub database_url: String,
    pub max_connections: u32,
}

impl ReconcilerConfig {
    pub fn load() -> AppResult<Self> {
        let database_url = required_env("DATABASE_URL")?;
        let max_connections = parse_env_u32("RESPSYNC_DB_MAX_CONNECTIONS", 5)?;

        if max_connections == 0 {
            return Err(AppError::Validation(
                "RESPSYNC_DB_MAX_CONNECTIONS must be greater than zero".to_owned(),
            ));
        }

        Ok(Self {
            database_url,
            max_connections,
        })
    }
}

#[derive(Debug, Parser)]
#[command(name = "respsync-reconciler")]
#[command(about = "Reconciles role assignments against the assignment store")]
pub struct ReconcilerCli {
    #[command(subcommand)]
    pub command: ReconcilerCommand,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum ReconcilerCommand {
    /// Apply database migrations and exit
    Migrate,
    /// Bring an identity's assignments in line with the given records
    Reconcile {
        #[arg(value_parser = parse_identity)]
        identity: String,
        /// Delimited records; read one per stdin line when omitted
        records: Vec<String>,
    },
    /// Print the changes `reconcile` would make without applying them
    Plan {
        #[arg(value_parser = parse_identity)]
        identity: String,
        /// Delimited records; read one per stdin line when omitted
        records: Vec<String>,
    },
    /// List an identity's assignments
    List {
        #[arg(value_parser = parse_identity)]
        identity: String,
        /// direct, indirect or legacy; defaults to the scope reconciliation manages
        #[arg(value_parser = parse_scope)]
        scope: Option<AssignmentScope>,
        /// Only assignments whose window contains the current time
        #[arg(long)]
        active_only: bool,
    },
}

fn parse_identity(value: &str) -> Result<String, String> {
    if value.trim().is_empty() {
        return Err("identity must not be empty".to_owned());
    }

    Ok(value.to_owned())
}

fn parse_scope(value: &str) -> Result<AssignmentScope, String> {
    value
        .parse::<AssignmentScope>()
        .map_err(|error| error.to_string())
}

fn required_env(name: &str) -> AppResult<String> {
    env::var(name).map_err(|_| AppError::Validation(format!("{name} is required")))
}

fn parse_env_u32(name: &str, default: u32) -> AppResult<u32> {
    match env::var(name) {
        Ok(value) => value.parse::<u32>().map_err(|error| {
            AppError::Validation(format!("invalid {name} value '{value}': {error}"))
        }),
        Err(_) => Ok(default),
    }
}
