//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod in_memory_role_assignment_store;
mod postgres_role_assignment_store;
mod system_clock;

pub use in_memory_role_assignment_store::InMemoryRoleAssignmentStore;
pub use postgres_role_assignment_store::{PostgresRoleAssignmentStore, detect_store_capabilities};
pub use system_clock::SystemClock;
