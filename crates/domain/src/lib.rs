//! Domain entities and invariants.

#![forbid(unsafe_code)]

mod reconciliation;
mod role_assignment;
mod store;

pub use reconciliation::{ReconciliationPlan, diff};
pub use role_assignment::{
    AssignmentSet, FIELD_DELIMITER, NormalizedRecord, NormalizedTemporal, RoleAssignmentKey,
    RoleAssignmentRecord, TemporalValue,
};
pub use store::{AssignmentScope, StoreCapabilities};
