//! Application services and ports.

#![forbid(unsafe_code)]

mod role_assignment_ports;
mod role_assignment_service;

pub use role_assignment_ports::{
    AssignmentMutation, Clock, MutationKind, RoleAssignmentStore, RoleLookup,
};
pub use role_assignment_service::{
    ApplyEngine, ErrorLog, FailureRecord, ReconciliationSummary, RoleAssignmentService,
};
