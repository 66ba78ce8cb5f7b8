mod clock;
mod mutation;
mod store;

pub use clock::Clock;
pub use mutation::{AssignmentMutation, MutationKind, RoleLookup};
pub use store::RoleAssignmentStore;
