pub mod key;
pub mod mapping;
pub mod reconcile;

pub use key::key_for;
pub use mapping::{CourseContext, Horizon, MappingOutcome, classify_kind, decide_status, map_assignment};
pub use reconcile::{ReconcilePlan, SyncAction, reconcile};
