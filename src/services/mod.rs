pub mod sync_service;

pub use sync_service::{RowFailure, SyncOptions, SyncReport, SyncService, SyncStats};
