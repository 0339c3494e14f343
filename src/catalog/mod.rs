// Upsell catalog: reconciliation planning and the refresh orchestrator

pub mod reconcile;
pub mod sync;

pub use reconcile::{plan_upsert, UpsertPlan};
pub use sync::{CatalogSync, SyncReport};
