//! Domain entities for tenant schema reconciliation

pub mod migration;
pub mod result;
pub mod tenant;

pub use migration::{BootstrapOutcome, MigrationStatus, MigrationUnit, ReconcileOutcome};
pub use tenant::Tenant;
