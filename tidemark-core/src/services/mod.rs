//! Service layer - orchestration of reconciliation and registry management

pub mod audit;
pub mod reconcile;
pub mod tenants;

pub use audit::{AuditEntry, AuditEvent, AuditService};
pub use reconcile::{FleetAttempt, ReconcileService};
pub use tenants::TenantService;
