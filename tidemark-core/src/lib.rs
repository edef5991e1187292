//! Tidemark Core - tenant schema reconciliation logic
//!
//! This crate implements the control-plane logic following hexagonal
//! architecture:
//!
//! - **domain**: Core entities (Tenant, MigrationUnit, outcomes)
//! - **catalog**: The embedded, append-only tenant migration catalog
//! - **ports**: Trait definitions for external dependencies (SchemaExecutor, TenantRegistry)
//! - **services**: Orchestration (reconciliation, tenant CRUD, audit trail)
//! - **adapters**: Concrete implementations (DuckDB registry, HTTP exec_sql client)

pub mod adapters;
pub mod audit_migrations;
pub mod catalog;
pub mod config;
pub mod domain;
pub mod ports;
pub mod registry_migrations;
pub mod services;

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;

use adapters::{DuckDbRegistry, HttpExecutorFactory};
use config::Config;
use services::{ReconcileService, TenantService};

// Re-export commonly used types at crate root
pub use domain::result::{Error, Result as CoreResult};
pub use domain::{BootstrapOutcome, MigrationStatus, MigrationUnit, ReconcileOutcome, Tenant};
pub use services::{AuditEntry, AuditEvent, AuditService, FleetAttempt};

/// Main context for Tidemark operations
///
/// This is the primary entry point for all control-plane logic. It holds
/// the registry, configuration, and all services.
pub struct TidemarkContext {
    pub config: Config,
    pub registry: Arc<DuckDbRegistry>,
    pub tenant_service: TenantService,
    pub reconcile_service: ReconcileService,
}

impl TidemarkContext {
    /// Create a new Tidemark context rooted at the given directory
    pub fn new(tidemark_dir: &Path) -> Result<Self> {
        let config = Config::load(tidemark_dir)?;

        let db_path = tidemark_dir.join("registry.duckdb");
        let registry = Arc::new(DuckDbRegistry::new(&db_path)?);
        registry.ensure_schema()?;

        let executors = Arc::new(HttpExecutorFactory::new(config.request_timeout_secs));

        let tenant_service = TenantService::new(Arc::clone(&registry));
        let reconcile_service = ReconcileService::new(Arc::clone(&registry), executors);

        Ok(Self {
            config,
            registry,
            tenant_service,
            reconcile_service,
        })
    }
}
