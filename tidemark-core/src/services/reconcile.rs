//! Reconciliation service - drives tenants toward the catalog's latest version
//!
//! One attempt is strictly single-step: it applies at most the next unapplied
//! unit, so an operator observes one version increment per successful call.
//! Multi-step progress is the caller's loop. Every failure path carries the
//! SQL body so the operator can always fall back to manual application.

use std::sync::Arc;

use crate::adapters::DuckDbRegistry;
use crate::catalog;
use crate::domain::result::{Error, Result};
use crate::domain::{BootstrapOutcome, MigrationStatus, MigrationUnit, ReconcileOutcome, Tenant};
use crate::ports::{ExecutorError, ExecutorFactory, TenantRegistry};

/// One fleet-wide reconciliation attempt for a single tenant
#[derive(Debug)]
pub struct FleetAttempt {
    pub slug: String,
    pub outcome: Result<ReconcileOutcome>,
}

/// Service driving per-tenant schema reconciliation
pub struct ReconcileService {
    registry: Arc<DuckDbRegistry>,
    executors: Arc<dyn ExecutorFactory>,
}

impl ReconcileService {
    pub fn new(registry: Arc<DuckDbRegistry>, executors: Arc<dyn ExecutorFactory>) -> Self {
        Self { registry, executors }
    }

    /// Migration status of one tenant relative to the catalog.
    ///
    /// `NotConfigured` means the tenant has no usable database connection,
    /// which is distinct from a configured tenant at version 0.
    pub fn status(&self, slug: &str) -> Result<MigrationStatus> {
        let tenant = self.require_configured(slug)?;
        Ok(MigrationStatus::new(
            tenant.applied_version,
            catalog::latest_version(),
        ))
    }

    /// Attempt to apply the next unapplied catalog unit to one tenant.
    ///
    /// The tracker only advances on success, and only ever by one. A blocked
    /// or failed attempt leaves the tracked version untouched.
    pub fn reconcile_one(&self, slug: &str) -> Result<ReconcileOutcome> {
        let tenant = self.require_configured(slug)?;
        let latest = catalog::latest_version();

        if tenant.applied_version >= latest {
            return Ok(ReconcileOutcome::UpToDate {
                version: tenant.applied_version,
            });
        }

        let next = tenant.applied_version + 1;
        let unit = catalog::unit_for(next)
            .ok_or_else(|| Error::Other(format!("catalog has no unit for version {}", next)))?;

        let executor = self.executors.for_tenant(&tenant)?;
        match executor.execute(unit.body) {
            Ok(()) => {
                self.registry.set_applied(slug, unit.version)?;
                Ok(ReconcileOutcome::Applied {
                    version: unit.version,
                })
            }
            Err(ExecutorError::CapabilityMissing) => {
                Ok(ReconcileOutcome::BlockedManual { unit })
            }
            Err(e) => Ok(ReconcileOutcome::Failed {
                unit,
                error: e.to_string(),
            }),
        }
    }

    /// One independent reconciliation attempt per registered tenant.
    ///
    /// Tenants are logically independent; there is no ordering between them
    /// and one tenant's failure never stops the others.
    pub fn reconcile_all(&self) -> Result<Vec<FleetAttempt>> {
        let tenants = self.registry.list_tenants()?;
        let attempts = tenants
            .into_iter()
            .map(|tenant| FleetAttempt {
                outcome: self.reconcile_one(&tenant.slug),
                slug: tenant.slug,
            })
            .collect();
        Ok(attempts)
    }

    /// Operator shortcut: record the catalog's latest version as applied
    /// without executing anything, together with the digest of the bodies
    /// being acknowledged.
    ///
    /// This writes exactly `latest_version()`, never an increment; it is the
    /// confirmation step of the manual wizard and trusts that the operator
    /// ran the surfaced SQL out of band.
    pub fn mark_complete(&self, slug: &str) -> Result<MigrationStatus> {
        let tenant = self.require_tenant(slug)?;
        let latest = catalog::latest_version();
        let digest = catalog::digest_through(latest);
        self.registry.set_confirmed(&tenant.slug, latest, &digest)?;
        Ok(MigrationStatus::new(latest, latest))
    }

    /// Attempt to install the exec_sql entry point on a tenant.
    ///
    /// Installing the entry point through itself only works when a previous
    /// installation already exists (re-bootstrap); on a fresh tenant this
    /// comes back `Manual` with the SQL to run in the hosted console.
    pub fn bootstrap(&self, slug: &str) -> Result<BootstrapOutcome> {
        let tenant = self.require_configured(slug)?;
        let executor = self.executors.for_tenant(&tenant)?;
        match executor.execute(catalog::BOOTSTRAP_SQL) {
            Ok(()) => Ok(BootstrapOutcome::Installed),
            Err(ExecutorError::CapabilityMissing) => Ok(BootstrapOutcome::Manual {
                sql: catalog::BOOTSTRAP_SQL,
            }),
            Err(e) => Ok(BootstrapOutcome::Failed {
                error: e.to_string(),
            }),
        }
    }

    /// The catalog units a tenant has not applied yet, in order
    pub fn pending_units(&self, slug: &str) -> Result<Vec<&'static MigrationUnit>> {
        let tenant = self.require_tenant(slug)?;
        Ok(catalog::list()
            .iter()
            .filter(|u| u.version > tenant.applied_version)
            .collect())
    }

    fn require_tenant(&self, slug: &str) -> Result<Tenant> {
        self.registry
            .get_tenant(slug)?
            .ok_or_else(|| Error::not_found(format!("tenant {}", slug)))
    }

    fn require_configured(&self, slug: &str) -> Result<Tenant> {
        let tenant = self.require_tenant(slug)?;
        if !tenant.is_configured() {
            return Err(Error::not_configured(format!(
                "{} has no reachable database connection",
                slug
            )));
        }
        Ok(tenant)
    }
}
