//! Tenant registry port - control-plane storage abstraction
//!
//! One row per tenant holding connection configuration and the tracked
//! `applied_version`. Mutated by the reconciliation driver (automatic path)
//! or by explicit operator confirmation (manual path).

use crate::domain::result::Result;
use crate::domain::Tenant;

/// Control-plane tenant storage
pub trait TenantRegistry: Send + Sync {
    /// Add a new tenant (slug must be unique)
    fn add_tenant(&self, tenant: &Tenant) -> Result<()>;

    /// Get a tenant by slug
    fn get_tenant(&self, slug: &str) -> Result<Option<Tenant>>;

    /// All tenants, ordered by slug
    fn list_tenants(&self) -> Result<Vec<Tenant>>;

    /// Update a tenant's connection configuration and name
    fn update_tenant(&self, tenant: &Tenant) -> Result<()>;

    /// Remove a tenant row entirely
    fn remove_tenant(&self, slug: &str) -> Result<()>;

    /// Record the applied version for a tenant.
    ///
    /// Unconditional write: ordering is the caller's responsibility. The
    /// driver only ever writes current+1; the manual mark-complete path
    /// writes the catalog's latest directly. Nothing here enforces either.
    fn set_applied(&self, slug: &str, version: u32) -> Result<()>;

    /// Record an operator's mark-complete acknowledgment: the version written
    /// plus the digest of the catalog bodies being acknowledged
    fn set_confirmed(&self, slug: &str, version: u32, digest: &str) -> Result<()>;
}
