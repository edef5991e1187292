//! Schema executor port - remote SQL execution on a tenant database
//!
//! The entry point itself (an `exec_sql` function installed by the bootstrap
//! script) lives inside the tenant's hosted database and is outside this
//! application's control. Its failure contract is therefore typed here: the
//! driver switches behavior on `CapabilityMissing` and must never have to
//! string-match error messages to do so.

use thiserror::Error;

use crate::domain::result::Result;
use crate::domain::Tenant;

/// Error contract of the remote execution entry point
#[derive(Error, Debug)]
pub enum ExecutorError {
    /// The entry point itself is not installed on this tenant; the tenant
    /// needs bootstrapping (or the SQL must be applied manually)
    #[error("execution entry point not installed on tenant")]
    CapabilityMissing,

    /// The entry point ran but the submitted SQL failed
    #[error("SQL execution failed: {0}")]
    Execution(String),

    /// The entry point could not be reached at all
    #[error("transport error: {0}")]
    Transport(String),
}

/// Remote SQL execution on one tenant's isolated database
pub trait SchemaExecutor: Send + Sync {
    /// Execute a SQL script on the tenant database.
    ///
    /// Success means the remote side reported the script ran to completion.
    /// An attempt already dispatched is not revocable: it may still complete
    /// remotely after the caller has given up on it.
    fn execute(&self, sql: &str) -> std::result::Result<(), ExecutorError>;
}

/// Builds a [`SchemaExecutor`] for a tenant from its connection configuration.
///
/// Fails with `NotConfigured` when the tenant carries no usable connection.
pub trait ExecutorFactory: Send + Sync {
    fn for_tenant(&self, tenant: &Tenant) -> Result<Box<dyn SchemaExecutor>>;
}
