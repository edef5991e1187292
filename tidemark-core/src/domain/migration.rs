//! Migration domain model
//!
//! A migration unit is one versioned, idempotent schema-change script from the
//! embedded catalog. Versions are dense from 1 and the catalog is append-only;
//! a tenant's position in the sequence is its `applied_version`.

use serde::Serialize;

/// One schema-change step from the catalog
#[derive(Debug, Serialize)]
pub struct MigrationUnit {
    /// Position in the catalog, dense from 1
    pub version: u32,
    /// Short human label
    pub name: &'static str,
    /// Human-readable purpose
    pub description: &'static str,
    /// Idempotent SQL script (guarded DDL, safe to re-run)
    pub body: &'static str,
}

/// A tenant's migration status relative to the catalog
#[derive(Debug, Clone, Copy, Serialize)]
pub struct MigrationStatus {
    pub applied_version: u32,
    pub latest_version: u32,
    pub needs_update: bool,
}

impl MigrationStatus {
    pub fn new(applied_version: u32, latest_version: u32) -> Self {
        Self {
            applied_version,
            latest_version,
            needs_update: applied_version < latest_version,
        }
    }

    /// Number of catalog units not yet applied
    pub fn pending(&self) -> u32 {
        self.latest_version.saturating_sub(self.applied_version)
    }
}

/// Outcome of one reconciliation attempt against a tenant.
///
/// Every non-success variant carries the SQL so the caller can always fall
/// back to surfacing it for manual application; no failure is a dead end.
#[derive(Debug, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ReconcileOutcome {
    /// Tenant already at the catalog's latest version; nothing was attempted
    UpToDate { version: u32 },
    /// The next unit was executed and the tracker advanced to `version`
    Applied { version: u32 },
    /// The remote execution entry point is not installed on this tenant;
    /// the unit must be applied manually (or the tenant bootstrapped first)
    BlockedManual { unit: &'static MigrationUnit },
    /// The entry point ran but the SQL failed; tracker untouched
    Failed {
        unit: &'static MigrationUnit,
        error: String,
    },
}

impl ReconcileOutcome {
    /// Whether the tracker advanced as a result of this attempt
    pub fn advanced(&self) -> bool {
        matches!(self, ReconcileOutcome::Applied { .. })
    }
}

/// Outcome of attempting to install the exec_sql entry point on a tenant
#[derive(Debug, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum BootstrapOutcome {
    /// The entry point was installed through an already-working RPC path
    Installed,
    /// Automatic installation is impossible; the SQL must be run out of band
    Manual { sql: &'static str },
    /// The installation attempt ran and failed
    Failed { error: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_needs_update() {
        let status = MigrationStatus::new(1, 3);
        assert!(status.needs_update);
        assert_eq!(status.pending(), 2);

        let done = MigrationStatus::new(3, 3);
        assert!(!done.needs_update);
        assert_eq!(done.pending(), 0);
    }

    #[test]
    fn test_only_applied_advances() {
        assert!(ReconcileOutcome::Applied { version: 2 }.advanced());
        assert!(!ReconcileOutcome::UpToDate { version: 3 }.advanced());
    }
}
