//! Tenant migration catalog - embedded SQL units
//!
//! Catalog units are compiled into the binary at build time using include_str!.
//! The catalog is an append-only, densely-numbered sequence starting at 1: no
//! gaps, no reordering once published. Every body must be idempotent (guarded
//! DDL, safe to re-run) because a reconciliation attempt can race an earlier
//! one that already completed remotely.
//!
//! IMPORTANT: When adding a new unit:
//! 1. Create the SQL file: NNN_description.sql (guarded DDL only)
//! 2. Append an entry here with the next version number

use sha2::{Digest, Sha256};

use crate::domain::MigrationUnit;

/// The remote execution entry point installer. Not a catalog unit: it is the
/// prerequisite for the automatic path and usually has to be run out of band.
pub const BOOTSTRAP_SQL: &str = include_str!("000_bootstrap.sql");

/// All catalog units, ascending by version.
pub const CATALOG: &[MigrationUnit] = &[
    MigrationUnit {
        version: 1,
        name: "crm_core",
        description: "CRM pipelines, deals and deal history with row-level security",
        body: include_str!("001_crm_core.sql"),
    },
    MigrationUnit {
        version: 2,
        name: "automation_journeys",
        description: "Automation journeys and scheduled executions",
        body: include_str!("002_automation_journeys.sql"),
    },
    MigrationUnit {
        version: 3,
        name: "broadcast_campaigns",
        description: "Broadcast campaigns and per-contact deliveries",
        body: include_str!("003_broadcast_campaigns.sql"),
    },
];

/// All units, ascending by version
pub fn list() -> &'static [MigrationUnit] {
    CATALOG
}

/// The catalog's target version (equal to the unit count, versions being dense)
pub fn latest_version() -> u32 {
    CATALOG.len() as u32
}

/// Look up a unit by version
pub fn unit_for(version: u32) -> Option<&'static MigrationUnit> {
    if version == 0 {
        return None;
    }
    CATALOG.get(version as usize - 1)
}

/// SHA-256 hex digest over the bodies of units 1..=version.
///
/// Recorded when an operator marks a tenant complete, so a later audit can
/// detect drift between what the catalog contained and what was acknowledged.
pub fn digest_through(version: u32) -> String {
    let mut hasher = Sha256::new();
    for unit in CATALOG.iter().take(version as usize) {
        hasher.update(unit.body.as_bytes());
    }
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_versions_are_dense_from_one() {
        for (i, unit) in CATALOG.iter().enumerate() {
            assert_eq!(unit.version, i as u32 + 1, "unit {} out of order", unit.name);
        }
        assert_eq!(latest_version(), CATALOG.len() as u32);
    }

    #[test]
    fn test_unit_lookup() {
        assert!(unit_for(0).is_none());
        assert_eq!(unit_for(1).unwrap().name, "crm_core");
        assert_eq!(unit_for(latest_version()).unwrap().version, latest_version());
        assert!(unit_for(latest_version() + 1).is_none());
    }

    #[test]
    fn test_digest_is_stable_and_version_scoped() {
        let full = digest_through(latest_version());
        assert_eq!(full.len(), 64);
        assert_eq!(full, digest_through(latest_version()));
        assert_ne!(full, digest_through(1));
        // Empty prefix hashes to the SHA-256 of no input
        assert_eq!(
            digest_through(0),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    /// Every DDL statement in every unit must carry an idempotence guard so the
    /// whole body is safe to re-run. New units must keep this discipline.
    #[test]
    fn test_bodies_are_guard_idempotent() {
        for unit in CATALOG {
            for line in unit.body.lines() {
                let upper = line.trim().to_uppercase();
                if upper.starts_with("CREATE TABLE") || upper.starts_with("CREATE INDEX") {
                    assert!(
                        upper.contains("IF NOT EXISTS"),
                        "unguarded DDL in {}: {}",
                        unit.name,
                        line
                    );
                }
                if upper.starts_with("CREATE FUNCTION") {
                    panic!("use CREATE OR REPLACE FUNCTION in {}: {}", unit.name, line);
                }
                if upper.starts_with("INSERT INTO") {
                    assert!(
                        unit.body.to_uppercase().contains("WHERE NOT EXISTS")
                            || unit.body.to_uppercase().contains("ON CONFLICT"),
                        "unguarded seed insert in {}: {}",
                        unit.name,
                        line
                    );
                }
            }
            // Policies are re-created, so each CREATE POLICY needs a matching drop
            let creates = unit
                .body
                .lines()
                .filter(|l| l.trim_start().to_uppercase().starts_with("CREATE POLICY"))
                .count();
            let drops = unit
                .body
                .lines()
                .filter(|l| {
                    l.trim_start()
                        .to_uppercase()
                        .starts_with("DROP POLICY IF EXISTS")
                })
                .count();
            assert_eq!(creates, drops, "policy guard mismatch in {}", unit.name);
        }
    }

    #[test]
    fn test_bootstrap_installs_a_replaceable_function() {
        assert!(BOOTSTRAP_SQL.contains("CREATE OR REPLACE FUNCTION exec_sql"));
        assert!(BOOTSTRAP_SQL.contains("SECURITY DEFINER"));
    }
}
