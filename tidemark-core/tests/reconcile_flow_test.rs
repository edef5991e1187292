//! Integration tests for tidemark-core services
//!
//! These tests verify the reconciliation lifecycle end to end using a real
//! DuckDB registry. The remote execution entry point is mocked at the trait
//! level; all registry operations are real.
//!
//! Run with: cargo test --test reconcile_flow_test -- --nocapture

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use tempfile::TempDir;

use tidemark_core::adapters::DuckDbRegistry;
use tidemark_core::catalog;
use tidemark_core::domain::result::Result as CoreResult;
use tidemark_core::ports::{ExecutorError, ExecutorFactory, SchemaExecutor, TenantRegistry};
use tidemark_core::services::{AuditEvent, AuditService, ReconcileService, TenantService};
use tidemark_core::{BootstrapOutcome, Error, ReconcileOutcome, Tenant};

// ============================================================================
// Test Helpers
// ============================================================================

/// Executor whose results are scripted per call, shared across tenants
struct ScriptedExecutor {
    results: Mutex<VecDeque<Result<(), ExecutorError>>>,
    executed: Mutex<Vec<String>>,
}

impl ScriptedExecutor {
    fn new(results: Vec<Result<(), ExecutorError>>) -> Arc<Self> {
        Arc::new(Self {
            results: Mutex::new(results.into()),
            executed: Mutex::new(Vec::new()),
        })
    }

    fn executed_bodies(&self) -> Vec<String> {
        self.executed.lock().unwrap().clone()
    }
}

struct ExecutorHandle(Arc<ScriptedExecutor>);

impl SchemaExecutor for ExecutorHandle {
    fn execute(&self, sql: &str) -> Result<(), ExecutorError> {
        self.0.executed.lock().unwrap().push(sql.to_string());
        self.0.results.lock().unwrap().pop_front().unwrap_or(Ok(()))
    }
}

struct ScriptedFactory(Arc<ScriptedExecutor>);

impl ExecutorFactory for ScriptedFactory {
    fn for_tenant(&self, _tenant: &Tenant) -> CoreResult<Box<dyn SchemaExecutor>> {
        Ok(Box::new(ExecutorHandle(Arc::clone(&self.0))))
    }
}

struct Harness {
    _dir: TempDir,
    registry: Arc<DuckDbRegistry>,
    executor: Arc<ScriptedExecutor>,
    tenants: TenantService,
    reconcile: ReconcileService,
}

fn harness(results: Vec<Result<(), ExecutorError>>) -> Harness {
    let dir = TempDir::new().unwrap();
    let registry = Arc::new(DuckDbRegistry::new(&dir.path().join("registry.duckdb")).unwrap());
    registry.ensure_schema().unwrap();

    let executor = ScriptedExecutor::new(results);
    let tenants = TenantService::new(Arc::clone(&registry));
    let reconcile = ReconcileService::new(
        Arc::clone(&registry),
        Arc::new(ScriptedFactory(Arc::clone(&executor))),
    );

    Harness {
        _dir: dir,
        registry,
        executor,
        tenants,
        reconcile,
    }
}

fn add_configured(h: &Harness, slug: &str) {
    h.tenants
        .add(
            slug,
            &format!("{} inc", slug),
            Some(format!("https://{}.example.co", slug)),
            Some("service-key".to_string()),
            None,
        )
        .unwrap();
}

// ============================================================================
// Tenant lifecycle: registration through full reconciliation
// ============================================================================

#[test]
fn test_fresh_tenant_walks_the_whole_catalog() {
    let latest = catalog::latest_version();
    let h = harness((0..latest).map(|_| Ok(())).collect());
    add_configured(&h, "acme");

    for expected in 1..=latest {
        match h.reconcile.reconcile_one("acme").unwrap() {
            ReconcileOutcome::Applied { version } => assert_eq!(version, expected),
            other => panic!("unexpected outcome at step {}: {:?}", expected, other),
        }
    }

    let status = h.reconcile.status("acme").unwrap();
    assert_eq!(status.applied_version, latest);
    assert!(!status.needs_update);

    // Each step executed exactly the unit at that position, in order
    let bodies = h.executor.executed_bodies();
    assert_eq!(bodies.len(), latest as usize);
    for (i, body) in bodies.iter().enumerate() {
        assert_eq!(body, catalog::list()[i].body);
    }

    // A further call is a no-op
    assert!(matches!(
        h.reconcile.reconcile_one("acme").unwrap(),
        ReconcileOutcome::UpToDate { .. }
    ));
}

#[test]
fn test_unbootstrapped_tenant_falls_back_to_manual_wizard() {
    // Every automatic attempt hits a missing entry point
    let h = harness(vec![
        Err(ExecutorError::CapabilityMissing),
        Err(ExecutorError::CapabilityMissing),
    ]);
    add_configured(&h, "acme");

    // Bootstrap cannot install itself remotely; SQL is surfaced
    match h.reconcile.bootstrap("acme").unwrap() {
        BootstrapOutcome::Manual { sql } => assert!(sql.contains("exec_sql")),
        other => panic!("unexpected: {:?}", other),
    }

    // Reconciliation is blocked the same way and nothing advances
    match h.reconcile.reconcile_one("acme").unwrap() {
        ReconcileOutcome::BlockedManual { unit } => assert_eq!(unit.version, 1),
        other => panic!("unexpected: {:?}", other),
    }
    assert_eq!(h.reconcile.status("acme").unwrap().applied_version, 0);

    // The operator runs the SQL out of band and confirms
    let status = h.reconcile.mark_complete("acme").unwrap();
    assert_eq!(status.applied_version, catalog::latest_version());

    let tenant = h.tenants.get("acme").unwrap();
    assert_eq!(
        tenant.confirmed_digest.as_deref(),
        Some(catalog::digest_through(catalog::latest_version()).as_str())
    );
}

#[test]
fn test_catalog_growth_reopens_a_completed_tenant() {
    let h = harness(vec![Ok(())]);
    add_configured(&h, "acme");

    // Simulate a tenant that was current under an older, shorter catalog
    h.registry
        .set_applied("acme", catalog::latest_version() - 1)
        .unwrap();

    let status = h.reconcile.status("acme").unwrap();
    assert!(status.needs_update);
    assert_eq!(status.pending(), 1);

    match h.reconcile.reconcile_one("acme").unwrap() {
        ReconcileOutcome::Applied { version } => assert_eq!(version, catalog::latest_version()),
        other => panic!("unexpected: {:?}", other),
    }
    assert!(!h.reconcile.status("acme").unwrap().needs_update);
}

// ============================================================================
// Fleet operations
// ============================================================================

#[test]
fn test_fleet_reconcile_is_per_tenant_independent() {
    let h = harness(vec![
        Ok(()),                                             // alpha
        Err(ExecutorError::Execution("boom".to_string())),  // beta
        Ok(()),                                             // delta
    ]);
    add_configured(&h, "alpha");
    add_configured(&h, "beta");
    h.tenants.add("carol", "Carol Ltd", None, None, None).unwrap();
    add_configured(&h, "delta");

    let attempts = h.reconcile.reconcile_all().unwrap();
    let slugs: Vec<&str> = attempts.iter().map(|a| a.slug.as_str()).collect();
    assert_eq!(slugs, vec!["alpha", "beta", "carol", "delta"]);

    assert!(matches!(
        attempts[0].outcome,
        Ok(ReconcileOutcome::Applied { version: 1 })
    ));
    assert!(matches!(
        attempts[1].outcome,
        Ok(ReconcileOutcome::Failed { .. })
    ));
    assert!(matches!(attempts[2].outcome, Err(Error::NotConfigured(_))));
    assert!(matches!(
        attempts[3].outcome,
        Ok(ReconcileOutcome::Applied { version: 1 })
    ));

    // Only the successful tenants advanced
    assert_eq!(h.tenants.get("alpha").unwrap().applied_version, 1);
    assert_eq!(h.tenants.get("beta").unwrap().applied_version, 0);
    assert_eq!(h.tenants.get("delta").unwrap().applied_version, 1);
}

// ============================================================================
// Registry persistence across reopen
// ============================================================================

#[test]
fn test_tracked_versions_survive_registry_reopen() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("registry.duckdb");

    {
        let registry = Arc::new(DuckDbRegistry::new(&db_path).unwrap());
        registry.ensure_schema().unwrap();
        let tenants = TenantService::new(Arc::clone(&registry));
        tenants
            .add("acme", "Acme", Some("https://acme.example.co".into()), Some("k".into()), None)
            .unwrap();
        registry.set_applied("acme", 2).unwrap();
    }

    let registry = Arc::new(DuckDbRegistry::new(&db_path).unwrap());
    registry.ensure_schema().unwrap();
    let tenants = TenantService::new(Arc::clone(&registry));
    let tenant = tenants.get("acme").unwrap();
    assert_eq!(tenant.applied_version, 2);
    assert!(tenant.is_configured());
}

// ============================================================================
// Audit trail alongside reconciliation
// ============================================================================

#[test]
fn test_audit_trail_records_the_operator_session() {
    let dir = TempDir::new().unwrap();
    let audit = AuditService::new(dir.path(), "0.1.0").unwrap();

    let h = harness(vec![Ok(()), Err(ExecutorError::Execution("boom".into()))]);
    add_configured(&h, "acme");

    for _ in 0..2 {
        let before = h.tenants.get("acme").unwrap().applied_version;
        match h.reconcile.reconcile_one("acme").unwrap() {
            ReconcileOutcome::Applied { version } => {
                audit
                    .log(
                        AuditEvent::new("reconcile_applied")
                            .with_tenant("acme")
                            .with_transition(before, version),
                    )
                    .unwrap();
            }
            ReconcileOutcome::Failed { error, .. } => {
                audit
                    .log(
                        AuditEvent::new("reconcile_failed")
                            .with_tenant("acme")
                            .with_error(error),
                    )
                    .unwrap();
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    assert_eq!(audit.count().unwrap(), 2);
    let errors = audit.get_errors(10).unwrap();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].error_message.as_deref(), Some("boom"));

    let recent = audit.get_recent(10).unwrap();
    assert_eq!(recent.len(), 2);
    assert!(recent.iter().all(|e| e.tenant.as_deref() == Some("acme")));
}
