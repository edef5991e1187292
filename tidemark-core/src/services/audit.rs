//! Audit service - structured reconciliation event log in DuckDB
//!
//! Every reconciliation attempt and operator override leaves a row in
//! audit.duckdb. Tenant SQL bodies and API keys are never logged, only
//! event names, version transitions and error messages. Audit failures
//! must never break the operation being audited; callers ignore errors.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{anyhow, Result};
use duckdb::Connection;
use serde::{Deserialize, Serialize};

use crate::audit_migrations::AUDIT_MIGRATIONS;

/// Counter for generating unique IDs within the same millisecond
static ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Generate a unique ID based on timestamp + counter
fn generate_id() -> u64 {
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_millis() as u64;

    // Lower 48 bits of timestamp, upper 16 bits of counter
    let counter = ID_COUNTER.fetch_add(1, Ordering::Relaxed) & 0xFFFF;
    (timestamp << 16) | counter
}

/// Current unix timestamp in milliseconds
fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_millis() as i64
}

/// An audit event to be recorded
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    pub event: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenant: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_version: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to_version: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl AuditEvent {
    /// Create a new event with just an event name
    pub fn new(event: impl Into<String>) -> Self {
        Self {
            event: event.into(),
            tenant: None,
            from_version: None,
            to_version: None,
            error_message: None,
        }
    }

    /// Set the tenant context
    pub fn with_tenant(mut self, tenant: impl Into<String>) -> Self {
        self.tenant = Some(tenant.into());
        self
    }

    /// Set the version transition
    pub fn with_transition(mut self, from: u32, to: u32) -> Self {
        self.from_version = Some(from);
        self.to_version = Some(to);
        self
    }

    /// Set error information
    pub fn with_error(mut self, message: impl Into<String>) -> Self {
        self.error_message = Some(message.into());
        self
    }
}

/// An audit entry as stored in the database
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: u64,
    pub timestamp: i64,
    pub app_version: String,
    pub event: String,
    pub tenant: Option<String>,
    pub from_version: Option<u32>,
    pub to_version: Option<u32>,
    pub error_message: Option<String>,
}

/// Service for the reconciliation audit trail
pub struct AuditService {
    conn: Mutex<Connection>,
    db_path: PathBuf,
    app_version: String,
}

impl AuditService {
    /// Open or create audit.duckdb in the tidemark directory and run any
    /// pending migrations
    pub fn new(tidemark_dir: &Path, app_version: impl Into<String>) -> Result<Self> {
        let db_path = tidemark_dir.join("audit.duckdb");
        let conn = Connection::open(&db_path)?;

        let service = Self {
            conn: Mutex::new(conn),
            db_path,
            app_version: app_version.into(),
        };

        service.run_migrations()?;
        Ok(service)
    }

    fn run_migrations(&self) -> Result<()> {
        let conn = self.conn.lock().map_err(|e| anyhow!("Lock poisoned: {}", e))?;

        let ledger_exists: bool = conn
            .query_row(
                "SELECT COUNT(*) > 0 FROM information_schema.tables WHERE table_name = 'sys_migrations'",
                [],
                |row| row.get(0),
            )
            .unwrap_or(false);

        if !ledger_exists {
            if let Some((name, sql)) = AUDIT_MIGRATIONS
                .iter()
                .find(|(n, _)| *n == "000_migrations.sql")
            {
                conn.execute_batch(sql)?;
                conn.execute(
                    "INSERT INTO sys_migrations (migration_name) VALUES (?)",
                    [name],
                )?;
            }
        }

        let mut stmt = conn.prepare("SELECT migration_name FROM sys_migrations")?;
        let applied: Vec<String> = stmt
            .query_map([], |row| row.get(0))?
            .filter_map(|r| r.ok())
            .collect();

        for (name, sql) in AUDIT_MIGRATIONS.iter() {
            if *name == "000_migrations.sql" {
                continue;
            }
            if !applied.contains(&name.to_string()) {
                conn.execute_batch(sql)?;
                conn.execute(
                    "INSERT INTO sys_migrations (migration_name) VALUES (?)",
                    [name],
                )?;
            }
        }

        Ok(())
    }

    /// Record an event
    pub fn log(&self, event: AuditEvent) -> Result<()> {
        let conn = self.conn.lock().map_err(|e| anyhow!("Lock poisoned: {}", e))?;

        conn.execute(
            r#"
            INSERT INTO sys_events (
                id, timestamp, app_version, event, tenant,
                from_version, to_version, error_message
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            duckdb::params![
                generate_id(),
                now_ms(),
                &self.app_version,
                &event.event,
                &event.tenant,
                event.from_version.map(|v| v as i32),
                event.to_version.map(|v| v as i32),
                &event.error_message,
            ],
        )?;

        Ok(())
    }

    /// Most recent entries, up to the specified limit
    pub fn get_recent(&self, limit: usize) -> Result<Vec<AuditEntry>> {
        self.query_entries(
            "SELECT id, timestamp, app_version, event, tenant,
                    from_version, to_version, error_message
             FROM sys_events
             ORDER BY timestamp DESC
             LIMIT ?",
            limit,
        )
    }

    /// Most recent entries that carry an error
    pub fn get_errors(&self, limit: usize) -> Result<Vec<AuditEntry>> {
        self.query_entries(
            "SELECT id, timestamp, app_version, event, tenant,
                    from_version, to_version, error_message
             FROM sys_events
             WHERE error_message IS NOT NULL
             ORDER BY timestamp DESC
             LIMIT ?",
            limit,
        )
    }

    fn query_entries(&self, sql: &str, limit: usize) -> Result<Vec<AuditEntry>> {
        let conn = self.conn.lock().map_err(|e| anyhow!("Lock poisoned: {}", e))?;

        let mut stmt = conn.prepare(sql)?;
        let entries = stmt
            .query_map([limit as i64], |row| {
                Ok(AuditEntry {
                    id: row.get(0)?,
                    timestamp: row.get(1)?,
                    app_version: row.get(2)?,
                    event: row.get(3)?,
                    tenant: row.get(4)?,
                    from_version: row.get::<_, Option<i32>>(5)?.map(|v| v.max(0) as u32),
                    to_version: row.get::<_, Option<i32>>(6)?.map(|v| v.max(0) as u32),
                    error_message: row.get(7)?,
                })
            })?
            .filter_map(|r| r.ok())
            .collect();

        Ok(entries)
    }

    /// Delete entries older than the given unix millisecond timestamp,
    /// returning how many were removed
    pub fn delete_before(&self, cutoff_ms: i64) -> Result<usize> {
        let conn = self.conn.lock().map_err(|e| anyhow!("Lock poisoned: {}", e))?;
        let deleted = conn.execute(
            "DELETE FROM sys_events WHERE timestamp < ?",
            duckdb::params![cutoff_ms],
        )?;
        Ok(deleted)
    }

    /// Total number of audit entries
    pub fn count(&self) -> Result<u64> {
        let conn = self.conn.lock().map_err(|e| anyhow!("Lock poisoned: {}", e))?;
        let count: u64 = conn.query_row("SELECT COUNT(*) FROM sys_events", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Path to the audit database
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }
}
