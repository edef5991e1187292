//! DuckDB registry implementation
//!
//! The control-plane registry is a single local DuckDB file. Its schema is
//! managed through the same embedded-migration pattern the tool applies to
//! tenant databases, tracked in a sys_migrations ledger.

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::thread;
use std::time::Duration;

use chrono::{DateTime, NaiveDateTime, Utc};
use duckdb::{params, Connection};
use uuid::Uuid;

use crate::domain::result::{Error, Result};
use crate::domain::Tenant;
use crate::ports::TenantRegistry;
use crate::registry_migrations::REGISTRY_MIGRATIONS;

/// Maximum number of retries when the database file is locked
const MAX_RETRIES: u32 = 5;

/// Initial retry delay in milliseconds (doubles each retry)
const INITIAL_RETRY_DELAY_MS: u64 = 50;

/// Check if an error message indicates a file locking issue worth retrying
fn is_retryable_error(err_msg: &str) -> bool {
    let lower = err_msg.to_lowercase();
    lower.contains("being used by another process")
        || lower.contains("cannot access the file")
        || lower.contains("resource temporarily unavailable")
        || lower.contains("database is locked")
        || lower.contains("file is already open")
}

/// Parse a DuckDB timestamp string, falling back to now on malformed input
fn parse_timestamp(s: &str) -> DateTime<Utc> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f"))
        .map(|naive| naive.and_utc())
        .unwrap_or_else(|_| Utc::now())
}

fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.naive_utc().format("%Y-%m-%d %H:%M:%S%.6f").to_string()
}

/// DuckDB-backed tenant registry
pub struct DuckDbRegistry {
    conn: Mutex<Connection>,
    db_path: PathBuf,
}

impl DuckDbRegistry {
    /// Open the registry database, retrying with exponential backoff on file
    /// locking errors (another tm invocation may hold the file briefly).
    pub fn new(db_path: &Path) -> Result<Self> {
        let mut last_error = None;

        for attempt in 0..MAX_RETRIES {
            match Self::try_open_connection(db_path) {
                Ok(conn) => {
                    return Ok(Self {
                        conn: Mutex::new(conn),
                        db_path: db_path.to_path_buf(),
                    });
                }
                Err(e) => {
                    let err_msg = e.to_string();
                    if is_retryable_error(&err_msg) && attempt < MAX_RETRIES - 1 {
                        let delay =
                            Duration::from_millis(INITIAL_RETRY_DELAY_MS * 2u64.pow(attempt));
                        eprintln!(
                            "[tidemark] Registry busy, retrying in {}ms (attempt {}/{}): {}",
                            delay.as_millis(),
                            attempt + 1,
                            MAX_RETRIES,
                            err_msg
                        );
                        thread::sleep(delay);
                        last_error = Some(e);
                        continue;
                    }
                    return Err(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            Error::database(format!("Failed to open registry after {} retries", MAX_RETRIES))
        }))
    }

    fn try_open_connection(db_path: &Path) -> Result<Connection> {
        // Extension autoloading disabled: the registry needs none, and cached
        // extensions can break code signing on macOS
        let config = duckdb::Config::default()
            .enable_autoload_extension(false)
            .map_err(|e| Error::database(e.to_string()))?;
        let conn = Connection::open_with_flags(db_path, config)?;
        Ok(conn)
    }

    /// Ensure the registry schema exists (runs pending registry migrations)
    pub fn ensure_schema(&self) -> Result<()> {
        let conn = self.conn.lock().unwrap();

        let ledger_exists: bool = conn
            .query_row(
                "SELECT COUNT(*) > 0 FROM information_schema.tables WHERE table_name = 'sys_migrations'",
                [],
                |row| row.get(0),
            )
            .unwrap_or(false);

        if !ledger_exists {
            if let Some((name, sql)) = REGISTRY_MIGRATIONS
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

        for (name, sql) in REGISTRY_MIGRATIONS.iter() {
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

    /// Path of the registry database file
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    fn row_to_tenant(row: &duckdb::Row) -> Tenant {
        // Column order fixed by TENANT_COLUMNS
        let id_str: String = row.get(0).unwrap_or_default();
        let created_str: String = row.get(8).unwrap_or_default();
        let updated_str: String = row.get(9).unwrap_or_default();

        Tenant {
            id: Uuid::parse_str(&id_str).unwrap_or_else(|_| Uuid::new_v4()),
            slug: row.get(1).unwrap_or_default(),
            name: row.get(2).unwrap_or_default(),
            database_url: row.get(3).ok(),
            service_key: row.get(4).ok(),
            anon_key: row.get(5).ok(),
            applied_version: row.get::<_, i64>(6).unwrap_or(0).max(0) as u32,
            confirmed_digest: row.get(7).ok(),
            created_at: parse_timestamp(&created_str),
            updated_at: parse_timestamp(&updated_str),
        }
    }
}

const TENANT_COLUMNS: &str = "tenant_id, slug, name, database_url, service_key, anon_key, \
                              applied_version, confirmed_digest, created_at, updated_at";

impl TenantRegistry for DuckDbRegistry {
    fn add_tenant(&self, tenant: &Tenant) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO sys_tenants (tenant_id, slug, name, database_url, service_key, anon_key,
                                      applied_version, confirmed_digest, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                tenant.id.to_string(),
                tenant.slug,
                tenant.name,
                tenant.database_url,
                tenant.service_key,
                tenant.anon_key,
                tenant.applied_version as i64,
                tenant.confirmed_digest,
                format_timestamp(&tenant.created_at),
                format_timestamp(&tenant.updated_at),
            ],
        )?;
        Ok(())
    }

    fn get_tenant(&self, slug: &str) -> Result<Option<Tenant>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM sys_tenants WHERE slug = ?",
            TENANT_COLUMNS
        ))?;
        let tenant = stmt
            .query_row([slug], |row| Ok(Self::row_to_tenant(row)))
            .ok();
        Ok(tenant)
    }

    fn list_tenants(&self) -> Result<Vec<Tenant>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM sys_tenants ORDER BY slug",
            TENANT_COLUMNS
        ))?;
        let tenants = stmt
            .query_map([], |row| Ok(Self::row_to_tenant(row)))?
            .filter_map(|r| r.ok())
            .collect();
        Ok(tenants)
    }

    fn update_tenant(&self, tenant: &Tenant) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let updated = conn.execute(
            "UPDATE sys_tenants
             SET name = ?, database_url = ?, service_key = ?, anon_key = ?, updated_at = ?
             WHERE slug = ?",
            params![
                tenant.name,
                tenant.database_url,
                tenant.service_key,
                tenant.anon_key,
                format_timestamp(&Utc::now()),
                tenant.slug,
            ],
        )?;
        if updated == 0 {
            return Err(Error::not_found(format!("tenant {}", tenant.slug)));
        }
        Ok(())
    }

    fn remove_tenant(&self, slug: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let deleted = conn.execute("DELETE FROM sys_tenants WHERE slug = ?", [slug])?;
        if deleted == 0 {
            return Err(Error::not_found(format!("tenant {}", slug)));
        }
        Ok(())
    }

    fn set_applied(&self, slug: &str, version: u32) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let updated = conn.execute(
            "UPDATE sys_tenants SET applied_version = ?, updated_at = ? WHERE slug = ?",
            params![version as i64, format_timestamp(&Utc::now()), slug],
        )?;
        if updated == 0 {
            return Err(Error::not_found(format!("tenant {}", slug)));
        }
        Ok(())
    }

    fn set_confirmed(&self, slug: &str, version: u32, digest: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let updated = conn.execute(
            "UPDATE sys_tenants
             SET applied_version = ?, confirmed_digest = ?, updated_at = ?
             WHERE slug = ?",
            params![
                version as i64,
                digest,
                format_timestamp(&Utc::now()),
                slug
            ],
        )?;
        if updated == 0 {
            return Err(Error::not_found(format!("tenant {}", slug)));
        }
        Ok(())
    }
}
