//! Audit database migrations - embedded SQL files
//!
//! Same embedded-migration pattern as the registry, applied to audit.duckdb.

/// All audit migrations, embedded at compile time.
/// Format: (filename, sql_content)
pub const AUDIT_MIGRATIONS: &[(&str, &str)] = &[
    ("000_migrations.sql", include_str!("000_migrations.sql")),
    ("001_events.sql", include_str!("001_events.sql")),
];
