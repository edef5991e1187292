//! Registry database migrations - embedded SQL files
//!
//! The registry DuckDB file evolves through the same embedded-migration
//! pattern the tool applies to tenants, tracked in its own sys_migrations
//! table. Each migration is a tuple of (name, sql_content), applied in order.
//!
//! IMPORTANT: When adding a new migration:
//! 1. Create the SQL file: NNN_description.sql
//! 2. Add an entry here in order

/// All registry migrations, embedded at compile time.
/// Format: (filename, sql_content)
pub const REGISTRY_MIGRATIONS: &[(&str, &str)] = &[
    ("000_migrations.sql", include_str!("000_migrations.sql")),
    ("001_tenants.sql", include_str!("001_tenants.sql")),
    ("002_confirmed_digest.sql", include_str!("002_confirmed_digest.sql")),
];
