//! CLI command implementations

pub mod bootstrap;
pub mod logs;
pub mod mark;
pub mod migrate;
pub mod show_sql;
pub mod status;
pub mod tenant;

use std::path::PathBuf;

use anyhow::{Context, Result};
use tidemark_core::{AuditEvent, AuditService, TidemarkContext};

/// Get the audit service for CLI operations
///
/// Returns None if the audit store fails to open (auditing must never block
/// the operation being audited)
pub fn get_audit() -> Option<AuditService> {
    let tidemark_dir = get_tidemark_dir();
    std::fs::create_dir_all(&tidemark_dir).ok()?;
    AuditService::new(&tidemark_dir, env!("CARGO_PKG_VERSION")).ok()
}

/// Record an event, ignoring any errors
pub fn log_event(audit: &Option<AuditService>, event: AuditEvent) {
    if let Some(a) = audit {
        let _ = a.log(event);
    }
}

/// Get the tidemark directory from environment or default
pub fn get_tidemark_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("TIDEMARK_DIR") {
        PathBuf::from(dir)
    } else {
        dirs::home_dir()
            .expect("Could not find home directory")
            .join(".tidemark")
    }
}

/// Get or create tidemark context
pub fn get_context() -> Result<TidemarkContext> {
    let tidemark_dir = get_tidemark_dir();

    std::fs::create_dir_all(&tidemark_dir)
        .with_context(|| format!("Failed to create tidemark directory: {:?}", tidemark_dir))?;

    TidemarkContext::new(&tidemark_dir).context("Failed to initialize tidemark context")
}
