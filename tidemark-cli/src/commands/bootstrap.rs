//! Bootstrap command - install the exec_sql entry point on a tenant

use anyhow::Result;
use colored::Colorize;

use tidemark_core::{AuditEvent, BootstrapOutcome};

use super::{get_audit, get_context, log_event};
use crate::output;

pub fn run(slug: &str, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let audit = get_audit();

    let outcome = ctx.reconcile_service.bootstrap(slug)?;

    match &outcome {
        BootstrapOutcome::Installed => log_event(
            &audit,
            AuditEvent::new("bootstrap_installed").with_tenant(slug),
        ),
        BootstrapOutcome::Manual { .. } => log_event(
            &audit,
            AuditEvent::new("bootstrap_manual").with_tenant(slug),
        ),
        BootstrapOutcome::Failed { error } => log_event(
            &audit,
            AuditEvent::new("bootstrap_failed")
                .with_tenant(slug)
                .with_error(error.clone()),
        ),
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
        return Ok(());
    }

    match outcome {
        BootstrapOutcome::Installed => {
            output::success(&format!("Entry point installed on {}", slug));
            println!("{}", format!("  Next: tm migrate {}", slug).dimmed());
        }
        BootstrapOutcome::Manual { sql } => {
            output::warning(&format!(
                "{} cannot install the entry point remotely; run this in the tenant's SQL console:",
                slug
            ));
            println!();
            output::sql_block(sql);
            println!();
            println!(
                "{}",
                format!("  Then retry: tm migrate {}", slug).dimmed()
            );
        }
        BootstrapOutcome::Failed { error } => {
            output::error(&format!("Bootstrap failed on {}: {}", slug, error));
            std::process::exit(1);
        }
    }

    Ok(())
}
