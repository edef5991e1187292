//! Mark-complete command - operator confirmation of out-of-band migration
//!
//! Records the catalog's latest version as applied without executing
//! anything, after the operator has run the surfaced SQL by hand. The digest
//! of the acknowledged bodies is stored alongside for later audits.

use anyhow::Result;
use colored::Colorize;
use dialoguer::Confirm;

use tidemark_core::{catalog, AuditEvent};

use super::{get_audit, get_context, log_event};
use crate::output;

pub fn run(slug: &str, force: bool, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let audit = get_audit();

    let tenant = match ctx.tenant_service.get(slug) {
        Ok(t) => t,
        Err(_) => {
            output::error(&format!("Tenant '{}' not found", slug));
            println!("{}", "  List tenants with: tm tenant list".dimmed());
            std::process::exit(1);
        }
    };

    let latest = catalog::latest_version();
    if !force && !json {
        let confirmed = Confirm::new()
            .with_prompt(format!(
                "Mark '{}' as fully migrated (v{} -> v{}) without executing anything?",
                slug, tenant.applied_version, latest
            ))
            .default(false)
            .interact()?;
        if !confirmed {
            println!("Cancelled.");
            return Ok(());
        }
    }

    let before = tenant.applied_version;
    let status = ctx.reconcile_service.mark_complete(slug)?;
    log_event(
        &audit,
        AuditEvent::new("mark_complete")
            .with_tenant(slug)
            .with_transition(before, status.applied_version),
    );

    let digest = catalog::digest_through(status.applied_version);

    if json {
        println!(
            "{}",
            serde_json::json!({
                "slug": slug,
                "applied_version": status.applied_version,
                "confirmed_digest": digest,
            })
        );
        return Ok(());
    }

    output::success(&format!(
        "{} marked complete at v{}",
        slug, status.applied_version
    ));
    println!("  Confirmed digest: {}", digest);

    Ok(())
}
