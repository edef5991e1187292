//! Migrate command - reconcile tenant schemas against the catalog
//!
//! The core service applies at most one catalog unit per call; this command
//! is the loop that drives a tenant all the way to the latest version,
//! stopping at the first outcome that is not a plain success.

use anyhow::Result;
use colored::Colorize;

use tidemark_core::{AuditEvent, AuditService, ReconcileOutcome, TidemarkContext};

use super::{get_audit, get_context, log_event};
use crate::output;

pub fn run(slug: Option<String>, all: bool, step: bool, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let audit = get_audit();

    if all {
        if slug.is_some() {
            output::error("--all cannot be combined with a tenant slug");
            std::process::exit(1);
        }
        return run_fleet(&ctx, &audit, json);
    }

    let slug = match slug {
        Some(s) => s,
        None => {
            output::error("Specify a tenant slug, or use --all for the whole fleet");
            std::process::exit(1);
        }
    };

    run_single(&ctx, &audit, &slug, step, json)
}

/// Drive one tenant forward, one catalog unit at a time
fn run_single(
    ctx: &TidemarkContext,
    audit: &Option<AuditService>,
    slug: &str,
    step: bool,
    json: bool,
) -> Result<()> {
    let mut outcomes: Vec<ReconcileOutcome> = Vec::new();
    let mut blocked = false;

    loop {
        let before = ctx.tenant_service.get(slug)?.applied_version;
        let outcome = ctx.reconcile_service.reconcile_one(slug)?;
        record(audit, slug, before, &outcome);

        if !json {
            report(slug, &outcome);
        }

        let advanced = outcome.advanced();
        if !advanced && !matches!(outcome, ReconcileOutcome::UpToDate { .. }) {
            blocked = true;
        }
        outcomes.push(outcome);

        if !advanced || step {
            break;
        }
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&outcomes)?);
        return Ok(());
    }

    if blocked {
        std::process::exit(1);
    }
    Ok(())
}

/// One independent attempt per registered tenant
fn run_fleet(ctx: &TidemarkContext, audit: &Option<AuditService>, json: bool) -> Result<()> {
    let attempts = ctx.reconcile_service.reconcile_all()?;

    if json {
        let rows: Vec<serde_json::Value> = attempts
            .iter()
            .map(|a| match &a.outcome {
                Ok(outcome) => serde_json::json!({
                    "slug": a.slug,
                    "attempt": outcome,
                }),
                Err(e) => serde_json::json!({
                    "slug": a.slug,
                    "error": e.to_string(),
                }),
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&rows)?);
    }

    let mut table = output::create_table();
    table.set_header(vec!["Slug", "Outcome"]);

    let mut needs_attention = 0;
    for attempt in &attempts {
        let cell = match &attempt.outcome {
            Ok(ReconcileOutcome::UpToDate { version }) => {
                format!("up to date at v{}", version).green().to_string()
            }
            Ok(ReconcileOutcome::Applied { version }) => {
                record_fleet(audit, &attempt.slug, *version);
                format!("applied v{}", version).green().to_string()
            }
            Ok(ReconcileOutcome::BlockedManual { unit }) => {
                log_event(
                    audit,
                    AuditEvent::new("reconcile_blocked").with_tenant(&attempt.slug),
                );
                needs_attention += 1;
                format!("blocked at v{} (entry point missing)", unit.version)
                    .yellow()
                    .to_string()
            }
            Ok(ReconcileOutcome::Failed { unit, error }) => {
                log_event(
                    audit,
                    AuditEvent::new("reconcile_failed")
                        .with_tenant(&attempt.slug)
                        .with_error(error.clone()),
                );
                needs_attention += 1;
                format!("failed at v{}: {}", unit.version, error)
                    .red()
                    .to_string()
            }
            Err(e) => {
                needs_attention += 1;
                e.to_string().dimmed().to_string()
            }
        };
        table.add_row(vec![attempt.slug.clone(), cell]);
    }

    if !json {
        println!("{}", table);
        if needs_attention > 0 {
            println!();
            println!(
                "{}",
                format!("{} tenant(s) need attention", needs_attention).yellow()
            );
            println!(
                "{}",
                "  Inspect one with: tm migrate <slug> (prints the SQL on failure)".dimmed()
            );
        }
    }

    Ok(())
}

fn record(audit: &Option<AuditService>, slug: &str, before: u32, outcome: &ReconcileOutcome) {
    match outcome {
        ReconcileOutcome::UpToDate { .. } => {}
        ReconcileOutcome::Applied { version } => log_event(
            audit,
            AuditEvent::new("reconcile_applied")
                .with_tenant(slug)
                .with_transition(before, *version),
        ),
        ReconcileOutcome::BlockedManual { .. } => log_event(
            audit,
            AuditEvent::new("reconcile_blocked").with_tenant(slug),
        ),
        ReconcileOutcome::Failed { error, .. } => log_event(
            audit,
            AuditEvent::new("reconcile_failed")
                .with_tenant(slug)
                .with_error(error.clone()),
        ),
    }
}

fn record_fleet(audit: &Option<AuditService>, slug: &str, version: u32) {
    log_event(
        audit,
        AuditEvent::new("reconcile_applied")
            .with_tenant(slug)
            .with_transition(version.saturating_sub(1), version),
    );
}

fn report(slug: &str, outcome: &ReconcileOutcome) {
    match outcome {
        ReconcileOutcome::UpToDate { version } => {
            output::info(&format!("{} is up to date at v{}", slug, version));
        }
        ReconcileOutcome::Applied { version } => {
            output::success(&format!("Applied v{} to {}", version, slug));
        }
        ReconcileOutcome::BlockedManual { unit } => {
            output::warning(&format!(
                "{} is blocked at v{} ({}): the exec_sql entry point is not installed",
                slug, unit.version, unit.name
            ));
            println!();
            println!("Run this in the tenant's SQL console:");
            output::sql_block(unit.body);
            println!();
            println!(
                "{}",
                format!("  Then confirm with: tm mark-complete {}", slug).dimmed()
            );
            println!(
                "{}",
                format!("  Or install the entry point first: tm bootstrap {}", slug).dimmed()
            );
        }
        ReconcileOutcome::Failed { unit, error } => {
            output::error(&format!(
                "v{} ({}) failed on {}: {}",
                unit.version, unit.name, slug, error
            ));
            println!();
            println!("The failing SQL, for manual application:");
            output::sql_block(unit.body);
            println!();
            println!(
                "{}",
                format!(
                    "  After applying it manually, confirm with: tm mark-complete {}",
                    slug
                )
                .dimmed()
            );
        }
    }
}
