//! Status command - fleet-wide schema status against the catalog

use anyhow::Result;
use colored::Colorize;

use tidemark_core::catalog;

use super::get_context;
use crate::output;

pub fn run(json: bool) -> Result<()> {
    let ctx = get_context()?;
    let tenants = ctx.tenant_service.list()?;
    let latest = catalog::latest_version();

    if json {
        let rows: Vec<serde_json::Value> = tenants
            .iter()
            .map(|t| {
                serde_json::json!({
                    "slug": t.slug,
                    "name": t.name,
                    "configured": t.is_configured(),
                    "applied_version": t.applied_version,
                    "latest_version": latest,
                    "needs_update": t.applied_version < latest,
                    "confirmed_digest": t.confirmed_digest,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    println!("{}", "Tenant Fleet Status".bold());
    println!();

    if tenants.is_empty() {
        println!("No tenants registered.");
        println!("{}", "  Add one with: tm tenant add <slug> <name>".dimmed());
        return Ok(());
    }

    let mut table = output::create_table();
    table.set_header(vec!["Slug", "Name", "Schema", "State"]);

    let mut behind = 0;
    for tenant in &tenants {
        let schema = format!("v{}/v{}", tenant.applied_version, latest);
        let state = if !tenant.is_configured() {
            "not configured".dimmed().to_string()
        } else if tenant.applied_version >= latest {
            "up to date".green().to_string()
        } else {
            behind += 1;
            "behind".yellow().to_string()
        };
        table.add_row(vec![
            tenant.slug.clone(),
            tenant.name.clone(),
            schema,
            state,
        ]);
    }

    println!("{}", table);
    println!();
    println!("Catalog latest: v{}", latest);

    if behind > 0 {
        println!();
        println!(
            "{}",
            format!("{} tenant(s) behind the catalog", behind).yellow()
        );
        println!("{}", "  Migrate them with: tm migrate --all".dimmed());
    }

    Ok(())
}
