//! Show-sql command - print catalog or bootstrap SQL for manual application
//!
//! Output is raw SQL (no decoration) so it can be piped straight into a file
//! or a hosted SQL console.

use std::path::PathBuf;

use anyhow::Result;
use colored::Colorize;

use tidemark_core::catalog;

use super::get_context;
use crate::output;

pub fn run(
    version: Option<u32>,
    bootstrap: bool,
    pending: Option<String>,
    out: Option<PathBuf>,
) -> Result<()> {
    if bootstrap {
        return emit(catalog::BOOTSTRAP_SQL.to_string(), out);
    }

    if let Some(slug) = pending {
        let ctx = get_context()?;
        let units = ctx.reconcile_service.pending_units(&slug)?;
        if units.is_empty() {
            output::info(&format!("{} has no pending migrations", slug));
            return Ok(());
        }
        let mut sql = String::new();
        for unit in units {
            sql.push_str(&format!("-- v{}: {}\n", unit.version, unit.name));
            sql.push_str(unit.body.trim_end());
            sql.push_str("\n\n");
        }
        return emit(sql, out);
    }

    if let Some(v) = version {
        let unit = match catalog::unit_for(v) {
            Some(u) => u,
            None => {
                output::error(&format!(
                    "No catalog unit for version {} (catalog has v1..v{})",
                    v,
                    catalog::latest_version()
                ));
                std::process::exit(1);
            }
        };
        return emit(unit.body.to_string(), out);
    }

    // No selector: list the catalog
    println!("{}", "Migration Catalog".bold());
    println!();
    let mut table = output::create_table();
    table.set_header(vec!["Version", "Name", "Description"]);
    for unit in catalog::list() {
        table.add_row(vec![
            format!("v{}", unit.version),
            unit.name.to_string(),
            unit.description.to_string(),
        ]);
    }
    println!("{}", table);
    println!();
    println!(
        "{}",
        "  Print one with: tm show-sql <version>, or the installer with: tm show-sql --bootstrap"
            .dimmed()
    );

    Ok(())
}

fn emit(sql: String, out: Option<PathBuf>) -> Result<()> {
    match out {
        Some(path) => {
            std::fs::write(&path, &sql)?;
            output::success(&format!("Wrote {} bytes to {}", sql.len(), path.display()));
        }
        None => println!("{}", sql.trim_end()),
    }
    Ok(())
}
