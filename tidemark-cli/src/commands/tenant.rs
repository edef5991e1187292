//! Tenant commands - manage tenant registrations

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;
use dialoguer::Confirm;

use tidemark_core::{catalog, AuditEvent, Tenant};

use super::{get_audit, get_context, log_event};
use crate::output;

#[derive(Subcommand)]
pub enum TenantCommands {
    /// Register a new tenant
    Add {
        /// Tenant slug (lowercase letters, digits, hyphens)
        slug: String,
        /// Human-readable tenant name
        name: String,
        /// Tenant database base URL (https)
        #[arg(long)]
        database_url: Option<String>,
        /// Service role API key
        #[arg(long)]
        service_key: Option<String>,
        /// Anon API key (fallback when no service key is set)
        #[arg(long)]
        anon_key: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List registered tenants
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show one tenant's registration
    Show {
        /// Tenant slug
        slug: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Remove a tenant registration (the remote database is untouched)
    Remove {
        /// Tenant slug
        slug: String,
        /// Skip confirmation prompt
        #[arg(long, short)]
        force: bool,
    },
    /// Update a tenant's connection settings
    SetConnection {
        /// Tenant slug
        slug: String,
        /// Tenant database base URL (https)
        #[arg(long)]
        database_url: Option<String>,
        /// Service role API key
        #[arg(long)]
        service_key: Option<String>,
        /// Anon API key
        #[arg(long)]
        anon_key: Option<String>,
    },
}

/// JSON view of a tenant. API keys are never printed, only whether they
/// are set.
fn tenant_json(tenant: &Tenant) -> serde_json::Value {
    serde_json::json!({
        "id": tenant.id.to_string(),
        "slug": tenant.slug,
        "name": tenant.name,
        "database_url": tenant.database_url,
        "service_key_set": tenant.service_key.as_deref().is_some_and(|k| !k.is_empty()),
        "anon_key_set": tenant.anon_key.as_deref().is_some_and(|k| !k.is_empty()),
        "applied_version": tenant.applied_version,
        "confirmed_digest": tenant.confirmed_digest,
        "created_at": tenant.created_at.to_rfc3339(),
        "updated_at": tenant.updated_at.to_rfc3339(),
    })
}

fn key_state(key: Option<&str>) -> String {
    match key {
        Some(k) if !k.is_empty() => "set".green().to_string(),
        _ => "not set".dimmed().to_string(),
    }
}

pub fn run(command: TenantCommands) -> Result<()> {
    match command {
        TenantCommands::Add {
            slug,
            name,
            database_url,
            service_key,
            anon_key,
            json,
        } => {
            let ctx = get_context()?;
            let audit = get_audit();

            let tenant =
                ctx.tenant_service
                    .add(&slug, &name, database_url, service_key, anon_key)?;
            log_event(&audit, AuditEvent::new("tenant_added").with_tenant(&slug));

            if json {
                println!("{}", serde_json::to_string_pretty(&tenant_json(&tenant))?);
                return Ok(());
            }

            output::success(&format!("Registered tenant '{}'", slug));
            if tenant.is_configured() {
                println!("{}", format!("  Next: tm migrate {}", slug).dimmed());
            } else {
                println!(
                    "{}",
                    format!(
                        "  Not yet reconcilable; set a connection with: tm tenant set-connection {}",
                        slug
                    )
                    .dimmed()
                );
            }
        }

        TenantCommands::List { json } => {
            let ctx = get_context()?;
            let tenants = ctx.tenant_service.list()?;

            if json {
                let rows: Vec<serde_json::Value> = tenants.iter().map(tenant_json).collect();
                println!("{}", serde_json::to_string_pretty(&rows)?);
                return Ok(());
            }

            if tenants.is_empty() {
                println!("No tenants registered.");
                return Ok(());
            }

            let mut table = output::create_table();
            table.set_header(vec!["Slug", "Name", "Database URL", "Schema"]);
            for tenant in &tenants {
                table.add_row(vec![
                    tenant.slug.clone(),
                    tenant.name.clone(),
                    tenant
                        .database_url
                        .clone()
                        .unwrap_or_else(|| "-".to_string()),
                    format!("v{}", tenant.applied_version),
                ]);
            }
            println!("{}", table);
        }

        TenantCommands::Show { slug, json } => {
            let ctx = get_context()?;
            let tenant = match ctx.tenant_service.get(&slug) {
                Ok(t) => t,
                Err(_) => {
                    output::error(&format!("Tenant '{}' not found", slug));
                    println!("{}", "  List tenants with: tm tenant list".dimmed());
                    std::process::exit(1);
                }
            };

            if json {
                println!("{}", serde_json::to_string_pretty(&tenant_json(&tenant))?);
                return Ok(());
            }

            println!("{}", tenant.name.bold());
            println!("  Slug:         {}", tenant.slug);
            println!("  Id:           {}", tenant.id);
            println!(
                "  Database URL: {}",
                tenant.database_url.as_deref().unwrap_or("-")
            );
            println!("  Service key:  {}", key_state(tenant.service_key.as_deref()));
            println!("  Anon key:     {}", key_state(tenant.anon_key.as_deref()));
            println!(
                "  Schema:       v{} (catalog latest v{})",
                tenant.applied_version,
                catalog::latest_version()
            );
            if let Some(digest) = &tenant.confirmed_digest {
                println!("  Confirmed:    {}", digest);
            }
        }

        TenantCommands::Remove { slug, force } => {
            let ctx = get_context()?;
            let audit = get_audit();

            if ctx.tenant_service.get(&slug).is_err() {
                output::error(&format!("Tenant '{}' not found", slug));
                println!("{}", "  List tenants with: tm tenant list".dimmed());
                std::process::exit(1);
            }

            if !force {
                let confirmed = Confirm::new()
                    .with_prompt(format!(
                        "Remove tenant '{}' from the registry? Its tracked schema version will be lost.",
                        slug
                    ))
                    .default(false)
                    .interact()?;
                if !confirmed {
                    println!("Cancelled.");
                    return Ok(());
                }
            }

            ctx.tenant_service.remove(&slug)?;
            log_event(&audit, AuditEvent::new("tenant_removed").with_tenant(&slug));
            output::success(&format!("Removed tenant '{}'", slug));
        }

        TenantCommands::SetConnection {
            slug,
            database_url,
            service_key,
            anon_key,
        } => {
            let ctx = get_context()?;
            let audit = get_audit();

            if database_url.is_none() && service_key.is_none() && anon_key.is_none() {
                output::error("Nothing to update.");
                println!(
                    "{}",
                    "  Pass at least one of --database-url, --service-key, --anon-key".dimmed()
                );
                std::process::exit(1);
            }

            let tenant =
                ctx.tenant_service
                    .set_connection(&slug, database_url, service_key, anon_key)?;
            log_event(
                &audit,
                AuditEvent::new("tenant_connection_updated").with_tenant(&slug),
            );

            output::success(&format!("Updated connection for '{}'", slug));
            if tenant.is_configured() {
                println!("{}", format!("  Next: tm migrate {}", slug).dimmed());
            }
        }
    }

    Ok(())
}
