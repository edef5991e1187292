//! Tidemark CLI - tenant schema reconciliation in your terminal

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod output;

use commands::{bootstrap, logs, mark, migrate, show_sql, status, tenant};

/// Tidemark - keep every tenant database on the latest schema
#[derive(Parser)]
#[command(name = "tm", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show fleet-wide schema status
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Manage tenant registrations
    Tenant {
        #[command(subcommand)]
        command: tenant::TenantCommands,
    },

    /// Reconcile tenant schemas against the catalog
    Migrate {
        /// Tenant slug (omit with --all)
        slug: Option<String>,
        /// Reconcile every registered tenant
        #[arg(long)]
        all: bool,
        /// Stop after a single catalog unit
        #[arg(long)]
        step: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Install the remote execution entry point on a tenant
    Bootstrap {
        /// Tenant slug
        slug: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Record a tenant as fully migrated without executing anything
    MarkComplete {
        /// Tenant slug
        slug: String,
        /// Skip confirmation prompt
        #[arg(long, short)]
        force: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print catalog or bootstrap SQL for manual application
    ShowSql {
        /// Catalog version to print
        version: Option<u32>,
        /// Print the entry point installer instead
        #[arg(long)]
        bootstrap: bool,
        /// Print all units a tenant has not applied yet
        #[arg(long)]
        pending: Option<String>,
        /// Write to a file instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// View the reconciliation audit trail
    Logs {
        #[command(subcommand)]
        command: logs::LogsCommands,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = run(cli);

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Status { json } => status::run(json),
        Commands::Tenant { command } => tenant::run(command),
        Commands::Migrate { slug, all, step, json } => migrate::run(slug, all, step, json),
        Commands::Bootstrap { slug, json } => bootstrap::run(&slug, json),
        Commands::MarkComplete { slug, force, json } => mark::run(&slug, force, json),
        Commands::ShowSql { version, bootstrap, pending, out } => {
            show_sql::run(version, bootstrap, pending, out)
        }
        Commands::Logs { command } => logs::run(command),
    }
}
