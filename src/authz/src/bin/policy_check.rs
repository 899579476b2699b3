//! Policy checker
//!
//! Loads a policy file, validates roles and access map, and prints a summary.

use anyhow::Result;
use clap::Parser;
use hubscope_authz::{PolicyConfig, ResourceKind};
use serde::Serialize;
use std::path::PathBuf;
use tracing::info;

/// Validate a hub access policy
#[derive(Parser)]
#[command(name = "policy-check")]
#[command(about = "Validate roles and access map of a hub access policy")]
#[command(version)]
struct Cli {
    /// Path to the policy file
    #[arg(env = "HUBSCOPE_POLICY")]
    file: PathBuf,

    /// Print the summary as JSON
    #[arg(long)]
    json: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Serialize)]
struct RoleSummary {
    name: String,
    description: Option<String>,
    scopes: Vec<String>,
}

#[derive(Serialize)]
struct PolicySummary {
    roles: Vec<RoleSummary>,
    builtin_access_map: bool,
    access_map: Vec<(ResourceKind, Vec<String>)>,
}

fn summarize(config: &PolicyConfig) -> PolicySummary {
    let roles = config
        .role_registry()
        .iter()
        .map(|role| RoleSummary {
            name: role.name.clone(),
            description: role.description.clone(),
            scopes: role.scopes.clone(),
        })
        .collect();

    let access_map = config.access_map();
    let tables = ResourceKind::ALL
        .iter()
        .map(|kind| (*kind, access_map.table(*kind).keys().cloned().collect()))
        .collect();

    PolicySummary {
        roles,
        builtin_access_map: config.access_map.is_none(),
        access_map: tables,
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so --json output stays parseable
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_level.into()),
        )
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();

    let config = PolicyConfig::load(&cli.file)?;
    config.validate()?;
    info!("Policy {:?} is valid", cli.file);

    let summary = summarize(&config);
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!("Roles ({}):", summary.roles.len());
    for role in &summary.roles {
        println!("  {} = [{}]", role.name, role.scopes.join(", "));
    }

    let source = if summary.builtin_access_map { "built-in" } else { "custom" };
    println!("Access map ({}):", source);
    for (kind, scopes) in &summary.access_map {
        println!("  {}: {}", kind, scopes.join(", "));
    }

    Ok(())
}
