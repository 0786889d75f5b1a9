//! Incident responder CLI
//!
//! ```bash
//! # Handle one incident and print the response record
//! incident-responder handle "Build failed with compilation errors"
//!
//! # Override the classification and affected systems
//! incident-responder handle "checkout is down" --severity critical --business-impact critical --system backend
//!
//! # Inspect the incident log
//! incident-responder history --limit 10
//! incident-responder show resp-6f1c…
//! ```
//!
//! Configuration comes from `--config <file.toml>` plus `RESPONDER_*`
//! environment variables; logging is controlled by `RUST_LOG`.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use coordination::incident::{ImpactLevel, IncidentType, PartialIncidentContext, Severity};
use coordination::persistence::read_records;
use incident_responder::{OrchestratorBuilder, ResponderConfig};
use tracing::info;

/// Command-line arguments
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to a TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the full response pipeline for one failure message
    Handle {
        /// Raw error message to classify
        message: String,

        /// Override the classified incident type (e.g. build_failure)
        #[arg(long = "type")]
        incident_type: Option<IncidentType>,

        #[arg(long)]
        severity: Option<Severity>,

        #[arg(long)]
        user_impact: Option<ImpactLevel>,

        #[arg(long)]
        business_impact: Option<ImpactLevel>,

        /// Affected system (repeatable); replaces keyword detection
        #[arg(long = "system")]
        systems: Vec<String>,

        /// Affected file (repeatable)
        #[arg(long = "file")]
        files: Vec<String>,
    },

    /// List the most recent persisted responses
    History {
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },

    /// Print one persisted response as JSON
    Show { response_id: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = ResponderConfig::load(args.config.as_deref())?;

    match args.command {
        Command::Handle {
            message,
            incident_type,
            severity,
            user_impact,
            business_impact,
            systems,
            files,
        } => {
            let partial = PartialIncidentContext {
                incident_type,
                severity,
                user_impact,
                business_impact,
                affected_systems: (!systems.is_empty()).then(|| systems.into_iter().collect()),
                affected_files: (!files.is_empty()).then_some(files),
                ..Default::default()
            };

            info!(
                project_root = %config.project_root.display(),
                log = %config.log_path().display(),
                capabilities = config.capabilities.len(),
                "Incident responder starting"
            );

            let orchestrator = OrchestratorBuilder::from_config(&config).build();
            let record = orchestrator.handle(&message, Some(partial)).await;
            println!(
                "{}",
                serde_json::to_string_pretty(&record).context("Failed to render response record")?
            );
        }

        Command::History { limit } => {
            let records = read_records(&config.log_path()).await?;
            let skip = records.len().saturating_sub(limit);
            for r in records.iter().skip(skip) {
                println!(
                    "{}  {:<9}  {}/{}  {}ms  escalation={}",
                    r.response_id,
                    r.status.to_string(),
                    r.incident_type,
                    r.severity,
                    r.resolution_time_ms,
                    r.escalation_required
                );
            }
        }

        Command::Show { response_id } => {
            let records = read_records(&config.log_path()).await?;
            let Some(record) = records.iter().rev().find(|r| r.response_id == response_id) else {
                bail!(
                    "No response {response_id} in {}",
                    config.log_path().display()
                );
            };
            println!("{}", serde_json::to_string_pretty(record)?);
        }
    }

    Ok(())
}
