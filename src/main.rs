//! INTEGRA - Fitness-For-Service Assessment Engine
//!
//! Operator CLI over the assessment core.
//!
//! # Usage
//!
//! ```bash
//! # Assess a job file against the builtin material library
//! integra assess --job jobs/v-101.json
//!
//! # Add operator material tables and a site policy
//! integra assess --job jobs/v-101.json --materials site-materials.toml --policy site.toml
//!
//! # Inspect and verify the audit stream
//! integra show-audit --calculation-id 7c9e6679-7425-40de-944b-e07fc1f90ae7
//! integra verify-audit
//! integra verify-audit --from 100 --to 250
//! ```
//!
//! # Environment Variables
//!
//! - `INTEGRA_AUDIT_DB`: audit stream directory (default: ./integra-audit)
//! - `RUST_LOG`: logging level (default: info)

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use uuid::Uuid;

use integra::audit::{AuditStore, SledAuditStore};
use integra::{AssessmentService, Job, MaterialLibrary, Policy};

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "integra")]
#[command(about = "Fitness-for-service assessment engine (API 579-1 Level 1)")]
#[command(version)]
struct CliArgs {
    /// Audit stream directory
    #[arg(long, env = "INTEGRA_AUDIT_DB", default_value = "./integra-audit")]
    audit_db: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run one assessment job from a JSON file and print the result
    Assess {
        /// Path to the job JSON file
        #[arg(long)]
        job: PathBuf,

        /// Operator material table file (TOML), merged over the builtins
        #[arg(long)]
        materials: Option<PathBuf>,

        /// Site policy file (TOML); defaults apply when omitted
        #[arg(long)]
        policy: Option<PathBuf>,
    },

    /// Print the audit entry for a calculation id
    ShowAudit {
        #[arg(long)]
        calculation_id: Uuid,
    },

    /// Verify the audit chain (whole stream, or a sequence range)
    VerifyAudit {
        #[arg(long, requires = "to")]
        from: Option<u64>,
        #[arg(long, requires = "from")]
        to: Option<u64>,
    },
}

// ============================================================================
// Entry point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = CliArgs::parse();

    match args.command {
        Command::Assess {
            job,
            materials,
            policy,
        } => run_assess(&args.audit_db, &job, materials.as_deref(), policy.as_deref()).await,
        Command::ShowAudit { calculation_id } => show_audit(&args.audit_db, calculation_id),
        Command::VerifyAudit { from, to } => verify_audit(&args.audit_db, from.zip(to)),
    }
}

async fn run_assess(
    audit_db: &std::path::Path,
    job_path: &std::path::Path,
    materials_path: Option<&std::path::Path>,
    policy_path: Option<&std::path::Path>,
) -> Result<()> {
    let policy = match policy_path {
        Some(path) => {
            let (policy, warnings) = Policy::load(path)
                .with_context(|| format!("loading policy {}", path.display()))?;
            for w in &warnings {
                warn!(field = %w.field, "{w}");
            }
            policy
        }
        None => Policy::default(),
    };

    let mut materials = MaterialLibrary::builtin();
    if let Some(path) = materials_path {
        let count = materials
            .load_file(path)
            .with_context(|| format!("loading material tables {}", path.display()))?;
        info!(count, "merged operator material tables");
    }

    let raw = std::fs::read_to_string(job_path)
        .with_context(|| format!("reading job {}", job_path.display()))?;
    let job: Job =
        serde_json::from_str(&raw).with_context(|| format!("parsing job {}", job_path.display()))?;

    let audit = Arc::new(SledAuditStore::open(audit_db)?);
    let service = AssessmentService::new(policy, Arc::new(materials), audit.clone());

    match service.assess(job).await {
        Ok(result) => {
            audit.flush()?;
            println!("{}", serde_json::to_string_pretty(&result)?);
            Ok(())
        }
        Err(err) => {
            bail!("assessment failed [{}]: {err}", err.code());
        }
    }
}

fn show_audit(audit_db: &std::path::Path, calculation_id: Uuid) -> Result<()> {
    let store = SledAuditStore::open(audit_db)?;
    match store.get(calculation_id)? {
        Some(entry) => {
            println!("{}", serde_json::to_string_pretty(&entry)?);
            Ok(())
        }
        None => bail!("no audit entry for calculation id {calculation_id}"),
    }
}

fn verify_audit(audit_db: &std::path::Path, range: Option<(u64, u64)>) -> Result<()> {
    let store = SledAuditStore::open(audit_db)?;
    let outcome = match range {
        Some((from, to)) => store.verify_range(from, to)?,
        None => store.verify_all()?,
    };
    println!("{outcome}");
    if !outcome.is_ok() {
        bail!("audit chain verification failed");
    }
    Ok(())
}
