//! Command-line interface for planforge.

use std::time::Duration;

use anyhow::{Context, Result, bail};
use camino::{Utf8Path, Utf8PathBuf};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use planforge_canon::{HashCheck, canonicalize, check_artifact_hash, hash_canonical};
use planforge_engine::{PlanRequest, PlanService};
use planforge_validators::ValidatorConfig;

/// planforge - deterministic plan compiler
#[derive(Parser)]
#[command(name = "planforge")]
#[command(about = "Compile a plan document into content-addressed JSON artifacts")]
#[command(long_about = r#"
planforge compiles a lightweight planning document into a set of
content-addressed JSON artifacts: tasks.json, dag.json, waves.json,
features.json and coordinator.json, plus a Plan.md summary.

EXAMPLES:
  # Compile a plan document
  planforge plan --doc plan.md --out artifacts/

  # Compile the deterministic stub plan (no document)
  planforge plan --out artifacts/

  # Gate the plan on external validators
  planforge plan --doc plan.md --out artifacts/ \
      --validators-acceptance './check-acceptance.sh' --strict-validators

  # Canonicalize a JSON file and print its SHA-256
  planforge canonical artifacts/tasks.json

  # Re-verify emitted artifacts (hashes and cross-references)
  planforge verify --dir artifacts/
"#)]
#[command(version)]
pub struct Cli {
    /// Enable verbose logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Compile a plan document into artifacts
    Plan {
        /// Plan document path; omitted or missing yields the stub plan
        #[arg(long)]
        doc: Option<Utf8PathBuf>,

        /// Repository to census for `meta.codebase_analysis`
        #[arg(long)]
        repo: Option<Utf8PathBuf>,

        /// Output directory for artifacts
        #[arg(long, default_value = "plan")]
        out: Utf8PathBuf,

        /// Confidence floor for structural edges, in [0, 1]
        #[arg(long)]
        min_confidence: Option<f64>,

        /// Acceptance validator command (run via the host shell)
        #[arg(long)]
        validators_acceptance: Option<String>,

        /// Evidence validator command
        #[arg(long)]
        validators_evidence: Option<String>,

        /// Interface validator command
        #[arg(long)]
        validators_interface: Option<String>,

        /// Validator report cache directory
        #[arg(long, default_value = ".planforge/validator-cache")]
        validators_cache: Utf8PathBuf,

        /// Per-validator deadline in seconds
        #[arg(long, default_value_t = 30)]
        validators_timeout_secs: u64,

        /// Abort on any failed or errored validator report
        #[arg(long)]
        strict_validators: bool,
    },

    /// Canonicalize a JSON file and print its SHA-256 hash
    Canonical {
        /// JSON file to canonicalize
        file: Utf8PathBuf,
    },

    /// Verify artifact hashes and cross-references in a directory
    Verify {
        /// Directory containing emitted artifacts
        #[arg(long)]
        dir: Utf8PathBuf,
    },
}

/// Entry point used by the binary; parses arguments, initializes logging and
/// dispatches.
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    match cli.command {
        Commands::Plan {
            doc,
            repo,
            out,
            min_confidence,
            validators_acceptance,
            validators_evidence,
            validators_interface,
            validators_cache,
            validators_timeout_secs,
            strict_validators,
        } => {
            let mut validators = ValidatorConfig::new(validators_cache);
            validators.acceptance_cmd = validators_acceptance;
            validators.evidence_cmd = validators_evidence;
            validators.interface_cmd = validators_interface;
            validators.timeout = Duration::from_secs(validators_timeout_secs);

            let request = PlanRequest {
                doc_path: doc,
                repo_path: repo,
                out_dir: out,
                min_confidence,
                validators,
                strict_validators,
            };
            run_plan(request)
        }
        Commands::Canonical { file } => run_canonical(&file),
        Commands::Verify { dir } => run_verify(&dir),
    }
}

fn init_logging(verbose: bool) {
    let fallback = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    // Ignore re-init failures (tests invoke run() repeatedly).
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn run_plan(request: PlanRequest) -> Result<()> {
    let out_dir = request.out_dir.clone();
    let runtime = tokio::runtime::Runtime::new().context("start async runtime")?;
    let outcome = runtime.block_on(PlanService::new().plan(request))?;

    for warning in &outcome.warnings {
        eprintln!("warning: {warning}");
    }
    println!("wrote {} artifacts to {out_dir}", outcome.artifact_hashes.len());
    for (name, hash) in &outcome.artifact_hashes {
        println!("  {name}: {hash}");
    }
    for report in &outcome.validator_reports {
        let cached = if report.cached { " (cached)" } else { "" };
        println!("  validator {}: {}{}", report.name, report.status, cached);
    }
    Ok(())
}

fn run_canonical(file: &Utf8Path) -> Result<()> {
    let raw = std::fs::read(file).with_context(|| format!("read {file}"))?;
    let canonical = canonicalize(&raw).with_context(|| format!("canonicalize {file}"))?;
    let hash = hash_canonical(&canonical);
    print!("{}", String::from_utf8_lossy(&canonical));
    println!("sha256: {hash}");
    Ok(())
}

fn run_verify(dir: &Utf8Path) -> Result<()> {
    const ARTIFACTS: [&str; 5] = [
        "tasks.json",
        "dag.json",
        "waves.json",
        "features.json",
        "coordinator.json",
    ];
    let mut failures: Vec<String> = Vec::new();
    let mut stored_hashes: std::collections::BTreeMap<&str, String> = Default::default();

    for name in ARTIFACTS {
        let path = dir.join(name);
        let raw = match std::fs::read(&path) {
            Ok(raw) => raw,
            Err(err) => {
                failures.push(format!("{name}: {err}"));
                continue;
            }
        };
        match check_artifact_hash(&raw) {
            Ok(check) => {
                if check.matches() {
                    println!("{name}: hash ok");
                } else {
                    failures.push(format!("{name}: artifact hash mismatch"));
                }
                if let HashCheck::Checked { stored, .. } = check {
                    stored_hashes.insert(name, stored);
                }
            }
            Err(err) => failures.push(format!("{name}: {err}")),
        }
    }

    // Cross-references: dag and waves must point at the tasks artifact.
    if let Some(tasks_hash) = stored_hashes.get("tasks.json") {
        for (name, pointer) in [("dag.json", "/meta/tasks_hash"), ("waves.json", "/meta/planId")] {
            let Ok(raw) = std::fs::read(dir.join(name)) else {
                continue;
            };
            let value: serde_json::Value = match serde_json::from_slice(&raw) {
                Ok(value) => value,
                Err(err) => {
                    failures.push(format!("{name}: {err}"));
                    continue;
                }
            };
            let reference = value.pointer(pointer).and_then(|v| v.as_str()).unwrap_or("");
            if reference != tasks_hash {
                failures.push(format!(
                    "{name}: {pointer} does not match tasks.json artifact hash"
                ));
            }
        }
    }

    if !failures.is_empty() {
        bail!("verification failed:\n  {}", failures.join("\n  "));
    }
    println!("all artifacts verified");
    Ok(())
}
