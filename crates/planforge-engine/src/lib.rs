//! The plan service: one deterministic compilation pass from specification
//! document to content-addressed artifacts.
//!
//! Composition order: load the document (or stub), build the tasks skeleton,
//! attach the repository census, resolve dependencies and resource
//! conflicts, enforce acceptance coverage for document-provided plans,
//! structurally validate, build the DAG, schedule waves, project the
//! coordinator, run validators (strict or lenient), and emit the bundle.

pub mod census;
pub mod coordinator;
pub mod error;
pub mod loader;
pub mod resolver;
pub mod validate;

use std::collections::BTreeMap;
use std::sync::Arc;

use camino::Utf8PathBuf;
use tracing::{info, warn};

use planforge_model::{
    ArtifactMeta, FeaturesArtifact, SCHEMA_VERSION, TasksFile, VALIDATOR_DETAIL_LIMIT,
    ValidatorReport, WavesArtifact, truncate_detail,
};
use planforge_validators::{Payload, ValidatorConfig, ValidatorRunner};

pub use census::{Analyzer, CensusAnalyzer, CensusCounts};
pub use error::PlanError;
pub use loader::{DocLoader, LoadedPlan, MarkdownDocLoader};
pub use resolver::{Resolution, resolve};

/// Confidence floor applied when the request leaves it unset.
pub const DEFAULT_MIN_CONFIDENCE: f64 = 0.7;

/// One plan invocation.
#[derive(Debug, Clone)]
pub struct PlanRequest {
    pub doc_path: Option<Utf8PathBuf>,
    pub repo_path: Option<Utf8PathBuf>,
    pub out_dir: Utf8PathBuf,
    pub min_confidence: Option<f64>,
    pub validators: ValidatorConfig,
    pub strict_validators: bool,
}

/// What a successful invocation hands back.
#[derive(Debug, Default)]
pub struct PlanOutcome {
    pub artifact_hashes: BTreeMap<String, String>,
    pub validator_reports: Vec<ValidatorReport>,
    pub warnings: Vec<String>,
}

/// Orchestrates the pipeline exactly once per invocation. Seams (document
/// loading, repository analysis) are injectable for tests; everything else
/// is direct composition.
pub struct PlanService {
    loader: Box<dyn DocLoader>,
    analyzer: Arc<dyn Analyzer>,
}

impl Default for PlanService {
    fn default() -> Self {
        Self::new()
    }
}

impl PlanService {
    #[must_use]
    pub fn new() -> Self {
        Self {
            loader: Box::new(MarkdownDocLoader),
            analyzer: Arc::new(CensusAnalyzer),
        }
    }

    #[must_use]
    pub fn with_seams(loader: Box<dyn DocLoader>, analyzer: Arc<dyn Analyzer>) -> Self {
        Self { loader, analyzer }
    }

    /// Execute the planning workflow.
    pub async fn plan(&self, request: PlanRequest) -> Result<PlanOutcome, PlanError> {
        let min_confidence = request.min_confidence.unwrap_or(DEFAULT_MIN_CONFIDENCE);
        if !(0.0..=1.0).contains(&min_confidence) {
            return Err(PlanError::Config(format!(
                "min_confidence {min_confidence} outside [0, 1]"
            )));
        }

        let loaded = self.loader.load(request.doc_path.as_deref())?;
        info!(
            tasks = loaded.tasks.len(),
            features = loaded.features.len(),
            doc_provided = loaded.doc_provided,
            "loaded plan"
        );

        let mut tasks_file = TasksFile::default();
        tasks_file.meta.version = SCHEMA_VERSION.to_string();
        tasks_file.meta.min_confidence = min_confidence;
        if let Some(repo) = &request.repo_path {
            let analyzer = Arc::clone(&self.analyzer);
            let repo = repo.clone();
            let counts = tokio::task::spawn_blocking(move || analyzer.analyze(&repo))
                .await
                .map_err(|err| PlanError::Census(std::io::Error::other(err)))?
                .map_err(PlanError::Census)?;
            tasks_file.meta.codebase_analysis =
                serde_json::to_value(counts).unwrap_or(serde_json::Value::Null);
        }

        let resolution = resolve(&loaded.tasks, &loaded.dependencies);
        tasks_file.tasks = loaded.tasks;
        tasks_file.dependencies = resolution.edges;
        tasks_file.resource_conflicts = resolution.conflicts;

        if loaded.doc_provided {
            let missing: Vec<String> = tasks_file
                .tasks
                .iter()
                .filter(|task| task.acceptance_checks.is_empty())
                .map(|task| task.id.clone())
                .collect();
            if !missing.is_empty() {
                return Err(PlanError::AcceptanceMissing { ids: missing });
            }
        }

        validate::tasks_file(&tasks_file)?;
        let dag = planforge_dag::build(
            &tasks_file.tasks,
            &tasks_file.dependencies,
            min_confidence,
        )?;
        validate::dag_file(&dag)?;

        let waves = WavesArtifact {
            meta: planforge_model::WavesMeta {
                version: SCHEMA_VERSION.to_string(),
                plan_id: String::new(),
                artifact_hash: String::new(),
            },
            waves: planforge_waves::generate(&dag, &tasks_file.tasks),
        };
        let features = FeaturesArtifact {
            meta: ArtifactMeta {
                version: SCHEMA_VERSION.to_string(),
                artifact_hash: String::new(),
            },
            features: loaded.features,
        };
        let coordinator =
            coordinator::build_coordinator(&tasks_file.tasks, &tasks_file.dependencies, &dag);

        let mut warnings = Vec::new();
        if request.validators.is_configured() {
            let runner = ValidatorRunner::new(request.validators.clone())
                .map_err(|err| PlanError::Config(err.to_string()))?;
            let payload = Payload {
                tasks: Some(&tasks_file),
                dag: Some(&dag),
                coordinator: Some(&coordinator),
            };
            let outcome = runner.run(&payload).await?;

            let embedded: Vec<ValidatorReport> = outcome
                .reports
                .iter()
                .cloned()
                .map(|mut report| {
                    report.detail = truncate_detail(&report.detail, VALIDATOR_DETAIL_LIMIT);
                    report
                })
                .collect();
            let failing: Vec<String> = embedded
                .iter()
                .filter(|report| report.is_failure())
                .map(|report| report.name.clone())
                .collect();
            tasks_file.meta.validator_reports = embedded;

            if request.strict_validators {
                if let Some(error) = outcome.error {
                    return Err(PlanError::Validator(error));
                }
                if !failing.is_empty() {
                    return Err(PlanError::ValidatorGate { names: failing });
                }
            } else {
                if let Some(error) = outcome.error {
                    warn!(%error, "validator execution failed; continuing");
                    warnings.push(error.to_string());
                }
                for name in failing {
                    warnings.push(format!("validator {name} reported failure"));
                }
            }
        }

        let mut bundle = planforge_emitter::ArtifactBundle {
            tasks: tasks_file,
            dag,
            waves,
            features,
            coordinator,
        };
        let artifact_hashes = planforge_emitter::write_bundle(&request.out_dir, &mut bundle)?;
        info!(out_dir = %request.out_dir, "plan compiled");

        Ok(PlanOutcome {
            artifact_hashes,
            validator_reports: bundle.tasks.meta.validator_reports.clone(),
            warnings,
        })
    }
}
