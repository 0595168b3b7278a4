//! Fixed-order bundle emission with cross-referenced hashes.

use std::collections::BTreeMap;

use camino::Utf8Path;
use tracing::info;

use planforge_model::{
    Coordinator, DagFile, FeaturesArtifact, TasksFile, VALIDATOR_DETAIL_LIMIT, ValidatorReport,
    WavesArtifact, truncate_detail,
};

use crate::atomic::write_bytes_atomic;
use crate::error::EmitError;
use crate::write::{write_canonical, write_with_artifact_hash};

/// Everything one plan invocation emits.
#[derive(Debug)]
pub struct ArtifactBundle {
    pub tasks: TasksFile,
    pub dag: DagFile,
    pub waves: WavesArtifact,
    pub features: FeaturesArtifact,
    pub coordinator: Coordinator,
}

/// Write the bundle to `out_dir`, returning artifact hashes by file name.
///
/// Order is fixed because later artifacts reference earlier hashes:
/// `tasks.json` first, then `dag.json` (embedding `tasks_hash`), then
/// `waves.json` (embedding `planId`), then `features.json`,
/// `coordinator.json` and the `Plan.md` summary. Failures are collected and
/// returned together; artifacts that could be written, were.
pub fn write_bundle(
    out_dir: &Utf8Path,
    bundle: &mut ArtifactBundle,
) -> Result<BTreeMap<String, String>, EmitError> {
    let mut hashes: BTreeMap<String, String> = BTreeMap::new();
    let mut errors: Vec<EmitError> = Vec::new();

    bundle.tasks.meta.artifact_hash = String::new();
    match write_with_artifact_hash(&out_dir.join("tasks.json"), &mut bundle.tasks, |t, h| {
        t.meta.artifact_hash = h.to_string();
    }) {
        Ok(hash) => {
            hashes.insert("tasks.json".to_string(), hash);
        }
        Err(err) => errors.push(err),
    }
    let tasks_hash = hashes.get("tasks.json").cloned().unwrap_or_default();

    bundle.dag.meta.tasks_hash = tasks_hash.clone();
    bundle.dag.meta.artifact_hash = String::new();
    match write_with_artifact_hash(&out_dir.join("dag.json"), &mut bundle.dag, |d, h| {
        d.meta.artifact_hash = h.to_string();
    }) {
        Ok(hash) => {
            hashes.insert("dag.json".to_string(), hash);
        }
        Err(err) => errors.push(err),
    }

    // planId is part of the waves preimage: set it before hashing.
    bundle.waves.meta.plan_id = tasks_hash;
    bundle.waves.meta.artifact_hash = String::new();
    match write_with_artifact_hash(&out_dir.join("waves.json"), &mut bundle.waves, |w, h| {
        w.meta.artifact_hash = h.to_string();
    }) {
        Ok(hash) => {
            hashes.insert("waves.json".to_string(), hash);
        }
        Err(err) => errors.push(err),
    }

    bundle.features.meta.artifact_hash = String::new();
    match write_with_artifact_hash(&out_dir.join("features.json"), &mut bundle.features, |f, h| {
        f.meta.artifact_hash = h.to_string();
    }) {
        Ok(hash) => {
            hashes.insert("features.json".to_string(), hash);
        }
        Err(err) => errors.push(err),
    }

    match write_canonical(&out_dir.join("coordinator.json"), &bundle.coordinator) {
        Ok(hash) => {
            hashes.insert("coordinator.json".to_string(), hash);
        }
        Err(err) => errors.push(err),
    }

    if let Err(err) = write_plan_summary(out_dir, &hashes, &bundle.tasks.meta.validator_reports) {
        errors.push(err);
    }

    if errors.is_empty() {
        info!(out_dir = %out_dir, artifacts = hashes.len(), "bundle emitted");
        Ok(hashes)
    } else {
        Err(EmitError::Aggregate(errors))
    }
}

fn write_plan_summary(
    out_dir: &Utf8Path,
    hashes: &BTreeMap<String, String>,
    reports: &[ValidatorReport],
) -> Result<(), EmitError> {
    const NAMES: [&str; 5] = [
        "features.json",
        "tasks.json",
        "dag.json",
        "waves.json",
        "coordinator.json",
    ];
    let mut out = String::from("# Plan\n\n## Hashes\n\n");
    for name in NAMES {
        let hash = hashes.get(name).map(String::as_str).unwrap_or_default();
        out.push_str(&format!("- {name}: {hash}\n"));
    }
    if !reports.is_empty() {
        out.push_str("\n## Validators\n\n");
        for report in reports {
            let cached = if report.cached { " (cached)" } else { "" };
            let mut detail = truncate_detail(&report.detail, VALIDATOR_DETAIL_LIMIT);
            if detail.is_empty() {
                if let Some(raw) = &report.raw_output {
                    detail = truncate_detail(&raw.to_string(), VALIDATOR_DETAIL_LIMIT);
                }
            }
            if detail.is_empty() {
                out.push_str(&format!("- {}: {}{}\n", report.name, report.status, cached));
            } else {
                out.push_str(&format!(
                    "- {}: {}{} — {}\n",
                    report.name, report.status, cached, detail
                ));
            }
        }
    }
    let path = out_dir.join("Plan.md");
    write_bytes_atomic(&path, out.as_bytes()).map_err(|source| EmitError::Io {
        path: path.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;
    use planforge_canon::{HashCheck, check_artifact_hash};
    use planforge_model::{ArtifactMeta, FeatureEntry, SCHEMA_VERSION};

    fn sample_bundle() -> ArtifactBundle {
        let mut tasks = TasksFile::default();
        tasks.meta.version = SCHEMA_VERSION.to_string();
        tasks.meta.min_confidence = 0.7;
        let mut dag = DagFile::default();
        dag.meta.version = SCHEMA_VERSION.to_string();
        dag.analysis.ok = true;
        let mut waves = WavesArtifact::default();
        waves.meta.version = SCHEMA_VERSION.to_string();
        waves.waves = vec![vec!["T001".to_string()]];
        let features = FeaturesArtifact {
            meta: ArtifactMeta {
                version: SCHEMA_VERSION.to_string(),
                artifact_hash: String::new(),
            },
            features: vec![FeatureEntry {
                id: "F001".to_string(),
                title: "Core".to_string(),
            }],
        };
        let mut coordinator = Coordinator::default();
        coordinator.version = SCHEMA_VERSION.to_string();
        ArtifactBundle {
            tasks,
            dag,
            waves,
            features,
            coordinator,
        }
    }

    fn out_dir(dir: &tempfile::TempDir) -> Utf8PathBuf {
        Utf8PathBuf::from_path_buf(dir.path().join("out")).unwrap()
    }

    #[test]
    fn bundle_cross_references_line_up() {
        let dir = tempfile::tempdir().unwrap();
        let out = out_dir(&dir);
        let mut bundle = sample_bundle();
        let hashes = write_bundle(&out, &mut bundle).unwrap();

        assert_eq!(hashes.len(), 5);
        let tasks_hash = &hashes["tasks.json"];

        let dag_raw = std::fs::read(out.join("dag.json")).unwrap();
        let dag: serde_json::Value = serde_json::from_slice(&dag_raw).unwrap();
        assert_eq!(dag["meta"]["tasks_hash"], *tasks_hash);

        let waves_raw = std::fs::read(out.join("waves.json")).unwrap();
        let waves: serde_json::Value = serde_json::from_slice(&waves_raw).unwrap();
        assert_eq!(waves["meta"]["planId"], *tasks_hash);

        for name in ["tasks.json", "dag.json", "waves.json", "features.json"] {
            let raw = std::fs::read(out.join(name)).unwrap();
            let check = check_artifact_hash(&raw).unwrap();
            assert!(check.matches(), "{name} failed hash verification");
            match check {
                HashCheck::Checked { stored, .. } => assert_eq!(stored, hashes[name], "{name}"),
                HashCheck::NoMeta => panic!("{name} lost its meta"),
            }
        }

        // The coordinator has no meta.artifact_hash; its bytes are the preimage.
        let coord_raw = std::fs::read(out.join("coordinator.json")).unwrap();
        assert_eq!(
            planforge_canon::hash_canonical(&coord_raw),
            hashes["coordinator.json"]
        );
    }

    #[test]
    fn plan_summary_lists_hashes_and_validators() {
        let dir = tempfile::tempdir().unwrap();
        let out = out_dir(&dir);
        let mut bundle = sample_bundle();
        bundle.tasks.meta.validator_reports = vec![ValidatorReport {
            name: "acceptance".to_string(),
            status: "pass".to_string(),
            cached: true,
            detail: "ok".to_string(),
            ..ValidatorReport::default()
        }];
        let hashes = write_bundle(&out, &mut bundle).unwrap();

        let summary = std::fs::read_to_string(out.join("Plan.md")).unwrap();
        assert!(summary.starts_with("# Plan\n"));
        assert!(summary.contains(&format!("- tasks.json: {}", hashes["tasks.json"])));
        assert!(summary.contains("- acceptance: pass (cached) — ok"));
    }

    #[test]
    fn emission_is_deterministic() {
        let dir_a = tempfile::tempdir().unwrap();
        let dir_b = tempfile::tempdir().unwrap();
        let hashes_a = write_bundle(&out_dir(&dir_a), &mut sample_bundle()).unwrap();
        let hashes_b = write_bundle(&out_dir(&dir_b), &mut sample_bundle()).unwrap();
        assert_eq!(hashes_a, hashes_b);
    }

    #[test]
    fn write_failures_are_aggregated_not_short_circuited() {
        let dir = tempfile::tempdir().unwrap();
        // Make the output path a file so every artifact write fails.
        let blocked = dir.path().join("out");
        std::fs::write(&blocked, b"in the way").unwrap();
        let out = Utf8PathBuf::from_path_buf(blocked).unwrap();

        let err = write_bundle(&out, &mut sample_bundle()).unwrap_err();
        match err {
            EmitError::Aggregate(errors) => {
                // Five artifacts plus Plan.md all failed.
                assert_eq!(errors.len(), 6);
            }
            other => panic!("expected aggregate, got {other}"),
        }
    }
}
