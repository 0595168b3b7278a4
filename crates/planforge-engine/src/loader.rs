//! Plan-document loading with the deterministic stub fallback.

use camino::Utf8Path;
use tracing::debug;

use planforge_docparse::{ParsedTask, format_id, parse_document};
use planforge_model::{
    AcceptanceCheck, Compensation, DurationPert, Edge, ExecutionLogging, FeatureEntry, Task,
};

use crate::error::PlanError;

/// Result of loading a specification document.
#[derive(Debug, Clone)]
pub struct LoadedPlan {
    pub tasks: Vec<Task>,
    pub features: Vec<FeatureEntry>,
    pub dependencies: Vec<Edge>,
    /// False when the stub plan was substituted for a missing/empty document.
    pub doc_provided: bool,
}

/// Seam for loading plans; the default reads markdown-like documents from
/// the filesystem.
pub trait DocLoader: Send + Sync {
    fn load(&self, doc_path: Option<&Utf8Path>) -> Result<LoadedPlan, PlanError>;
}

/// Loads plan documents via [`planforge_docparse`].
#[derive(Debug, Default)]
pub struct MarkdownDocLoader;

impl DocLoader for MarkdownDocLoader {
    fn load(&self, doc_path: Option<&Utf8Path>) -> Result<LoadedPlan, PlanError> {
        let Some(path) = doc_path else {
            return Ok(stub_plan());
        };
        if !path.exists() {
            debug!(%path, "plan document missing; using stub plan");
            return Ok(stub_plan());
        }
        if path.is_dir() {
            return Err(PlanError::Config(format!(
                "plan document {path} is a directory"
            )));
        }
        let raw = std::fs::read_to_string(path).map_err(|source| PlanError::Io {
            path: path.to_string(),
            source,
        })?;
        let doc = parse_document(&raw);
        if doc.is_empty() {
            debug!(%path, "plan document yielded nothing; using stub plan");
            return Ok(stub_plan());
        }
        plan_from_document(doc)
    }
}

fn plan_from_document(doc: planforge_docparse::ParsedDocument) -> Result<LoadedPlan, PlanError> {
    let features: Vec<FeatureEntry> = doc
        .features
        .iter()
        .map(|f| FeatureEntry {
            id: f.id.clone(),
            title: f.title.clone(),
        })
        .collect();

    let mut tasks = Vec::with_capacity(doc.tasks.len());
    let mut parse_errors = Vec::new();
    for (i, spec) in doc.tasks.iter().enumerate() {
        for err in &spec.errors {
            parse_errors.push(format!("{}: {err}", spec.title));
        }
        tasks.push(task_from_spec(format_id('T', i + 1), spec));
    }
    if !parse_errors.is_empty() {
        return Err(PlanError::Spec(parse_errors.join("; ")));
    }

    let title_to_id: std::collections::HashMap<String, String> = doc
        .tasks
        .iter()
        .zip(&tasks)
        .map(|(spec, task)| (normalize_key(&spec.title), task.id.clone()))
        .collect();

    let mut dependencies = Vec::new();
    for (spec, task) in doc.tasks.iter().zip(&tasks) {
        for token in &spec.after {
            let Some(from) = resolve_task_id(token, &title_to_id) else {
                continue;
            };
            dependencies.push(Edge::hard(from, task.id.clone(), "sequential"));
        }
    }

    Ok(LoadedPlan {
        tasks,
        features,
        dependencies,
        doc_provided: true,
    })
}

fn task_from_spec(id: String, spec: &ParsedTask) -> Task {
    let duration = if spec.hours > 0.0 {
        DurationPert::new(spec.hours * 0.5, spec.hours, spec.hours * 2.0)
    } else {
        DurationPert::new(1.0, 2.0, 3.0)
    };
    Task {
        id,
        feature_id: spec.feature_id.clone(),
        title: spec.title.clone(),
        duration,
        duration_unit: "hours".to_string(),
        acceptance_checks: spec.accept.clone(),
        execution_logging: ExecutionLogging::jsonl(),
        compensation: Compensation {
            idempotent: true,
            rollback_cmd: None,
        },
        ..Task::default()
    }
}

/// The deterministic three-task fallback plan.
fn stub_plan() -> LoadedPlan {
    let specs = [
        ("T001", "Setup DB"),
        ("T002", "Migrate Schema"),
        ("T003", "API Handlers"),
    ];
    let tasks = specs
        .iter()
        .map(|(id, title)| Task {
            id: (*id).to_string(),
            feature_id: "F001".to_string(),
            title: (*title).to_string(),
            duration: DurationPert::new(1.0, 2.0, 3.0),
            duration_unit: "hours".to_string(),
            acceptance_checks: vec![AcceptanceCheck::echo_ok()],
            execution_logging: ExecutionLogging::jsonl(),
            compensation: Compensation {
                idempotent: true,
                rollback_cmd: None,
            },
            ..Task::default()
        })
        .collect();
    LoadedPlan {
        tasks,
        features: vec![FeatureEntry {
            id: "F001".to_string(),
            title: "Core DB + API".to_string(),
        }],
        dependencies: Vec::new(),
        doc_provided: false,
    }
}

/// Resolve an `after:` token: a case-insensitive task ID like `T003`, or a
/// normalized task title.
fn resolve_task_id(
    token: &str,
    title_to_id: &std::collections::HashMap<String, String>,
) -> Option<String> {
    let trimmed = token.trim();
    if trimmed.is_empty() {
        return None;
    }
    let mut chars = trimmed.chars();
    if let Some(first) = chars.next() {
        if (first == 'T' || first == 't')
            && trimmed.len() > 1
            && chars.all(|c| c.is_ascii_digit())
        {
            return Some(trimmed.to_uppercase());
        }
    }
    title_to_id.get(&normalize_key(trimmed)).cloned()
}

fn normalize_key(v: &str) -> String {
    v.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;
    use std::io::Write;

    fn write_doc(dir: &tempfile::TempDir, content: &str) -> Utf8PathBuf {
        let path = dir.path().join("plan.md");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        Utf8PathBuf::from_path_buf(path).unwrap()
    }

    #[test]
    fn missing_document_yields_stub_plan() {
        let loaded = MarkdownDocLoader.load(None).unwrap();
        assert!(!loaded.doc_provided);
        assert_eq!(loaded.tasks.len(), 3);
        assert_eq!(loaded.tasks[0].id, "T001");
        assert!(!loaded.tasks[0].acceptance_checks.is_empty());
        assert_eq!(loaded.features[0].id, "F001");
    }

    #[test]
    fn nonexistent_path_yields_stub_plan() {
        let loaded = MarkdownDocLoader
            .load(Some(Utf8Path::new("/definitely/not/here.md")))
            .unwrap();
        assert!(!loaded.doc_provided);
    }

    #[test]
    fn directory_path_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        let err = MarkdownDocLoader.load(Some(&path)).unwrap_err();
        assert!(matches!(err, PlanError::Config(_)));
    }

    #[test]
    fn document_tasks_get_sequential_ids_and_durations() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_doc(
            &dir,
            "## Build\n- Compile (2h)\n```accept\n{\"type\":\"command\",\"cmd\":\"make\"}\n```\n- Link after: Compile\n```accept\n{\"type\":\"command\",\"cmd\":\"make link\"}\n```\n",
        );
        let loaded = MarkdownDocLoader.load(Some(&path)).unwrap();
        assert!(loaded.doc_provided);
        assert_eq!(loaded.tasks[0].id, "T001");
        assert_eq!(loaded.tasks[0].duration, DurationPert::new(1.0, 2.0, 4.0));
        assert_eq!(loaded.tasks[1].id, "T002");
        // Unhinted durations fall back to the default three-point estimate.
        assert_eq!(loaded.tasks[1].duration, DurationPert::new(1.0, 2.0, 3.0));
        assert_eq!(loaded.dependencies.len(), 1);
        assert_eq!(loaded.dependencies[0].from, "T001");
        assert_eq!(loaded.dependencies[0].to, "T002");
        assert_eq!(loaded.dependencies[0].edge_type, "sequential");
    }

    #[test]
    fn after_tokens_resolve_ids_and_titles() {
        let map: std::collections::HashMap<String, String> =
            [("compile".to_string(), "T001".to_string())].into();
        assert_eq!(resolve_task_id("t002", &map), Some("T002".to_string()));
        assert_eq!(resolve_task_id("T010", &map), Some("T010".to_string()));
        assert_eq!(resolve_task_id(" Compile ", &map), Some("T001".to_string()));
        assert_eq!(resolve_task_id("Unknown", &map), None);
        assert_eq!(resolve_task_id("Txy", &map), None);
        assert_eq!(resolve_task_id("", &map), None);
    }

    #[test]
    fn acceptance_parse_errors_are_fatal_and_listed() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_doc(
            &dir,
            "## F\n- Good\n```accept\n{\"type\":\"command\",\"cmd\":\"x\"}\n```\n- Bad\n```accept\n{oops\n```\n",
        );
        let err = MarkdownDocLoader.load(Some(&path)).unwrap_err();
        match err {
            PlanError::Spec(message) => {
                assert!(message.contains("Bad:"));
                assert!(message.contains("invalid acceptance JSON"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn unstructured_document_yields_stub_plan() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_doc(&dir, "just prose, no features or bullets\n");
        let loaded = MarkdownDocLoader.load(Some(&path)).unwrap();
        assert!(!loaded.doc_provided);
    }
}
