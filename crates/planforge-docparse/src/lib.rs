//! Parser for the markdown-like plan document.
//!
//! The grammar is line-oriented with no nesting beyond code fences:
//!
//! - `## <title>` begins a feature; features are auto-numbered `F001`, `F002`, …
//! - `- <title>` or `* <title>` (optionally `[ ]`/`[x]`-checkboxed) introduces
//!   a task under the most recent feature. A `(Nh)`/`(Nm)` token sets a
//!   duration hint in hours; a trailing `after: …` clause names predecessors
//!   by task ID or title.
//! - A fenced block with language `accept`, `acceptance` or `checks` holds
//!   acceptance-check JSON for the last task seen. Fences are recognized
//!   strictly at column zero.
//!
//! Acceptance JSON that fails to parse is collected as a per-task error
//! string; the caller decides whether errors are fatal.

use once_cell::sync::Lazy;
use regex::Regex;

use planforge_model::AcceptanceCheck;

static FEATURE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s{0,3}#{2}\s+(.+?)\s*$").expect("feature regex"));
static TASK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*[-*]\s+(?:\[.?\]\s*)?(.+?)\s*$").expect("task regex"));
static AFTER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bafter\s*:\s*([^;]+)$").expect("after regex"));
static DURATION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\((\d+(?:\.\d+)?)(h|m)\)").expect("duration regex"));

/// A feature heading parsed from the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedFeature {
    pub id: String,
    pub title: String,
}

/// A task bullet parsed from the document. IDs are assigned later, in
/// document order.
#[derive(Debug, Clone, Default)]
pub struct ParsedTask {
    pub feature_id: String,
    pub title: String,
    /// Predecessors by task ID or normalized title.
    pub after: Vec<String>,
    /// Duration hint in hours; 0 when unset.
    pub hours: f64,
    pub accept: Vec<AcceptanceCheck>,
    /// Acceptance-JSON parse failures, one message per bad fence.
    pub errors: Vec<String>,
}

/// Parse result: features and tasks in document order.
#[derive(Debug, Default)]
pub struct ParsedDocument {
    pub features: Vec<ParsedFeature>,
    pub tasks: Vec<ParsedTask>,
}

impl ParsedDocument {
    /// True when the document yielded neither features nor tasks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.features.is_empty() && self.tasks.is_empty()
    }
}

/// Extract features (`##` headings) and tasks (bullets under the most recent
/// feature). Intentionally simple: one level of features, tasks inherit the
/// feature above them.
#[must_use]
pub fn parse_document(input: &str) -> ParsedDocument {
    let mut doc = ParsedDocument::default();
    let mut current_feature: Option<String> = None;
    let mut feature_count = 0usize;
    let mut in_fence = false;
    let mut fence_lang = String::new();
    let mut fence_buf: Vec<&str> = Vec::new();

    for line in input.lines() {
        // Code-fence toggling is strictly column-zero.
        if line.starts_with("```") {
            if in_fence {
                if is_acceptance_lang(&fence_lang) {
                    if let Some(task) = doc.tasks.last_mut() {
                        attach_acceptance(task, &fence_buf.join("\n"));
                    }
                }
                in_fence = false;
                fence_lang.clear();
                fence_buf.clear();
            } else {
                in_fence = true;
                fence_lang = line.trim_start_matches('`').trim().to_lowercase();
                fence_buf.clear();
            }
            continue;
        }
        if in_fence {
            fence_buf.push(line);
            continue;
        }

        if let Some(caps) = FEATURE_RE.captures(line) {
            feature_count += 1;
            let id = format_id('F', feature_count);
            doc.features.push(ParsedFeature {
                id: id.clone(),
                title: caps[1].trim().to_string(),
            });
            current_feature = Some(id);
            continue;
        }

        if let Some(caps) = TASK_RE.captures(line) {
            let raw = caps[1].trim().to_string();
            let (title, hours) = strip_duration(&raw);
            let (title, after) = strip_after(&title);
            if title.is_empty() {
                continue;
            }
            let feature_id = match &current_feature {
                Some(id) => id.clone(),
                None => {
                    feature_count += 1;
                    let id = format_id('F', feature_count);
                    doc.features.push(ParsedFeature {
                        id: id.clone(),
                        title: "General".to_string(),
                    });
                    current_feature = Some(id.clone());
                    id
                }
            };
            doc.tasks.push(ParsedTask {
                feature_id,
                title,
                after,
                hours,
                accept: Vec::new(),
                errors: Vec::new(),
            });
        }
    }
    doc
}

/// Format an auto-assigned identifier such as `F001` or `T042`.
#[must_use]
pub fn format_id(prefix: char, n: usize) -> String {
    format!("{prefix}{n:03}")
}

fn is_acceptance_lang(lang: &str) -> bool {
    matches!(lang, "accept" | "acceptance" | "checks")
}

fn attach_acceptance(task: &mut ParsedTask, payload: &str) {
    let trimmed = payload.trim();
    if trimmed.starts_with('[') {
        match serde_json::from_str::<Vec<AcceptanceCheck>>(trimmed) {
            Ok(checks) => task.accept.extend(checks),
            Err(err) => task.errors.push(format!("invalid acceptance JSON: {err}")),
        }
    } else {
        match serde_json::from_str::<AcceptanceCheck>(trimmed) {
            Ok(check) => task.accept.push(check),
            Err(err) => task.errors.push(format!("invalid acceptance JSON: {err}")),
        }
    }
}

fn strip_duration(raw: &str) -> (String, f64) {
    let Some(caps) = DURATION_RE.captures(raw) else {
        return (raw.to_string(), 0.0);
    };
    let value: f64 = caps[1].parse().unwrap_or(0.0);
    let hours = if &caps[2] == "h" { value } else { value / 60.0 };
    let full = caps.get(0).expect("full match").range();
    let mut title = String::with_capacity(raw.len());
    title.push_str(&raw[..full.start]);
    title.push_str(&raw[full.end..]);
    (title.trim().to_string(), hours)
}

fn strip_after(title: &str) -> (String, Vec<String>) {
    let Some(caps) = AFTER_RE.captures(title) else {
        return (title.to_string(), Vec::new());
    };
    let after = caps[1]
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
        .collect();
    let full = caps.get(0).expect("full match").range();
    let mut rest = String::with_capacity(title.len());
    rest.push_str(&title[..full.start]);
    rest.push_str(&title[full.end..]);
    (rest.trim().to_string(), after)
}
