//! Sequential validator execution with deadlines and report caching.

use std::process::Stdio;
use std::sync::Mutex;

use serde_json::Value;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

use planforge_model::ValidatorReport;

use crate::cache::CacheStore;
use crate::config::ValidatorConfig;
use crate::error::ValidatorError;
use crate::payload::Payload;

/// All reports from one orchestration pass, plus the composite execution
/// error when any validator failed to run cleanly.
#[derive(Debug)]
pub struct RunOutcome {
    pub reports: Vec<ValidatorReport>,
    pub error: Option<ValidatorError>,
}

/// Runs configured validators against one payload.
#[derive(Debug)]
pub struct ValidatorRunner {
    config: ValidatorConfig,
    cache: Mutex<CacheStore>,
}

impl ValidatorRunner {
    /// Open (creating if needed) the cache directory and build a runner.
    pub fn new(config: ValidatorConfig) -> Result<Self, ValidatorError> {
        let cache = CacheStore::open(&config.cache_dir)?;
        Ok(Self {
            config,
            cache: Mutex::new(cache),
        })
    }

    /// Execute every configured validator in order against `payload`.
    ///
    /// The payload is canonicalized and hashed once; each validator first
    /// consults the cache under `(name, hash)`. Cache hits are returned with
    /// `cached = true` and no subprocess is spawned. Only clean runs (spawned,
    /// exited zero, no deadline) are cached.
    pub async fn run(&self, payload: &Payload<'_>) -> Result<RunOutcome, ValidatorError> {
        let (payload_bytes, input_hash) = payload.canonical()?;
        let mut reports = Vec::new();
        let mut failures = Vec::new();

        for (name, cmd) in self.config.entries() {
            let cached = self
                .cache
                .lock()
                .expect("validator cache lock")
                .load(name, &input_hash);
            if let Some(mut report) = cached {
                report.cached = true;
                reports.push(report);
                continue;
            }

            let (report, failure) = self.execute(name, cmd, &payload_bytes, &input_hash).await;
            if failure.is_none() {
                let store = self.cache.lock().expect("validator cache lock");
                if let Err(err) = store.store(name, &input_hash, &report) {
                    warn!(name, %err, "failed to persist validator cache entry");
                }
            }
            reports.push(report);
            if let Some(failure) = failure {
                failures.push(failure);
            }
        }

        let error = if failures.is_empty() {
            None
        } else {
            Some(ValidatorError::Aggregate(failures))
        };
        Ok(RunOutcome { reports, error })
    }

    async fn execute(
        &self,
        name: &str,
        cmd: &str,
        stdin_bytes: &[u8],
        input_hash: &str,
    ) -> (ValidatorReport, Option<ValidatorError>) {
        let mut report = ValidatorReport {
            name: name.to_string(),
            command: cmd.to_string(),
            input_hash: input_hash.to_string(),
            ..ValidatorReport::default()
        };

        let mut command = shell_command(cmd);
        command
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(err) => {
                report.status = "error".to_string();
                report.detail = err.to_string();
                return (
                    report,
                    Some(ValidatorError::Spawn {
                        name: name.to_string(),
                        reason: err.to_string(),
                    }),
                );
            }
        };

        if let Some(mut stdin) = child.stdin.take() {
            // Pump stdin from a separate task so a validator that floods
            // stdout before draining stdin cannot deadlock the runner. A
            // broken pipe is not a verdict; the exit status is.
            let bytes = stdin_bytes.to_vec();
            tokio::spawn(async move {
                let _ = stdin.write_all(&bytes).await;
            });
        }

        let output = match tokio::time::timeout(self.config.timeout, child.wait_with_output()).await
        {
            Err(_) => {
                // Deadline fired; dropping the wait future reaps the child
                // via kill_on_drop before the report is finalized.
                let seconds = self.config.timeout.as_secs();
                report.status = "error".to_string();
                report.detail = format!("timed out after {seconds}s");
                return (
                    report,
                    Some(ValidatorError::Timeout {
                        name: name.to_string(),
                        seconds,
                    }),
                );
            }
            Ok(Err(err)) => {
                report.status = "error".to_string();
                report.detail = err.to_string();
                return (
                    report,
                    Some(ValidatorError::Spawn {
                        name: name.to_string(),
                        reason: err.to_string(),
                    }),
                );
            }
            Ok(Ok(output)) => output,
        };

        report.raw_output = normalize_stdout(&output.stdout);
        let (status, detail) = interpret(report.raw_output.as_ref());
        report.status = status;
        report.detail = detail;
        debug!(name, status = %report.status, "validator finished");

        if !output.status.success() {
            let code = output.status.code().unwrap_or(-1);
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let detail = if !report.detail.is_empty() {
                report.detail.clone()
            } else if !stderr.is_empty() {
                stderr
            } else {
                format!("exit code {code}")
            };
            report.status = "error".to_string();
            report.detail = detail.clone();
            return (
                report,
                Some(ValidatorError::Failed {
                    name: name.to_string(),
                    code,
                    detail,
                }),
            );
        }

        (report, None)
    }
}

#[cfg(unix)]
fn shell_command(cmd: &str) -> Command {
    let mut command = Command::new("sh");
    command.arg("-c").arg(cmd);
    command
}

#[cfg(windows)]
fn shell_command(cmd: &str) -> Command {
    let mut command = Command::new("cmd");
    command.arg("/c").arg(cmd);
    command
}

/// Normalize stdout: JSON content (leading `{` or `[`) is kept as parsed
/// JSON; anything else is quoted as a JSON string. Empty output is absent.
fn normalize_stdout(stdout: &[u8]) -> Option<Value> {
    let text = String::from_utf8_lossy(stdout);
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
            return Some(value);
        }
    }
    Some(Value::String(trimmed.to_string()))
}

/// Extract `(status, detail)` from normalized output. Status values are
/// trimmed and lowercased; anything outside the recognized set is unset.
fn interpret(raw: Option<&Value>) -> (String, String) {
    let Some(Value::Object(map)) = raw else {
        return (String::new(), String::new());
    };
    let status = map
        .get("status")
        .and_then(Value::as_str)
        .map(normalize_status)
        .unwrap_or_default();
    let detail = map
        .get("detail")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    (status, detail)
}

fn normalize_status(raw: &str) -> String {
    let lowered = raw.trim().to_lowercase();
    match lowered.as_str() {
        "pass" | "fail" | "error" | "skip" | "ok" => lowered,
        _ => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stdout_normalization() {
        assert_eq!(normalize_stdout(b""), None);
        assert_eq!(normalize_stdout(b"  \n"), None);
        assert_eq!(
            normalize_stdout(b"plain words"),
            Some(Value::String("plain words".to_string()))
        );
        let json = normalize_stdout(br#"{"status":"pass"}"#).unwrap();
        assert_eq!(json["status"], "pass");
        let arr = normalize_stdout(b"[1,2]").unwrap();
        assert!(arr.is_array());
        // Looks like JSON but is not: quoted as a string.
        assert_eq!(
            normalize_stdout(b"{broken"),
            Some(Value::String("{broken".to_string()))
        );
    }

    #[test]
    fn status_interpretation() {
        let raw = serde_json::json!({"status": " PASS ", "detail": "all good"});
        let (status, detail) = interpret(Some(&raw));
        assert_eq!(status, "pass");
        assert_eq!(detail, "all good");

        let odd = serde_json::json!({"status": "excellent"});
        assert_eq!(interpret(Some(&odd)).0, "");

        assert_eq!(interpret(Some(&Value::String("words".into()))).0, "");
        assert_eq!(interpret(None).0, "");
    }

    #[cfg(unix)]
    mod exec {
        use super::*;
        use camino::Utf8PathBuf;
        use std::time::Duration;

        fn runner_with(dir: &tempfile::TempDir, acceptance: &str) -> ValidatorRunner {
            let mut config = ValidatorConfig::new(
                Utf8PathBuf::from_path_buf(dir.path().join("cache")).unwrap(),
            );
            config.acceptance_cmd = Some(acceptance.to_string());
            ValidatorRunner::new(config).unwrap()
        }

        fn empty_payload() -> Payload<'static> {
            Payload {
                tasks: None,
                dag: None,
                coordinator: None,
            }
        }

        #[tokio::test]
        async fn passing_validator_is_cached_on_second_run() {
            let dir = tempfile::tempdir().unwrap();
            let runner = runner_with(&dir, r#"printf '{"status":"pass","detail":"ok"}'"#);
            let payload = empty_payload();

            let first = runner.run(&payload).await.unwrap();
            assert!(first.error.is_none());
            assert_eq!(first.reports.len(), 1);
            assert_eq!(first.reports[0].status, "pass");
            assert_eq!(first.reports[0].detail, "ok");
            assert!(!first.reports[0].cached);

            let second = runner.run(&payload).await.unwrap();
            assert!(second.reports[0].cached);
            assert_eq!(second.reports[0].input_hash, first.reports[0].input_hash);
            assert_eq!(second.reports[0].status, "pass");
        }

        #[tokio::test]
        async fn failing_exit_code_is_an_error_and_not_cached() {
            let dir = tempfile::tempdir().unwrap();
            let runner = runner_with(&dir, "echo nope >&2; exit 3");
            let payload = empty_payload();

            let outcome = runner.run(&payload).await.unwrap();
            assert_eq!(outcome.reports[0].status, "error");
            assert_eq!(outcome.reports[0].detail, "nope");
            match outcome.error {
                Some(ValidatorError::Aggregate(ref failures)) => {
                    assert!(matches!(
                        failures[0],
                        ValidatorError::Failed { code: 3, .. }
                    ));
                }
                ref other => panic!("expected aggregate, got {other:?}"),
            }

            // Errors are never cached; the rerun executes again.
            let again = runner.run(&payload).await.unwrap();
            assert!(!again.reports[0].cached);
            assert!(again.error.is_some());
        }

        #[tokio::test]
        async fn fail_status_with_zero_exit_is_a_report_not_an_error() {
            let dir = tempfile::tempdir().unwrap();
            let runner = runner_with(&dir, r#"printf '{"status":"FAIL","detail":"bad plan"}'"#);
            let outcome = runner.run(&empty_payload()).await.unwrap();
            assert!(outcome.error.is_none());
            assert_eq!(outcome.reports[0].status, "fail");
            assert_eq!(outcome.reports[0].detail, "bad plan");
        }

        #[tokio::test]
        async fn plain_text_output_has_no_status() {
            let dir = tempfile::tempdir().unwrap();
            let runner = runner_with(&dir, "echo all quiet");
            let outcome = runner.run(&empty_payload()).await.unwrap();
            assert!(outcome.error.is_none());
            assert_eq!(outcome.reports[0].status, "");
            assert_eq!(
                outcome.reports[0].raw_output,
                Some(Value::String("all quiet".to_string()))
            );
        }

        #[tokio::test]
        async fn deadline_produces_a_cancellation_error() {
            let dir = tempfile::tempdir().unwrap();
            let mut config = ValidatorConfig::new(
                Utf8PathBuf::from_path_buf(dir.path().join("cache")).unwrap(),
            );
            config.acceptance_cmd = Some("sleep 10".to_string());
            config.timeout = Duration::from_millis(100);
            let runner = ValidatorRunner::new(config).unwrap();

            let outcome = runner.run(&empty_payload()).await.unwrap();
            assert_eq!(outcome.reports[0].status, "error");
            assert!(outcome.reports[0].detail.contains("timed out"));
            let error = outcome.error.unwrap();
            assert!(error.is_cancellation());
        }

        #[tokio::test]
        async fn validators_run_in_fixed_order() {
            let dir = tempfile::tempdir().unwrap();
            let mut config = ValidatorConfig::new(
                Utf8PathBuf::from_path_buf(dir.path().join("cache")).unwrap(),
            );
            config.evidence_cmd = Some(r#"printf '{"status":"skip"}'"#.to_string());
            config.acceptance_cmd = Some(r#"printf '{"status":"pass"}'"#.to_string());
            let runner = ValidatorRunner::new(config).unwrap();

            let outcome = runner.run(&empty_payload()).await.unwrap();
            let names: Vec<&str> = outcome.reports.iter().map(|r| r.name.as_str()).collect();
            assert_eq!(names, vec!["acceptance", "evidence"]);
            assert_eq!(outcome.reports[1].status, "skip");
        }

        #[tokio::test]
        async fn payload_reaches_validator_stdin() {
            let dir = tempfile::tempdir().unwrap();
            // The validator echoes stdin back; the raw output must round-trip
            // the canonical payload.
            let runner = runner_with(&dir, "cat");
            let tasks = planforge_model::TasksFile::default();
            let payload = Payload {
                tasks: Some(&tasks),
                dag: None,
                coordinator: None,
            };
            let outcome = runner.run(&payload).await.unwrap();
            let raw = outcome.reports[0].raw_output.as_ref().unwrap();
            assert!(raw.get("tasks").is_some());
        }
    }
}
