//! Task records: the unit of work a plan schedules.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single, well-defined unit of work.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub feature_id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub category: String,
    pub duration: DurationPert,
    #[serde(rename = "durationUnits")]
    pub duration_unit: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub interfaces_produced: Vec<InterfaceProduced>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub interfaces_consumed: Vec<InterfaceConsumed>,
    #[serde(default)]
    pub acceptance_checks: Vec<AcceptanceCheck>,
    #[serde(rename = "source_evidence", default)]
    pub evidence: Vec<crate::edge::Evidence>,
    #[serde(default)]
    pub resources: TaskResources,
    #[serde(default)]
    pub execution_logging: ExecutionLogging,
    #[serde(default)]
    pub compensation: Compensation,
}

impl Task {
    /// Exclusive resource names, normalized: trimmed, empties dropped,
    /// deduplicated, sorted. Conflict detection and wave packing both key
    /// off this set.
    #[must_use]
    pub fn exclusive_resources(&self) -> BTreeSet<String> {
        self.resources
            .exclusive
            .iter()
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty())
            .collect()
    }
}

/// Three-point duration estimate. Invariant: optimistic ≤ mostLikely ≤ pessimistic.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DurationPert {
    pub optimistic: f64,
    #[serde(rename = "mostLikely")]
    pub most_likely: f64,
    pub pessimistic: f64,
}

impl DurationPert {
    #[must_use]
    pub const fn new(optimistic: f64, most_likely: f64, pessimistic: f64) -> Self {
        Self {
            optimistic,
            most_likely,
            pessimistic,
        }
    }
}

/// Machine-verifiable completion criterion, tagged by kind.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum AcceptanceCheck {
    Command {
        cmd: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        expect: Option<Value>,
        #[serde(
            rename = "timeoutSeconds",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        timeout_seconds: Option<u32>,
    },
    File {
        path: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        expect: Option<Value>,
    },
    Http {
        url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        expect: Option<Value>,
    },
}

// Hand-written so the tag dispatch never relies on serde's content
// buffering, which does not round-trip lexically-preserved numbers.
impl<'de> serde::Deserialize<'de> for AcceptanceCheck {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use serde::de::Error;

        let value = Value::deserialize(deserializer)?;
        let Some(object) = value.as_object() else {
            return Err(D::Error::custom("acceptance check must be an object"));
        };
        let kind = object
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| D::Error::missing_field("type"))?;
        let required = |field: &'static str| -> Result<String, D::Error> {
            object
                .get(field)
                .and_then(Value::as_str)
                .map(ToString::to_string)
                .ok_or_else(|| D::Error::missing_field(field))
        };
        let expect = object.get("expect").cloned();
        match kind {
            "command" => Ok(Self::Command {
                cmd: required("cmd")?,
                expect,
                timeout_seconds: object
                    .get("timeoutSeconds")
                    .and_then(Value::as_u64)
                    .map(|n| n as u32),
            }),
            "file" => Ok(Self::File {
                path: required("path")?,
                expect,
            }),
            "http" => Ok(Self::Http {
                url: required("url")?,
                expect,
            }),
            other => Err(D::Error::custom(format!(
                "unknown acceptance check type: {other}"
            ))),
        }
    }
}

impl AcceptanceCheck {
    /// The default check attached to stub-plan tasks.
    #[must_use]
    pub fn echo_ok() -> Self {
        Self::Command {
            cmd: "echo ok".to_string(),
            expect: None,
            timeout_seconds: Some(5),
        }
    }
}

/// Resource requirements: exclusive locks and limited-capacity needs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskResources {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclusive: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub limited: Vec<ResourceNeed>,
}

/// A requirement against a shared, limited resource.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceNeed {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub units: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access: Option<String>,
}

/// Structured-logging contract the executor must honor per task.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecutionLogging {
    pub format: String,
    pub required_fields: Vec<String>,
}

impl ExecutionLogging {
    /// JSONL logging with the standard field set.
    #[must_use]
    pub fn jsonl() -> Self {
        Self {
            format: "JSONL".to_string(),
            required_fields: ["timestamp", "task_id", "step", "status", "message"]
                .iter()
                .map(ToString::to_string)
                .collect(),
        }
    }
}

/// Rollback contract for a task.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Compensation {
    pub idempotent: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rollback_cmd: Option<String>,
}

/// An interface a task creates or modifies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterfaceProduced {
    pub name: String,
    pub version: String,
    #[serde(rename = "type")]
    pub kind: String,
}

/// An interface a task depends on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterfaceConsumed {
    pub name: String,
    pub version_requirement: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub required: bool,
}
