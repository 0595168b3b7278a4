//! Validator reports as embedded in `tasks.meta.validator_reports`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Maximum rune count for an embedded validator detail string.
pub const VALIDATOR_DETAIL_LIMIT: usize = 2048;

/// Summary of one validator run.
///
/// `status` is one of `pass`, `fail`, `error`, `skip`, or the legacy `ok`;
/// empty means the validator produced output without a recognizable status.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidatorReport {
    pub name: String,
    pub status: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub command: String,
    /// SHA-256 hex of the canonical payload fed to the validator.
    pub input_hash: String,
    pub cached: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub detail: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_output: Option<Value>,
}

impl ValidatorReport {
    /// True when strict gating must treat this report as a failure.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        matches!(self.status.as_str(), "fail" | "error")
    }
}

/// Truncate to `limit` Unicode scalar values, appending an explicit marker
/// when anything was cut. Counting is by runes, not bytes.
#[must_use]
pub fn truncate_detail(detail: &str, limit: usize) -> String {
    if limit == 0 {
        return detail.to_string();
    }
    let mut runes = detail.char_indices();
    match runes.nth(limit) {
        None => detail.to_string(),
        Some((byte_idx, _)) => format!("{} … (truncated)", &detail[..byte_idx]),
    }
}
