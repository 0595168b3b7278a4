//! Canonical byte emission and hashing.
//!
//! The canonical form is produced by parsing JSON with lexical number
//! preservation, normalizing every number to its minimal decimal rendering,
//! and re-emitting with sorted keys, two-space indentation and a trailing
//! newline. `serde_json`'s default map is ordered, so key sorting falls out
//! of the value representation; HTML escaping is never applied.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::{Number, Value};
use sha2::{Digest, Sha256};

use crate::error::CanonError;

static NUMBER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(-)?(\d+)(?:\.(\d+))?(?:[eE]([+-]?\d+))?$").expect("number regex"));

/// Produce the canonical byte form of raw JSON input.
///
/// The output is stable across runs and platforms: running `canonicalize` on
/// its own output returns the same bytes.
pub fn canonicalize(input: &[u8]) -> Result<Vec<u8>, CanonError> {
    let value: Value = serde_json::from_slice(input).map_err(CanonError::Parse)?;
    emit(&canonicalize_value(value))
}

/// Serialize any value and produce its canonical byte form.
pub fn canonical_bytes<T: Serialize>(value: &T) -> Result<Vec<u8>, CanonError> {
    let value = serde_json::to_value(value).map_err(CanonError::Serialize)?;
    emit(&canonicalize_value(value))
}

/// SHA-256 of canonical bytes, as 64 lowercase hex characters.
///
/// The input must already be canonical; no newline is appended here.
#[must_use]
pub fn hash_canonical(input: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input);
    hex::encode(hasher.finalize())
}

/// Normalize every number in the tree to its minimal decimal rendering.
///
/// Key ordering needs no work: `serde_json`'s object map is ordered.
#[must_use]
pub fn canonicalize_value(value: Value) -> Value {
    match value {
        Value::Number(num) => {
            let normalized = canonicalize_number(&num.to_string());
            match serde_json::from_str::<Number>(&normalized) {
                Ok(n) => Value::Number(n),
                Err(_) => Value::Number(num),
            }
        }
        Value::Array(items) => Value::Array(items.into_iter().map(canonicalize_value).collect()),
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(k, v)| (k, canonicalize_value(v)))
                .collect(),
        ),
        other => other,
    }
}

fn emit(value: &Value) -> Result<Vec<u8>, CanonError> {
    let mut buf = Vec::with_capacity(256);
    let formatter = PrettyFormatter::with_indent(b"  ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut ser).map_err(CanonError::Serialize)?;
    buf.push(b'\n');
    Ok(buf)
}

/// Render a JSON number string in minimal decimal form:
/// - lowercase exponent marker
/// - leading zeros trimmed from the integer part and exponent
/// - trailing zeros trimmed from the fraction; dot dropped when it empties
/// - `+` dropped from the exponent; zero exponents dropped entirely
/// - `-0` and `-0.0` normalized to `0`
fn canonicalize_number(input: &str) -> String {
    let Some(caps) = NUMBER_RE.captures(input) else {
        // Not a plain decimal literal; leave untouched.
        return input.to_string();
    };
    let mut sign = caps.get(1).map_or("", |m| m.as_str());
    let mut int_part = caps.get(2).map_or("0", |m| m.as_str()).trim_start_matches('0');
    if int_part.is_empty() {
        int_part = "0";
    }
    let frac = caps
        .get(3)
        .map_or("", |m| m.as_str())
        .trim_end_matches('0');

    let mut exp = String::new();
    if let Some(raw_exp) = caps.get(4) {
        let raw = raw_exp.as_str().trim_start_matches('+');
        let negative = raw.starts_with('-');
        let digits = raw.trim_start_matches('-').trim_start_matches('0');
        if !digits.is_empty() {
            if negative {
                exp.push('-');
            }
            exp.push_str(digits);
        }
    }

    if int_part == "0" && frac.is_empty() {
        sign = "";
        exp.clear();
    }

    let mut out = String::with_capacity(input.len());
    out.push_str(sign);
    out.push_str(int_part);
    if !frac.is_empty() {
        out.push('.');
        out.push_str(frac);
    }
    if !exp.is_empty() {
        out.push('e');
        out.push_str(&exp);
    }
    out
}
