//! Precedence edges between tasks.

use serde::{Deserialize, Serialize};

/// A directed dependency between two tasks.
///
/// `resource`-typed edges are planning annotations; the DAG builder filters
/// them out of the structural graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge {
    pub from: String,
    pub to: String,
    #[serde(rename = "type")]
    pub edge_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtype: Option<String>,
    #[serde(rename = "isHard")]
    pub is_hard: bool,
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub evidence: Vec<Evidence>,
}

impl Edge {
    /// A hard, fully-confident edge of the given type.
    #[must_use]
    pub fn hard(from: impl Into<String>, to: impl Into<String>, edge_type: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            edge_type: edge_type.into(),
            subtype: None,
            is_hard: true,
            confidence: 1.0,
            evidence: Vec::new(),
        }
    }

    /// A hard mutual-exclusion edge derived from a shared exclusive resource.
    #[must_use]
    pub fn mutual_exclusion(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            subtype: Some("mutual_exclusion".to_string()),
            ..Self::hard(from, to, "resource")
        }
    }
}

/// Supporting evidence attached to a task or dependency.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Evidence {
    #[serde(rename = "type")]
    pub kind: String,
    pub source: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub excerpt: String,
    pub confidence: f64,
    pub rationale: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mutual_exclusion_edges_are_hard_resource_edges() {
        let edge = Edge::mutual_exclusion("T001", "T002");
        assert_eq!(edge.edge_type, "resource");
        assert_eq!(edge.subtype.as_deref(), Some("mutual_exclusion"));
        assert!(edge.is_hard);
        assert_eq!(edge.confidence, 1.0);
    }

    #[test]
    fn serialized_field_names_match_contract() {
        let value = serde_json::to_value(Edge::hard("T001", "T002", "sequential")).unwrap();
        assert_eq!(value["isHard"], true);
        assert_eq!(value["type"], "sequential");
        assert!(value.get("subtype").is_none());
        assert!(value.get("evidence").is_none());
    }
}
