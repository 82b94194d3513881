//! Detected change and comment models matching the frontend DetailedChange interface.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Reviewer disposition on a detected change.
///
/// A change with no recorded status is collapsed into `Pending` at load time,
/// so downstream code never has to special-case a missing status.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ChangeStatus {
    #[default]
    Pending,
    Relevant,
    NotRelevant,
}

impl ChangeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeStatus::Pending => "pending",
            ChangeStatus::Relevant => "relevant",
            ChangeStatus::NotRelevant => "not-relevant",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(ChangeStatus::Pending),
            "relevant" => Some(ChangeStatus::Relevant),
            "not-relevant" => Some(ChangeStatus::NotRelevant),
            _ => None,
        }
    }
}

/// Coarse classification tag assigned by the upstream analysis.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Classification {
    Compliance,
    Procedural,
    Penalty,
    Reporting,
    Other,
}

impl Classification {
    pub fn as_str(&self) -> &'static str {
        match self {
            Classification::Compliance => "compliance",
            Classification::Procedural => "procedural",
            Classification::Penalty => "penalty",
            Classification::Reporting => "reporting",
            Classification::Other => "other",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "compliance" => Some(Classification::Compliance),
            "procedural" => Some(Classification::Procedural),
            "penalty" => Some(Classification::Penalty),
            "reporting" => Some(Classification::Reporting),
            "other" => Some(Classification::Other),
            _ => None,
        }
    }
}

/// A reviewer comment on a detected change. Append-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    pub author: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

/// One detected textual difference between a version and its predecessor.
///
/// The five text fields plus `confidence` come from the upstream analysis and
/// are mutable only through an explicit edit, which forces `status` back to
/// `Pending` (edits invalidate prior review).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetailedChange {
    pub id: String,
    pub summary: String,
    pub analysis: String,
    pub change: String,
    pub before_quote: String,
    pub after_quote: String,
    #[serde(rename = "type")]
    pub change_type: String,
    pub confidence: f64,
    #[serde(default)]
    pub status: ChangeStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classification: Option<Classification>,
    #[serde(default)]
    pub comments: Vec<Comment>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip() {
        for status in [
            ChangeStatus::Pending,
            ChangeStatus::Relevant,
            ChangeStatus::NotRelevant,
        ] {
            assert_eq!(ChangeStatus::from_str(status.as_str()), Some(status));
        }
        assert_eq!(ChangeStatus::from_str("unknown"), None);
    }

    #[test]
    fn test_status_wire_format() {
        let json = serde_json::to_string(&ChangeStatus::NotRelevant).unwrap();
        assert_eq!(json, "\"not-relevant\"");
    }

    #[test]
    fn test_missing_status_collapses_to_pending() {
        let json = r#"{
            "id": "c1",
            "summary": "s",
            "analysis": "a",
            "change": "c",
            "before_quote": "b",
            "after_quote": "a",
            "type": "modification",
            "confidence": 0.9
        }"#;
        let change: DetailedChange = serde_json::from_str(json).unwrap();
        assert_eq!(change.status, ChangeStatus::Pending);
        assert!(change.comments.is_empty());
    }
}
