//! Regulation and version models matching the frontend Regulation interface.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::DetailedChange;

/// Display status of a regulation as a whole, toggled by a reviewer.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum RegulationStatus {
    #[default]
    Pending,
    Validated,
}

impl RegulationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RegulationStatus::Pending => "pending",
            RegulationStatus::Validated => "validated",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(RegulationStatus::Pending),
            "validated" => Some(RegulationStatus::Validated),
            _ => None,
        }
    }

    pub fn toggled(&self) -> Self {
        match self {
            RegulationStatus::Pending => RegulationStatus::Validated,
            RegulationStatus::Validated => RegulationStatus::Pending,
        }
    }
}

/// One uploaded revision of a regulation's source document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegulationVersion {
    pub id: String,
    /// Free-text version label, often but not always numeric ("2.0").
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub upload_date: DateTime<Utc>,
    pub file_name: String,
    /// Key of the stored upload, used to feed the analyzer. Not part of the
    /// wire contract.
    #[serde(skip)]
    pub object_key: String,
    #[serde(default)]
    pub detailed_changes: Vec<DetailedChange>,
}

/// A tracked regulatory document with a history of versions, newest first.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Regulation {
    pub id: String,
    pub title: String,
    pub status: RegulationStatus,
    pub last_updated: DateTime<Utc>,
    pub versions: Vec<RegulationVersion>,
}

impl Regulation {
    /// The latest version, i.e. the first element of the sorted list.
    pub fn latest_version(&self) -> Option<&RegulationVersion> {
        self.versions.first()
    }
}

/// Sort versions newest first: numeric label comparison when both labels
/// parse as numbers, upload date descending otherwise.
///
/// The sort is stable, so equal labels keep their relative order.
pub fn sort_versions(versions: &mut [RegulationVersion]) {
    versions.sort_by(|a, b| {
        match (
            a.version.trim().parse::<f64>(),
            b.version.trim().parse::<f64>(),
        ) {
            (Ok(va), Ok(vb)) => vb.partial_cmp(&va).unwrap_or(Ordering::Equal),
            _ => b.upload_date.cmp(&a.upload_date),
        }
    });
}
