//! Aggregation and filtering over detected changes.
//!
//! Produces the cross-regulation overview feed: every change of every version
//! flattened into one list of [`AggregatedChange`] projections, filtered by a
//! conjunction of independent clauses and sorted on a single key. Also
//! resolves the current/previous version pair for the per-regulation detail
//! view, and renders the CSV export.

mod csv;

pub use csv::{export_file_name, to_csv};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::{ChangeStatus, DetailedChange, Regulation, RegulationVersion};

/// A detected change annotated with its parent version and regulation
/// context. Read-only projection; never persisted.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregatedChange {
    #[serde(flatten)]
    pub change: DetailedChange,
    pub regulation_id: String,
    pub regulation_title: String,
    pub version_id: String,
    pub version_number: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version_title: Option<String>,
    pub upload_date: DateTime<Utc>,
}

/// Status clause of the overview filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    #[default]
    All,
    Only(ChangeStatus),
}

impl StatusFilter {
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "all" => Some(StatusFilter::All),
            other => ChangeStatus::from_str(other).map(StatusFilter::Only),
        }
    }

    pub fn matches(&self, status: ChangeStatus) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Only(wanted) => status == *wanted,
        }
    }
}

/// Sort key for the overview feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    #[default]
    Date,
    Confidence,
    Regulation,
    Type,
}

impl SortKey {
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "date" => Some(SortKey::Date),
            "confidence" => Some(SortKey::Confidence),
            "regulation" => Some(SortKey::Regulation),
            "type" => Some(SortKey::Type),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "asc" => Some(SortOrder::Asc),
            "desc" => Some(SortOrder::Desc),
            _ => None,
        }
    }
}

/// Filter and sort settings for the overview feed.
///
/// A change is included iff every active clause passes. The defaults are the
/// identity filter: everything included, sorted by upload date descending.
#[derive(Debug, Clone)]
pub struct FilterOptions {
    /// Case-insensitive substring over summary, analysis, change text, or
    /// regulation title.
    pub search_term: Option<String>,
    /// Regulation id membership; empty means no filtering.
    pub regulation_ids: Vec<String>,
    /// Change type membership; empty means no filtering.
    pub types: Vec<String>,
    /// Inclusive confidence bounds.
    pub confidence_range: (f64, f64),
    /// Inclusive bounds on the parent version's upload date; applied only
    /// when both endpoints are set.
    pub date_range: (Option<DateTime<Utc>>, Option<DateTime<Utc>>),
    pub status: StatusFilter,
    pub sort_by: SortKey,
    pub sort_order: SortOrder,
}

impl Default for FilterOptions {
    fn default() -> Self {
        Self {
            search_term: None,
            regulation_ids: Vec::new(),
            types: Vec::new(),
            confidence_range: (0.0, 1.0),
            date_range: (None, None),
            status: StatusFilter::All,
            sort_by: SortKey::Date,
            sort_order: SortOrder::Desc,
        }
    }
}

impl FilterOptions {
    fn matches(&self, change: &AggregatedChange) -> bool {
        if !self.status.matches(change.change.status) {
            return false;
        }

        if let Some(term) = &self.search_term {
            let term = term.to_lowercase();
            if !term.is_empty() {
                let hit = change.change.summary.to_lowercase().contains(&term)
                    || change.change.analysis.to_lowercase().contains(&term)
                    || change.change.change.to_lowercase().contains(&term)
                    || change.regulation_title.to_lowercase().contains(&term);
                if !hit {
                    return false;
                }
            }
        }

        if !self.regulation_ids.is_empty() && !self.regulation_ids.contains(&change.regulation_id) {
            return false;
        }

        if !self.types.is_empty() && !self.types.contains(&change.change.change_type) {
            return false;
        }

        let (min, max) = self.confidence_range;
        if change.change.confidence < min || change.change.confidence > max {
            return false;
        }

        if let (Some(start), Some(end)) = self.date_range {
            if change.upload_date < start || change.upload_date > end {
                return false;
            }
        }

        true
    }
}

/// Flatten every change of every version of every regulation into one list.
/// Order is insertion order; a sort is always applied before display.
pub fn aggregate(regulations: &[Regulation]) -> Vec<AggregatedChange> {
    let mut all = Vec::new();
    for regulation in regulations {
        for version in &regulation.versions {
            for change in &version.detailed_changes {
                all.push(AggregatedChange {
                    change: change.clone(),
                    regulation_id: regulation.id.clone(),
                    regulation_title: regulation.title.clone(),
                    version_id: version.id.clone(),
                    version_number: version.version.clone(),
                    version_title: version.title.clone(),
                    upload_date: version.upload_date,
                });
            }
        }
    }
    all
}

/// Apply the filter conjunction and the selected sort.
///
/// The sort is stable; ties keep their aggregation order.
pub fn filter_and_sort(
    changes: Vec<AggregatedChange>,
    options: &FilterOptions,
) -> Vec<AggregatedChange> {
    let mut filtered: Vec<AggregatedChange> = changes
        .into_iter()
        .filter(|change| options.matches(change))
        .collect();

    filtered.sort_by(|a, b| {
        let ordering = match options.sort_by {
            SortKey::Date => a.upload_date.cmp(&b.upload_date),
            SortKey::Confidence => a
                .change
                .confidence
                .partial_cmp(&b.change.confidence)
                .unwrap_or(std::cmp::Ordering::Equal),
            SortKey::Regulation => a.regulation_title.cmp(&b.regulation_title),
            SortKey::Type => a.change.change_type.cmp(&b.change.change_type),
        };
        match options.sort_order {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        }
    });

    filtered
}

/// Filter one version's change list by status, for the per-version view.
pub fn filter_by_status(changes: &[DetailedChange], filter: StatusFilter) -> Vec<DetailedChange> {
    changes
        .iter()
        .filter(|change| filter.matches(change.status))
        .cloned()
        .collect()
}

/// Version selection for the per-regulation detail view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionSelection {
    Latest,
    Id(String),
}

impl VersionSelection {
    pub fn from_str(s: &str) -> Self {
        match s {
            "latest" => VersionSelection::Latest,
            id => VersionSelection::Id(id.to_string()),
        }
    }
}

/// Resolved current/previous pair for the detail view.
#[derive(Debug)]
pub struct VersionView<'a> {
    pub current: &'a RegulationVersion,
    /// The next older version, `None` when `current` is the baseline.
    pub previous: Option<&'a RegulationVersion>,
    pub is_oldest: bool,
}

/// Resolve the selected version and its predecessor within a regulation.
///
/// An unknown id falls back to latest. Returns `None` only for a regulation
/// with no versions at all.
pub fn resolve_versions<'a>(
    regulation: &'a Regulation,
    selection: &VersionSelection,
) -> Option<VersionView<'a>> {
    if regulation.versions.is_empty() {
        return None;
    }

    let index = match selection {
        VersionSelection::Latest => 0,
        VersionSelection::Id(id) => regulation
            .versions
            .iter()
            .position(|v| v.id == *id)
            .unwrap_or(0),
    };

    let current = &regulation.versions[index];
    let previous = regulation.versions.get(index + 1);

    Some(VersionView {
        current,
        is_oldest: previous.is_none(),
        previous,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RegulationStatus;
    use chrono::TimeZone;

    fn date(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
    }

    fn change(id: &str, status: ChangeStatus, change_type: &str, confidence: f64) -> DetailedChange {
        DetailedChange {
            id: id.to_string(),
            summary: format!("summary of {id}"),
            analysis: format!("analysis of {id}"),
            change: format!("description of {id}"),
            before_quote: "before".to_string(),
            after_quote: "after".to_string(),
            change_type: change_type.to_string(),
            confidence,
            status,
            classification: None,
            comments: Vec::new(),
        }
    }

    fn regulation(id: &str, title: &str, versions: Vec<RegulationVersion>) -> Regulation {
        Regulation {
            id: id.to_string(),
            title: title.to_string(),
            status: RegulationStatus::Pending,
            last_updated: date(2024, 9, 1),
            versions,
        }
    }

    fn version(
        id: &str,
        label: &str,
        upload_date: DateTime<Utc>,
        changes: Vec<DetailedChange>,
    ) -> RegulationVersion {
        RegulationVersion {
            id: id.to_string(),
            version: label.to_string(),
            title: None,
            upload_date,
            file_name: format!("{id}.pdf"),
            object_key: format!("key-{id}"),
            detailed_changes: changes,
        }
    }

    fn fixture() -> Vec<Regulation> {
        vec![
            regulation(
                "r1",
                "Banking Act",
                vec![
                    version(
                        "v2",
                        "2.0",
                        date(2024, 9, 1),
                        vec![
                            change("c1", ChangeStatus::Relevant, "modification", 0.9),
                            change("c2", ChangeStatus::Pending, "penalty change", 0.4),
                        ],
                    ),
                    version("v1", "1.0", date(2024, 1, 10), vec![]),
                ],
            ),
            regulation(
                "r2",
                "Data Act",
                vec![version(
                    "v2",
                    "2.0",
                    date(2024, 6, 15),
                    vec![change("c3", ChangeStatus::NotRelevant, "modification", 0.7)],
                )],
            ),
        ]
    }

    #[test]
    fn test_aggregate_flattens_all_changes() {
        let all = aggregate(&fixture());
        assert_eq!(all.len(), 3);
        let c1 = all.iter().find(|c| c.change.id == "c1").unwrap();
        assert_eq!(c1.regulation_title, "Banking Act");
        assert_eq!(c1.version_number, "2.0");
        assert_eq!(c1.upload_date, date(2024, 9, 1));
    }

    #[test]
    fn test_pending_filter_excludes_reviewed_changes() {
        let options = FilterOptions {
            status: StatusFilter::Only(ChangeStatus::Pending),
            ..Default::default()
        };
        let result = filter_and_sort(aggregate(&fixture()), &options);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].change.id, "c2");
    }

    #[test]
    fn test_default_options_are_identity_filter() {
        let all = aggregate(&fixture());
        let total = all.len();
        let result = filter_and_sort(all, &FilterOptions::default());
        assert_eq!(result.len(), total);
    }

    #[test]
    fn test_default_confidence_range_is_noop() {
        let mut boundary = fixture();
        boundary[0].versions[0]
            .detailed_changes
            .push(change("c4", ChangeStatus::Pending, "modification", 0.0));
        boundary[0].versions[0]
            .detailed_changes
            .push(change("c5", ChangeStatus::Pending, "modification", 1.0));

        let all = aggregate(&boundary);
        let total = all.len();
        let result = filter_and_sort(all, &FilterOptions::default());
        assert_eq!(result.len(), total);
    }

    #[test]
    fn test_confidence_bounds_are_inclusive() {
        let options = FilterOptions {
            confidence_range: (0.4, 0.7),
            ..Default::default()
        };
        let result = filter_and_sort(aggregate(&fixture()), &options);
        let ids: Vec<&str> = result.iter().map(|c| c.change.id.as_str()).collect();
        assert_eq!(ids.len(), 2);
        assert!(ids.contains(&"c2"));
        assert!(ids.contains(&"c3"));
    }

    #[test]
    fn test_search_matches_regulation_title() {
        let options = FilterOptions {
            search_term: Some("BANKING".to_string()),
            ..Default::default()
        };
        let result = filter_and_sort(aggregate(&fixture()), &options);
        assert_eq!(result.len(), 2);
        assert!(result.iter().all(|c| c.regulation_id == "r1"));
    }

    #[test]
    fn test_type_and_regulation_sets_intersect() {
        let options = FilterOptions {
            regulation_ids: vec!["r1".to_string()],
            types: vec!["modification".to_string()],
            ..Default::default()
        };
        let result = filter_and_sort(aggregate(&fixture()), &options);
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].change.id, "c1");
    }

    #[test]
    fn test_date_range_requires_both_endpoints() {
        // Only one endpoint set: clause inactive.
        let options = FilterOptions {
            date_range: (Some(date(2024, 8, 1)), None),
            ..Default::default()
        };
        assert_eq!(filter_and_sort(aggregate(&fixture()), &options).len(), 3);

        let options = FilterOptions {
            date_range: (Some(date(2024, 8, 1)), Some(date(2024, 12, 31))),
            ..Default::default()
        };
        let result = filter_and_sort(aggregate(&fixture()), &options);
        assert_eq!(result.len(), 2);
        assert!(result.iter().all(|c| c.version_id == "v2"));
    }

    #[test]
    fn test_sort_by_confidence_ascending() {
        let options = FilterOptions {
            sort_by: SortKey::Confidence,
            sort_order: SortOrder::Asc,
            ..Default::default()
        };
        let result = filter_and_sort(aggregate(&fixture()), &options);
        let confidences: Vec<f64> = result.iter().map(|c| c.change.confidence).collect();
        assert_eq!(confidences, vec![0.4, 0.7, 0.9]);
    }

    #[test]
    fn test_sort_by_regulation_title() {
        let options = FilterOptions {
            sort_by: SortKey::Regulation,
            sort_order: SortOrder::Asc,
            ..Default::default()
        };
        let result = filter_and_sort(aggregate(&fixture()), &options);
        assert_eq!(result[0].regulation_title, "Banking Act");
        assert_eq!(result.last().unwrap().regulation_title, "Data Act");
    }

    #[test]
    fn test_resolve_latest_and_previous() {
        let regs = fixture();
        let view = resolve_versions(&regs[0], &VersionSelection::Latest).unwrap();
        assert_eq!(view.current.version, "2.0");
        assert_eq!(view.previous.unwrap().version, "1.0");
        assert!(!view.is_oldest);
    }

    #[test]
    fn test_resolve_explicit_oldest_version() {
        let regs = fixture();
        let view = resolve_versions(&regs[0], &VersionSelection::Id("v1".to_string())).unwrap();
        assert_eq!(view.current.version, "1.0");
        assert!(view.previous.is_none());
        assert!(view.is_oldest);
    }

    #[test]
    fn test_resolve_unknown_id_falls_back_to_latest() {
        let regs = fixture();
        let view =
            resolve_versions(&regs[0], &VersionSelection::Id("missing".to_string())).unwrap();
        assert_eq!(view.current.version, "2.0");
        assert!(!view.is_oldest);
    }

    #[test]
    fn test_single_version_regulation_is_baseline() {
        let regs = fixture();
        let view = resolve_versions(&regs[1], &VersionSelection::Latest).unwrap();
        assert!(view.previous.is_none());
        assert!(view.is_oldest);
    }

    #[test]
    fn test_filter_by_status_on_version_changes() {
        let regs = fixture();
        let changes = &regs[0].versions[0].detailed_changes;
        let pending = filter_by_status(changes, StatusFilter::Only(ChangeStatus::Pending));
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, "c2");
        let all = filter_by_status(changes, StatusFilter::All);
        assert_eq!(all.len(), 2);
    }
}
