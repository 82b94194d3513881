//! CSV rendering of the filtered overview feed.

use chrono::{DateTime, Utc};

use super::AggregatedChange;
use crate::errors::AppError;

const HEADER: &str = r#""regulation","version","type","summary","confidence","status","uploadDate""#;

/// Render the filtered changes as CSV: one row per change, all values
/// double-quoted, confidence as an integer percentage string.
///
/// Exporting an empty list is rejected; the export action is only offered
/// when there is something to export.
pub fn to_csv(changes: &[AggregatedChange]) -> Result<String, AppError> {
    if changes.is_empty() {
        return Err(AppError::Validation(
            "No changes match the current filters; nothing to export".to_string(),
        ));
    }

    let mut rows = Vec::with_capacity(changes.len() + 1);
    rows.push(HEADER.to_string());

    for change in changes {
        let version = match &change.version_title {
            Some(title) => format!("{} - {}", change.version_number, title),
            None => change.version_number.clone(),
        };
        let confidence = format!("{:.0}%", change.change.confidence * 100.0);
        let fields = [
            change.regulation_title.as_str(),
            version.as_str(),
            change.change.change_type.as_str(),
            change.change.summary.as_str(),
            confidence.as_str(),
            change.change.status.as_str(),
            &change.upload_date.to_rfc3339(),
        ];
        let row: Vec<String> = fields.iter().map(|field| quote(field)).collect();
        rows.push(row.join(","));
    }

    Ok(rows.join("\n"))
}

/// Download filename for an export generated on `date`.
pub fn export_file_name(date: DateTime<Utc>) -> String {
    format!("changes-overview-{}.csv", date.format("%Y-%m-%d"))
}

fn quote(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ChangeStatus, DetailedChange};
    use chrono::TimeZone;

    fn aggregated(id: &str, summary: &str, confidence: f64) -> AggregatedChange {
        AggregatedChange {
            change: DetailedChange {
                id: id.to_string(),
                summary: summary.to_string(),
                analysis: String::new(),
                change: String::new(),
                before_quote: String::new(),
                after_quote: String::new(),
                change_type: "modification".to_string(),
                confidence,
                status: ChangeStatus::Pending,
                classification: None,
                comments: Vec::new(),
            },
            regulation_id: "r1".to_string(),
            regulation_title: "Banking Act".to_string(),
            version_id: "v2".to_string(),
            version_number: "2.0".to_string(),
            version_title: None,
            upload_date: Utc.with_ymd_and_hms(2024, 9, 1, 12, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_row_count_matches_input() {
        let changes = vec![
            aggregated("c1", "first", 0.85),
            aggregated("c2", "second", 0.4),
        ];
        let csv = to_csv(&changes).unwrap();
        assert_eq!(csv.lines().count(), changes.len() + 1);
        assert!(csv.lines().next().unwrap().contains("uploadDate"));
    }

    #[test]
    fn test_confidence_rendered_as_percentage() {
        let csv = to_csv(&[aggregated("c1", "s", 0.85)]).unwrap();
        assert!(csv.contains("\"85%\""));
    }

    #[test]
    fn test_embedded_quotes_are_doubled() {
        let csv = to_csv(&[aggregated("c1", "the \"grace period\" clause", 0.5)]).unwrap();
        assert!(csv.contains("\"the \"\"grace period\"\" clause\""));
    }

    #[test]
    fn test_version_title_appended_to_label() {
        let mut change = aggregated("c1", "s", 0.5);
        change.version_title = Some("Amendment".to_string());
        let csv = to_csv(&[change]).unwrap();
        assert!(csv.contains("\"2.0 - Amendment\""));
    }

    #[test]
    fn test_empty_export_rejected() {
        let err = to_csv(&[]).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn test_export_file_name() {
        let date = Utc.with_ymd_and_hms(2024, 9, 1, 23, 59, 0).unwrap();
        assert_eq!(export_file_name(date), "changes-overview-2024-09-01.csv");
    }
}
