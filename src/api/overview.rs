//! Cross-regulation overview endpoints: the filtered changes feed and its CSV
//! export.

use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::errors::AppError;
use crate::overview::{
    aggregate, export_file_name, filter_and_sort, to_csv, FilterOptions, SortKey, SortOrder,
    StatusFilter,
};
use crate::AppState;

/// Query parameters for the overview feed. List-valued filters are
/// comma-separated; dates are `YYYY-MM-DD` and inclusive.
#[derive(Debug, Default, Deserialize)]
pub struct OverviewQuery {
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub regulations: Option<String>,
    #[serde(default)]
    pub types: Option<String>,
    #[serde(default)]
    pub min_confidence: Option<f64>,
    #[serde(default)]
    pub max_confidence: Option<f64>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub sort_by: Option<String>,
    #[serde(default)]
    pub sort_order: Option<String>,
}

impl OverviewQuery {
    fn into_options(self) -> Result<FilterOptions, AppError> {
        let defaults = FilterOptions::default();

        let status = match self.status.as_deref() {
            None => defaults.status,
            Some(s) => StatusFilter::from_str(s)
                .ok_or_else(|| AppError::Validation(format!("Unknown status filter '{}'", s)))?,
        };
        let sort_by = match self.sort_by.as_deref() {
            None => defaults.sort_by,
            Some(s) => SortKey::from_str(s)
                .ok_or_else(|| AppError::Validation(format!("Unknown sort key '{}'", s)))?,
        };
        let sort_order = match self.sort_order.as_deref() {
            None => defaults.sort_order,
            Some(s) => SortOrder::from_str(s)
                .ok_or_else(|| AppError::Validation(format!("Unknown sort order '{}'", s)))?,
        };

        let min = self.min_confidence.unwrap_or(0.0);
        let max = self.max_confidence.unwrap_or(1.0);
        if !(0.0..=1.0).contains(&min) || !(0.0..=1.0).contains(&max) || min > max {
            return Err(AppError::Validation(
                "Confidence bounds must satisfy 0 <= min <= max <= 1".to_string(),
            ));
        }

        let start = self.start_date.as_deref().map(parse_day_start).transpose()?;
        let end = self.end_date.as_deref().map(parse_day_end).transpose()?;

        Ok(FilterOptions {
            search_term: self.search.filter(|s| !s.trim().is_empty()),
            regulation_ids: split_list(self.regulations),
            types: split_list(self.types),
            confidence_range: (min, max),
            date_range: (start, end),
            status,
            sort_by,
            sort_order,
        })
    }
}

fn split_list(value: Option<String>) -> Vec<String> {
    value
        .map(|s| {
            s.split(',')
                .map(str::trim)
                .filter(|part| !part.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn parse_day_start(s: &str) -> Result<chrono::DateTime<Utc>, AppError> {
    parse_date(s).map(|d| d.and_hms_opt(0, 0, 0).unwrap().and_utc())
}

fn parse_day_end(s: &str) -> Result<chrono::DateTime<Utc>, AppError> {
    parse_date(s).map(|d| d.and_hms_opt(23, 59, 59).unwrap().and_utc())
}

fn parse_date(s: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|_| AppError::Validation(format!("Invalid date '{}', expected YYYY-MM-DD", s)))
}

/// GET /changes/overview - The filtered, sorted cross-regulation feed.
pub async fn overview(
    State(state): State<AppState>,
    Query(query): Query<OverviewQuery>,
) -> Result<Json<Value>, AppError> {
    let options = query.into_options()?;
    let regulations = state.repo.list_regulations().await?;
    let changes = filter_and_sort(aggregate(&regulations), &options);

    Ok(Json(json!({
        "total": changes.len(),
        "changes": changes
    })))
}

/// GET /changes/overview/export - The same feed rendered as a CSV download.
/// An empty filtered list is rejected rather than exported.
pub async fn export_overview(
    State(state): State<AppState>,
    Query(query): Query<OverviewQuery>,
) -> Result<Response, AppError> {
    let options = query.into_options()?;
    let regulations = state.repo.list_regulations().await?;
    let changes = filter_and_sort(aggregate(&regulations), &options);

    let csv = to_csv(&changes)?;
    let file_name = export_file_name(Utc::now());

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", file_name),
            ),
        ],
        csv,
    )
        .into_response())
}
