//! Regulation and version endpoints: listing, uploads, deletion, and the
//! per-version review view.

use axum::{
    extract::{Multipart, Path, Query, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::errors::AppError;
use crate::models::Regulation;
use crate::overview::{self, StatusFilter, VersionSelection};
use crate::AppState;

/// GET /regulations - List all regulations with nested versions and changes.
pub async fn list_regulations(
    State(state): State<AppState>,
) -> Result<Json<Vec<Regulation>>, AppError> {
    Ok(Json(state.repo.list_regulations().await?))
}

/// Parsed multipart upload form shared by the two upload endpoints.
#[derive(Default)]
struct UploadForm {
    title: Option<String>,
    version: Option<String>,
    version_title: Option<String>,
    file: Option<(String, Vec<u8>)>,
}

async fn parse_upload(mut multipart: Multipart) -> Result<UploadForm, AppError> {
    let mut form = UploadForm::default();

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("title") => form.title = Some(field.text().await?),
            Some("version") => form.version = Some(field.text().await?),
            Some("versionTitle") => form.version_title = Some(field.text().await?),
            Some("file") => {
                if field.content_type() != Some("application/pdf") {
                    return Err(AppError::BadRequest(
                        "Only PDF files are allowed".to_string(),
                    ));
                }
                let file_name = field
                    .file_name()
                    .unwrap_or("upload.pdf")
                    .to_string();
                form.file = Some((file_name, field.bytes().await?.to_vec()));
            }
            _ => {}
        }
    }

    Ok(form)
}

/// POST /regulations - Create a regulation from an uploaded PDF. The upload
/// becomes the implicit first version (the baseline, never analyzed).
pub async fn create_regulation(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<Value>, AppError> {
    let form = parse_upload(multipart).await?;

    let title = form
        .title
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| AppError::Validation("Title is required".to_string()))?;
    let version = form
        .version
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| AppError::Validation("Version label is required".to_string()))?;
    let (file_name, bytes) = form
        .file
        .ok_or_else(|| AppError::Validation("PDF file is required".to_string()))?;

    let object_key = state.uploads.store(&file_name, &bytes).await?;
    let regulation = state
        .repo
        .create_regulation(title.trim(), version.trim(), &file_name, &object_key)
        .await?;

    state
        .repo
        .add_notification(
            "New regulation uploaded",
            &format!("{} is now being tracked", regulation.title),
        )
        .await?;

    tracing::info!("Created regulation {} ({})", regulation.title, regulation.id);

    Ok(Json(json!({
        "id": regulation.id,
        "message": "Regulation created"
    })))
}

/// POST /regulations/{id}/versions - Upload a new version of a regulation.
///
/// Runs the external analyzer against the previous latest upload and the new
/// one; analyzer failure fails the whole request and no version is stored.
pub async fn add_version(
    State(state): State<AppState>,
    Path(regulation_id): Path<String>,
    multipart: Multipart,
) -> Result<Json<Value>, AppError> {
    let form = parse_upload(multipart).await?;
    let (file_name, bytes) = form
        .file
        .ok_or_else(|| AppError::Validation("PDF file is required".to_string()))?;

    let regulation = state
        .repo
        .get_regulation(&regulation_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Regulation {} not found", regulation_id)))?;
    let previous_key = regulation
        .latest_version()
        .map(|v| v.object_key.clone())
        .ok_or_else(|| {
            AppError::Validation(format!("Regulation {} has no versions", regulation_id))
        })?;

    let object_key = state.uploads.store(&file_name, &bytes).await?;
    let detected = state.analyzer.analyze(&previous_key, &object_key).await?;

    let version = state
        .repo
        .add_version(
            &regulation_id,
            form.version.filter(|v| !v.trim().is_empty()),
            form.version_title.filter(|t| !t.trim().is_empty()),
            &file_name,
            &object_key,
            detected,
        )
        .await?;

    state
        .repo
        .add_notification(
            "New version uploaded",
            &format!(
                "{} has a new version {} with {} detected changes",
                regulation.title,
                version.version,
                version.detailed_changes.len()
            ),
        )
        .await?;

    Ok(Json(json!({
        "message": "New version added",
        "version": version
    })))
}

/// DELETE /regulations/{id} - Delete a regulation and everything under it.
pub async fn delete_regulation(
    State(state): State<AppState>,
    Path(regulation_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    state.repo.delete_regulation(&regulation_id).await?;
    Ok(Json(json!({ "message": "Regulation deleted" })))
}

/// DELETE /regulations/{id}/versions/{vid} - Delete the latest version.
pub async fn delete_version(
    State(state): State<AppState>,
    Path((regulation_id, version_id)): Path<(String, String)>,
) -> Result<Json<Value>, AppError> {
    state.repo.delete_version(&regulation_id, &version_id).await?;
    Ok(Json(json!({ "message": "Version deleted" })))
}

/// PUT /regulations/{id}/status - Toggle the display status between pending
/// and validated.
pub async fn toggle_regulation_status(
    State(state): State<AppState>,
    Path(regulation_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let status = state.repo.toggle_regulation_status(&regulation_id).await?;
    Ok(Json(json!({
        "message": "Regulation status updated",
        "status": status
    })))
}

/// Query parameters for the per-version review view.
#[derive(Debug, Deserialize)]
pub struct ReviewQuery {
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

/// GET /regulations/{id}/review - Resolve the selected version, its
/// predecessor, and the (optionally status-filtered) change list.
pub async fn review_view(
    State(state): State<AppState>,
    Path(regulation_id): Path<String>,
    Query(query): Query<ReviewQuery>,
) -> Result<Json<Value>, AppError> {
    let regulation = state
        .repo
        .get_regulation(&regulation_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Regulation {} not found", regulation_id)))?;

    let selection = VersionSelection::from_str(query.version.as_deref().unwrap_or("latest"));
    let status_filter = match query.status.as_deref() {
        None => StatusFilter::All,
        Some(s) => StatusFilter::from_str(s)
            .ok_or_else(|| AppError::Validation(format!("Unknown status filter '{}'", s)))?,
    };

    let view = overview::resolve_versions(&regulation, &selection).ok_or_else(|| {
        AppError::Validation(format!("Regulation {} has no versions", regulation_id))
    })?;
    let changes = overview::filter_by_status(&view.current.detailed_changes, status_filter);

    Ok(Json(json!({
        "current": view.current,
        "previous": view.previous,
        "isOldestVersion": view.is_oldest,
        "changes": changes
    })))
}
