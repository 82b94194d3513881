//! Reviewer actions on a single detected change: status, edits, comments.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::errors::AppError;
use crate::models::ChangeStatus;
use crate::review::{self, ChangeEditRequest, Transition};
use crate::AppState;

/// Request body for the status update endpoint.
#[derive(Debug, Deserialize)]
pub struct ChangeStatusUpdate {
    pub new_status: ChangeStatus,
}

/// PUT /regulations/{id}/versions/{vid}/changes/{cid} - Update review status.
///
/// The transition is validated against the current status: directly requesting
/// `pending` is rejected, and re-submitting the current status writes nothing.
pub async fn update_change_status(
    State(state): State<AppState>,
    Path((regulation_id, version_id, change_id)): Path<(String, String, String)>,
    Json(body): Json<ChangeStatusUpdate>,
) -> Result<Json<Value>, AppError> {
    let change = state
        .repo
        .get_change(&regulation_id, &version_id, &change_id)
        .await?;

    match review::validate_transition(change.status, body.new_status)? {
        Transition::NoOp => {}
        Transition::Apply(status) => {
            state
                .repo
                .set_change_status(&regulation_id, &version_id, &change_id, status)
                .await?;
            tracing::info!(
                "Change {} status: {} -> {}",
                change_id,
                change.status.as_str(),
                status.as_str()
            );
        }
    }

    Ok(Json(json!({
        "message": "Change status updated",
        "status": body.new_status
    })))
}

/// PUT /regulations/{id}/versions/{vid}/changes/{cid}/edit - Edit the mutable
/// text fields of a change.
///
/// Only fields whose supplied value differs from the stored one count as
/// edited. Any real edit forces the status back to pending; an edit that
/// changes nothing leaves the review status untouched.
pub async fn edit_change(
    State(state): State<AppState>,
    Path((regulation_id, version_id, change_id)): Path<(String, String, String)>,
    Json(request): Json<ChangeEditRequest>,
) -> Result<Json<Value>, AppError> {
    let mut change = state
        .repo
        .get_change(&regulation_id, &version_id, &change_id)
        .await?;

    let patches = review::diff(&change, request.into_patches());
    let updated_fields: Vec<&'static str> =
        patches.iter().map(|patch| patch.field_name()).collect();

    if !patches.is_empty() {
        review::apply_edit(&mut change, &patches);
        state
            .repo
            .update_change_fields(&regulation_id, &version_id, &change)
            .await?;
        tracing::info!("Change {} edited: {:?}", change_id, updated_fields);
    }

    Ok(Json(json!({
        "message": "Change updated",
        "updated_fields": updated_fields
    })))
}

/// Request body for adding a comment.
#[derive(Debug, Deserialize)]
pub struct ChangeCommentCreate {
    pub username: String,
    pub comment: String,
}

/// POST /regulations/{id}/versions/{vid}/changes/{cid}/comments - Append a
/// comment. Blank content is rejected before any state change.
pub async fn add_comment(
    State(state): State<AppState>,
    Path((regulation_id, version_id, change_id)): Path<(String, String, String)>,
    Json(body): Json<ChangeCommentCreate>,
) -> Result<Json<Value>, AppError> {
    if body.comment.trim().is_empty() {
        return Err(AppError::Validation("Comment cannot be empty".to_string()));
    }
    if body.username.trim().is_empty() {
        return Err(AppError::Validation("Username is required".to_string()));
    }

    let comment = state
        .repo
        .add_comment(
            &regulation_id,
            &version_id,
            &change_id,
            body.username.trim(),
            body.comment.trim(),
        )
        .await?;

    Ok(Json(json!({
        "message": "Comment added",
        "comment": comment
    })))
}
