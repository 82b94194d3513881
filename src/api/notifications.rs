//! Notification endpoints backing the unread-count badge.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::errors::AppError;
use crate::models::{MarkSeenRequest, NotificationView};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct NotificationsQuery {
    pub username: String,
}

/// GET /notifications?username= - List notifications newest first with the
/// per-user seen flag.
pub async fn list_notifications(
    State(state): State<AppState>,
    Query(query): Query<NotificationsQuery>,
) -> Result<Json<Vec<NotificationView>>, AppError> {
    Ok(Json(state.repo.list_notifications(&query.username).await?))
}

/// PUT /notifications/{id}/seen - Mark a notification seen for one user.
pub async fn mark_notification_seen(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<MarkSeenRequest>,
) -> Result<Json<Value>, AppError> {
    if body.username.trim().is_empty() {
        return Err(AppError::Validation("Missing 'username' field".to_string()));
    }

    state
        .repo
        .mark_notification_seen(&id, body.username.trim())
        .await?;

    Ok(Json(json!({
        "message": format!("{} marked notification as seen", body.username.trim())
    })))
}
