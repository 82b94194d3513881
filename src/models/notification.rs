//! Notification models backing the unread-count badge.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A notification as seen by one user. `seen` is per-username.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationView {
    pub id: String,
    pub title: String,
    pub message: String,
    pub seen: bool,
    pub created_at: DateTime<Utc>,
}

/// Request body for PUT /notifications/{id}/seen.
#[derive(Debug, Clone, Deserialize)]
pub struct MarkSeenRequest {
    pub username: String,
}
