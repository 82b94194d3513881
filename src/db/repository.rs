//! Database repository for CRUD operations.
//!
//! The repository is deliberately dumb storage: workflow rules (status
//! transitions, edit diffs, latest-only deletion) are validated by the
//! callers in the review layer before anything is written.

use std::collections::HashMap;

use chrono::Utc;
use sqlx::{Row, SqlitePool};

use crate::analysis::DetectedChange;
use crate::errors::AppError;
use crate::models::{
    ChangeStatus, Classification, Comment, CreateUserRequest, DetailedChange, NotificationView,
    Regulation, RegulationStatus, RegulationVersion, Role, UpdateUserRequest, User,
};
use crate::models::sort_versions;

/// Database repository for all data operations.
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    // ==================== REGULATION OPERATIONS ====================

    /// List all regulations with nested versions, changes and comments.
    /// Version lists come back sorted newest first.
    pub async fn list_regulations(&self) -> Result<Vec<Regulation>, AppError> {
        self.load_regulations(None).await
    }

    /// Get a single regulation by ID, fully nested.
    pub async fn get_regulation(&self, id: &str) -> Result<Option<Regulation>, AppError> {
        Ok(self.load_regulations(Some(id)).await?.into_iter().next())
    }

    async fn load_regulations(&self, only: Option<&str>) -> Result<Vec<Regulation>, AppError> {
        let (reg_filter, version_filter, change_filter) = match only {
            Some(_) => (
                "WHERE id = ?",
                "WHERE regulation_id = ?",
                "WHERE regulation_id = ?",
            ),
            None => ("", "", ""),
        };

        let reg_sql = format!(
            "SELECT id, title, status, last_updated FROM regulations {reg_filter} ORDER BY title"
        );
        let version_sql = format!(
            "SELECT id, regulation_id, version, title, upload_date, file_name, object_key \
             FROM versions {version_filter}"
        );
        let change_sql = format!(
            "SELECT id, regulation_id, version_id, summary, analysis, change, before_quote, \
                    after_quote, change_type, confidence, status, classification \
             FROM changes {change_filter} ORDER BY rowid"
        );
        let mut reg_query = sqlx::query(&reg_sql);
        let mut version_query = sqlx::query(&version_sql);
        let mut change_query = sqlx::query(&change_sql);
        if let Some(id) = only {
            reg_query = reg_query.bind(id);
            version_query = version_query.bind(id);
            change_query = change_query.bind(id);
        }

        let reg_rows = reg_query.fetch_all(&self.pool).await?;
        if reg_rows.is_empty() {
            return Ok(Vec::new());
        }
        let version_rows = version_query.fetch_all(&self.pool).await?;
        let change_rows = change_query.fetch_all(&self.pool).await?;
        let comment_rows = sqlx::query(
            "SELECT id, change_id, author, content, timestamp FROM comments ORDER BY rowid",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut comments_by_change: HashMap<String, Vec<Comment>> = HashMap::new();
        for row in &comment_rows {
            comments_by_change
                .entry(row.get("change_id"))
                .or_default()
                .push(comment_from_row(row));
        }

        let mut changes_by_version: HashMap<(String, String), Vec<DetailedChange>> = HashMap::new();
        for row in &change_rows {
            let key = (row.get("regulation_id"), row.get("version_id"));
            let mut change = change_from_row(row);
            change.comments = comments_by_change.remove(&change.id).unwrap_or_default();
            changes_by_version.entry(key).or_default().push(change);
        }

        let mut versions_by_regulation: HashMap<String, Vec<RegulationVersion>> = HashMap::new();
        for row in &version_rows {
            let regulation_id: String = row.get("regulation_id");
            let mut version = version_from_row(row);
            version.detailed_changes = changes_by_version
                .remove(&(regulation_id.clone(), version.id.clone()))
                .unwrap_or_default();
            versions_by_regulation
                .entry(regulation_id)
                .or_default()
                .push(version);
        }

        let mut regulations = Vec::with_capacity(reg_rows.len());
        for row in &reg_rows {
            let id: String = row.get("id");
            let mut versions = versions_by_regulation.remove(&id).unwrap_or_default();
            sort_versions(&mut versions);
            regulations.push(Regulation {
                id,
                title: row.get("title"),
                status: RegulationStatus::from_str(row.get("status"))
                    .unwrap_or(RegulationStatus::Pending),
                last_updated: row.get("last_updated"),
                versions,
            });
        }

        Ok(regulations)
    }

    /// Create a regulation with its implicit first version (the baseline,
    /// which has no predecessor and therefore no detected changes).
    pub async fn create_regulation(
        &self,
        title: &str,
        version_label: &str,
        file_name: &str,
        object_key: &str,
    ) -> Result<Regulation, AppError> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now();

        let mut tx = self.pool.begin().await?;

        sqlx::query("INSERT INTO regulations (id, title, status, last_updated) VALUES (?, ?, 'pending', ?)")
            .bind(&id)
            .bind(title)
            .bind(now)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            "INSERT INTO versions (id, regulation_id, seq, version, title, upload_date, file_name, object_key) \
             VALUES ('v1', ?, 1, ?, NULL, ?, ?, ?)",
        )
        .bind(&id)
        .bind(version_label)
        .bind(now)
        .bind(file_name)
        .bind(object_key)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(Regulation {
            id: id.clone(),
            title: title.to_string(),
            status: RegulationStatus::Pending,
            last_updated: now,
            versions: vec![RegulationVersion {
                id: "v1".to_string(),
                version: version_label.to_string(),
                title: None,
                upload_date: now,
                file_name: file_name.to_string(),
                object_key: object_key.to_string(),
                detailed_changes: Vec::new(),
            }],
        })
    }

    /// Append a new version carrying the analyzer-detected changes.
    ///
    /// Resets the regulation's display status to pending: new content always
    /// needs review.
    pub async fn add_version(
        &self,
        regulation_id: &str,
        version_label: Option<String>,
        version_title: Option<String>,
        file_name: &str,
        object_key: &str,
        detected: Vec<DetectedChange>,
    ) -> Result<RegulationVersion, AppError> {
        let seq_row = sqlx::query(
            "SELECT COALESCE(MAX(seq), 0) AS max_seq FROM versions WHERE regulation_id = ?",
        )
        .bind(regulation_id)
        .fetch_one(&self.pool)
        .await?;
        let seq: i64 = seq_row.get("max_seq");
        let seq = seq + 1;

        let version_id = format!("v{seq}");
        let label = version_label.unwrap_or_else(|| seq.to_string());
        let now = Utc::now();

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO versions (id, regulation_id, seq, version, title, upload_date, file_name, object_key) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&version_id)
        .bind(regulation_id)
        .bind(seq)
        .bind(&label)
        .bind(&version_title)
        .bind(now)
        .bind(file_name)
        .bind(object_key)
        .execute(&mut *tx)
        .await?;

        let mut changes = Vec::with_capacity(detected.len());
        for item in detected {
            let change_id = uuid::Uuid::new_v4().to_string();
            sqlx::query(
                "INSERT INTO changes (id, regulation_id, version_id, summary, analysis, change, \
                        before_quote, after_quote, change_type, confidence, status, classification) \
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 'pending', ?)",
            )
            .bind(&change_id)
            .bind(regulation_id)
            .bind(&version_id)
            .bind(&item.summary)
            .bind(&item.analysis)
            .bind(&item.change)
            .bind(&item.before_quote)
            .bind(&item.after_quote)
            .bind(&item.change_type)
            .bind(item.confidence)
            .bind(item.classification.map(|c| c.as_str()))
            .execute(&mut *tx)
            .await?;

            changes.push(DetailedChange {
                id: change_id,
                summary: item.summary,
                analysis: item.analysis,
                change: item.change,
                before_quote: item.before_quote,
                after_quote: item.after_quote,
                change_type: item.change_type,
                confidence: item.confidence,
                status: ChangeStatus::Pending,
                classification: item.classification,
                comments: Vec::new(),
            });
        }

        sqlx::query("UPDATE regulations SET status = 'pending', last_updated = ? WHERE id = ?")
            .bind(now)
            .bind(regulation_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(RegulationVersion {
            id: version_id,
            version: label,
            title: version_title,
            upload_date: now,
            file_name: file_name.to_string(),
            object_key: object_key.to_string(),
            detailed_changes: changes,
        })
    }

    /// Toggle a regulation's display status between pending and validated.
    pub async fn toggle_regulation_status(&self, id: &str) -> Result<RegulationStatus, AppError> {
        let row = sqlx::query("SELECT status FROM regulations WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Regulation {} not found", id)))?;

        let current = RegulationStatus::from_str(row.get("status"))
            .unwrap_or(RegulationStatus::Pending);
        let toggled = current.toggled();

        sqlx::query("UPDATE regulations SET status = ? WHERE id = ?")
            .bind(toggled.as_str())
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(toggled)
    }

    /// Delete a regulation, cascading its versions, changes and comments.
    pub async fn delete_regulation(&self, id: &str) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM regulations WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Regulation {} not found", id)));
        }
        Ok(())
    }

    /// Delete a version, cascading its changes.
    ///
    /// Only the latest version of a multi-version regulation may be deleted,
    /// so the baseline/latest ordering invariant always survives.
    pub async fn delete_version(
        &self,
        regulation_id: &str,
        version_id: &str,
    ) -> Result<(), AppError> {
        let regulation = self
            .get_regulation(regulation_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Regulation {} not found", regulation_id)))?;

        if !regulation.versions.iter().any(|v| v.id == version_id) {
            return Err(AppError::NotFound(format!(
                "Version {} not found",
                version_id
            )));
        }

        if regulation.versions.len() > 1
            && regulation.latest_version().map(|v| v.id.as_str()) != Some(version_id)
        {
            return Err(AppError::Validation(
                "Only the latest version of a regulation can be deleted".to_string(),
            ));
        }

        sqlx::query("DELETE FROM versions WHERE regulation_id = ? AND id = ?")
            .bind(regulation_id)
            .bind(version_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    // ==================== CHANGE OPERATIONS ====================

    /// Fetch one change, validating the regulation/version/change chain so a
    /// bad id reports exactly which level is missing.
    pub async fn get_change(
        &self,
        regulation_id: &str,
        version_id: &str,
        change_id: &str,
    ) -> Result<DetailedChange, AppError> {
        let reg = sqlx::query("SELECT id FROM regulations WHERE id = ?")
            .bind(regulation_id)
            .fetch_optional(&self.pool)
            .await?;
        if reg.is_none() {
            return Err(AppError::NotFound(format!(
                "Regulation {} not found",
                regulation_id
            )));
        }

        let version = sqlx::query("SELECT id FROM versions WHERE regulation_id = ? AND id = ?")
            .bind(regulation_id)
            .bind(version_id)
            .fetch_optional(&self.pool)
            .await?;
        if version.is_none() {
            return Err(AppError::NotFound(format!(
                "Version {} not found",
                version_id
            )));
        }

        let row = sqlx::query(
            "SELECT id, regulation_id, version_id, summary, analysis, change, before_quote, \
                    after_quote, change_type, confidence, status, classification \
             FROM changes WHERE regulation_id = ? AND version_id = ? AND id = ?",
        )
        .bind(regulation_id)
        .bind(version_id)
        .bind(change_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Change {} not found", change_id)))?;

        Ok(change_from_row(&row))
    }

    /// Write a new review status. Callers validate the transition first.
    pub async fn set_change_status(
        &self,
        regulation_id: &str,
        version_id: &str,
        change_id: &str,
        status: ChangeStatus,
    ) -> Result<(), AppError> {
        sqlx::query(
            "UPDATE changes SET status = ? WHERE regulation_id = ? AND version_id = ? AND id = ?",
        )
        .bind(status.as_str())
        .bind(regulation_id)
        .bind(version_id)
        .bind(change_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Persist an edited change: the five mutable text fields plus the status
    /// (forced back to pending by the caller when any field changed).
    pub async fn update_change_fields(
        &self,
        regulation_id: &str,
        version_id: &str,
        change: &DetailedChange,
    ) -> Result<(), AppError> {
        sqlx::query(
            "UPDATE changes SET summary = ?, analysis = ?, change = ?, before_quote = ?, \
                    after_quote = ?, status = ? \
             WHERE regulation_id = ? AND version_id = ? AND id = ?",
        )
        .bind(&change.summary)
        .bind(&change.analysis)
        .bind(&change.change)
        .bind(&change.before_quote)
        .bind(&change.after_quote)
        .bind(change.status.as_str())
        .bind(regulation_id)
        .bind(version_id)
        .bind(&change.id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Append a comment to a change. Comments are append-only; there is no
    /// update or delete path.
    pub async fn add_comment(
        &self,
        regulation_id: &str,
        version_id: &str,
        change_id: &str,
        author: &str,
        content: &str,
    ) -> Result<Comment, AppError> {
        // Validates the id chain
        self.get_change(regulation_id, version_id, change_id).await?;

        let comment = Comment {
            id: uuid::Uuid::new_v4().to_string(),
            author: author.to_string(),
            content: content.to_string(),
            timestamp: Utc::now(),
        };

        sqlx::query(
            "INSERT INTO comments (id, change_id, author, content, timestamp) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&comment.id)
        .bind(change_id)
        .bind(&comment.author)
        .bind(&comment.content)
        .bind(comment.timestamp)
        .execute(&self.pool)
        .await?;

        Ok(comment)
    }

    // ==================== USER OPERATIONS ====================

    /// List all user accounts.
    pub async fn list_users(&self) -> Result<Vec<User>, AppError> {
        let rows = sqlx::query(
            "SELECT id, username, email, role, password_hash FROM users ORDER BY username",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(user_from_row).collect())
    }

    /// Look up a user by username, for login.
    pub async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        let row = sqlx::query(
            "SELECT id, username, email, role, password_hash FROM users WHERE username = ?",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(user_from_row))
    }

    /// Get a user by ID.
    pub async fn get_user(&self, id: &str) -> Result<Option<User>, AppError> {
        let row =
            sqlx::query("SELECT id, username, email, role, password_hash FROM users WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.as_ref().map(user_from_row))
    }

    /// Create a new user account.
    pub async fn create_user(
        &self,
        request: &CreateUserRequest,
        password_hash: &str,
    ) -> Result<User, AppError> {
        if self.find_user_by_username(&request.username).await?.is_some() {
            return Err(AppError::Validation("Username already exists".to_string()));
        }

        let user = User {
            id: uuid::Uuid::new_v4().to_string(),
            username: request.username.clone(),
            email: request.email.clone(),
            role: request.role,
            password_hash: password_hash.to_string(),
        };

        sqlx::query(
            "INSERT INTO users (id, username, email, role, password_hash) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&user.id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(user.role.as_str())
        .bind(&user.password_hash)
        .execute(&self.pool)
        .await?;

        Ok(user)
    }

    /// Edit username/email of an existing account.
    pub async fn update_user(
        &self,
        id: &str,
        request: &UpdateUserRequest,
    ) -> Result<User, AppError> {
        let existing = self
            .get_user(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", id)))?;

        let username = request.username.as_deref().unwrap_or(&existing.username);
        let email = request.email.as_deref().unwrap_or(&existing.email);

        sqlx::query("UPDATE users SET username = ?, email = ? WHERE id = ?")
            .bind(username)
            .bind(email)
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(User {
            username: username.to_string(),
            email: email.to_string(),
            ..existing
        })
    }

    /// Replace a user's password hash (admin reset).
    pub async fn reset_password(&self, id: &str, password_hash: &str) -> Result<(), AppError> {
        let result = sqlx::query("UPDATE users SET password_hash = ? WHERE id = ?")
            .bind(password_hash)
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("User {} not found", id)));
        }
        Ok(())
    }

    /// Delete a user account.
    pub async fn delete_user(&self, id: &str) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("User {} not found", id)));
        }
        Ok(())
    }

    // ==================== NOTIFICATION OPERATIONS ====================

    /// Record a notification visible to every user.
    pub async fn add_notification(&self, title: &str, message: &str) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO notifications (id, title, message, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(uuid::Uuid::new_v4().to_string())
        .bind(title)
        .bind(message)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// List notifications newest first, with the per-user seen flag.
    pub async fn list_notifications(
        &self,
        username: &str,
    ) -> Result<Vec<NotificationView>, AppError> {
        let rows = sqlx::query(
            "SELECT n.id, n.title, n.message, n.created_at, \
                    EXISTS(SELECT 1 FROM notification_seen s \
                           WHERE s.notification_id = n.id AND s.username = ?) AS seen \
             FROM notifications n ORDER BY n.created_at DESC",
        )
        .bind(username)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| NotificationView {
                id: row.get("id"),
                title: row.get("title"),
                message: row.get("message"),
                seen: row.get::<i64, _>("seen") != 0,
                created_at: row.get("created_at"),
            })
            .collect())
    }

    /// Mark a notification as seen by one user. Idempotent.
    pub async fn mark_notification_seen(
        &self,
        notification_id: &str,
        username: &str,
    ) -> Result<(), AppError> {
        let exists = sqlx::query("SELECT id FROM notifications WHERE id = ?")
            .bind(notification_id)
            .fetch_optional(&self.pool)
            .await?;
        if exists.is_none() {
            return Err(AppError::NotFound(format!(
                "Notification {} not found",
                notification_id
            )));
        }

        sqlx::query(
            "INSERT OR IGNORE INTO notification_seen (notification_id, username) VALUES (?, ?)",
        )
        .bind(notification_id)
        .bind(username)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

// ==================== ROW CONVERSIONS ====================

fn version_from_row(row: &sqlx::sqlite::SqliteRow) -> RegulationVersion {
    RegulationVersion {
        id: row.get("id"),
        version: row.get("version"),
        title: row.get("title"),
        upload_date: row.get("upload_date"),
        file_name: row.get("file_name"),
        object_key: row.get("object_key"),
        detailed_changes: Vec::new(),
    }
}

fn change_from_row(row: &sqlx::sqlite::SqliteRow) -> DetailedChange {
    // Missing or unknown stored status collapses to pending at load.
    let status = ChangeStatus::from_str(row.get("status")).unwrap_or(ChangeStatus::Pending);
    let classification = row
        .get::<Option<String>, _>("classification")
        .as_deref()
        .and_then(Classification::from_str);

    DetailedChange {
        id: row.get("id"),
        summary: row.get("summary"),
        analysis: row.get("analysis"),
        change: row.get("change"),
        before_quote: row.get("before_quote"),
        after_quote: row.get("after_quote"),
        change_type: row.get("change_type"),
        confidence: row.get("confidence"),
        status,
        classification,
        comments: Vec::new(),
    }
}

fn comment_from_row(row: &sqlx::sqlite::SqliteRow) -> Comment {
    Comment {
        id: row.get("id"),
        author: row.get("author"),
        content: row.get("content"),
        timestamp: row.get("timestamp"),
    }
}

fn user_from_row(row: &sqlx::sqlite::SqliteRow) -> User {
    User {
        id: row.get("id"),
        username: row.get("username"),
        email: row.get("email"),
        role: Role::from_str(row.get("role")).unwrap_or(Role::User),
        password_hash: row.get("password_hash"),
    }
}
