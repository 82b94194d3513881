//! Login and user administration endpoints. Thin pass-through: sessions are
//! held client-side, so login only verifies credentials and echoes the user.

use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::{json, Value};

use crate::auth;
use crate::errors::AppError;
use crate::models::{
    CreateUserRequest, LoginRequest, ResetPasswordRequest, UpdateUserRequest, UserResponse,
};
use crate::AppState;

/// POST /login - Verify credentials.
pub async fn login(
    State(state): State<AppState>,
    Json(credentials): Json<LoginRequest>,
) -> Result<Json<Value>, AppError> {
    let user = state
        .repo
        .find_user_by_username(&credentials.username)
        .await?;

    match user {
        Some(user) if auth::verify_password(&credentials.password, &user.password_hash) => {
            Ok(Json(json!({
                "message": "Login successful",
                "user": user.to_response()
            })))
        }
        _ => Err(AppError::Unauthorized(
            "Invalid username or password".to_string(),
        )),
    }
}

/// GET /users - List all accounts (admin).
pub async fn list_users(State(state): State<AppState>) -> Result<Json<Vec<UserResponse>>, AppError> {
    let users = state.repo.list_users().await?;
    Ok(Json(users.iter().map(|u| u.to_response()).collect()))
}

/// POST /users - Create a new account (admin).
pub async fn create_user(
    State(state): State<AppState>,
    Json(request): Json<CreateUserRequest>,
) -> Result<Json<UserResponse>, AppError> {
    if request.username.trim().is_empty() {
        return Err(AppError::Validation("Username is required".to_string()));
    }
    if request.password.trim().is_empty() {
        return Err(AppError::Validation("Password is required".to_string()));
    }

    let password_hash = auth::hash_password(&request.password);
    let user = state.repo.create_user(&request, &password_hash).await?;

    tracing::info!("Created user {} ({})", user.username, user.role.as_str());
    Ok(Json(user.to_response()))
}

/// PUT /users/{id} - Edit account details (admin).
pub async fn update_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<UpdateUserRequest>,
) -> Result<Json<UserResponse>, AppError> {
    let user = state.repo.update_user(&id, &request).await?;
    Ok(Json(user.to_response()))
}

/// PUT /users/{id}/reset-password - Replace a user's password (admin).
pub async fn reset_password(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<ResetPasswordRequest>,
) -> Result<Json<Value>, AppError> {
    if request.new_password.trim().is_empty() {
        return Err(AppError::Validation("Password is required".to_string()));
    }

    let password_hash = auth::hash_password(&request.new_password);
    state.repo.reset_password(&id, &password_hash).await?;

    Ok(Json(json!({ "message": "Password reset successfully" })))
}

/// DELETE /users/{id} - Delete an account (admin).
pub async fn delete_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    state.repo.delete_user(&id).await?;
    Ok(Json(json!({ "message": "User deleted successfully" })))
}
