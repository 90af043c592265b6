//! Account handlers for the authenticated user.

use crate::{
    auth::middleware::AuthUser,
    types::{AppError, ChangePasswordRequest, Result, UserProfile},
    AppState,
};
use axum::{extract::State, http::StatusCode, Json};

/// Profile of the caller.
#[utoipa::path(
    get,
    path = "/api/users/me",
    responses(
        (status = 200, description = "Current user", body = UserProfile),
        (status = 401, description = "Authentication required")
    ),
    security(("bearer" = [])),
    tag = "users"
)]
pub async fn me(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
) -> Result<Json<UserProfile>> {
    let user = state
        .db
        .get_user_by_id(&claims.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    Ok(Json(UserProfile::from(&user)))
}

/// Change the caller's password. Existing tokens stay valid until they expire.
#[utoipa::path(
    patch,
    path = "/api/users/me/password",
    request_body = ChangePasswordRequest,
    responses(
        (status = 204, description = "Password changed"),
        (status = 401, description = "Wrong current password"),
        (status = 422, description = "New password too short")
    ),
    security(("bearer" = [])),
    tag = "users"
)]
pub async fn change_password(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<StatusCode> {
    let hash = state
        .auth_service
        .change_password(&claims, &payload.old_password, &payload.new_password)
        .await?;

    state.db.update_password(&claims.user_id, &hash).await?;
    tracing::info!(user_id = %claims.user_id, "password changed");

    Ok(StatusCode::NO_CONTENT)
}
