use crate::{
    types::{
        now_ts, AppError, LoginRequest, RefreshRequest, RegisterRequest, RegisterResponse, Result,
        TokenResponse, User,
    },
    AppState,
};
use axum::{extract::State, http::StatusCode, Json};
use uuid::Uuid;

/// Register a new user
#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User registered successfully", body = RegisterResponse),
        (status = 409, description = "User already exists"),
        (status = 422, description = "Invalid input")
    ),
    tag = "auth"
)]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>)> {
    payload.validate()?;

    let email = payload.email.trim().to_lowercase();

    // Check if user exists
    if state.db.get_user_by_email(&email).await?.is_some() {
        return Err(AppError::Conflict("User already exists".to_string()));
    }

    // Hash password
    let password_hash = state.auth_service.hash_password(&payload.password)?;

    let now = now_ts();
    let user = User {
        id: Uuid::new_v4().to_string(),
        email,
        first_name: payload.first_name.trim().to_string(),
        last_name: payload.last_name.trim().to_string(),
        role: payload.role,
        password_hash,
        created_at: now,
        updated_at: now,
    };

    // A concurrent registration can still hit the unique index
    state.db.create_user(&user).await.map_err(|e| match e {
        AppError::Conflict(_) => AppError::Conflict("User already exists".to_string()),
        other => other,
    })?;

    tracing::info!(user_id = %user.id, role = %user.role, "user registered");

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            id: user.id,
            email: user.email,
            role: user.role,
        }),
    ))
}

/// Login with email and password
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = TokenResponse),
        (status = 401, description = "Incorrect password or email"),
        (status = 422, description = "Email or password missing")
    ),
    tag = "auth"
)]
pub async fn login(
    State(state): State<AppState>,
    Json(mut payload): Json<LoginRequest>,
) -> Result<Json<TokenResponse>> {
    payload.email = payload.email.trim().to_lowercase();
    let pair = state.auth_service.login(&payload).await?;
    Ok(Json(pair.into()))
}

/// Exchange a refresh token for a new token pair
#[utoipa::path(
    post,
    path = "/api/auth/refresh",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "New token pair", body = TokenResponse),
        (status = 400, description = "Malformed token or wrong token type"),
        (status = 401, description = "Expired or invalid refresh token")
    ),
    tag = "auth"
)]
pub async fn refresh_token(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> Result<Json<TokenResponse>> {
    if payload.refresh_token.is_empty() {
        return Err(AppError::InvalidInput("Refresh token required".to_string()));
    }

    let pair = state.auth_service.refresh(&payload.refresh_token).await?;
    Ok(Json(pair.into()))
}
