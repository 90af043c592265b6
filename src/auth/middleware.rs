use crate::auth::claims::ClaimSet;
use crate::auth::context::AuthContext;
use crate::auth::service::AuthService;
use crate::types::AppError;
use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

/// Decodes the optional bearer token into an [`AuthContext`] stored in the
/// request extensions. Never rejects on its own; handlers decide through the
/// access policy.
pub async fn auth_middleware(
    State(auth_service): State<Arc<AuthService>>,
    mut req: Request,
    next: Next,
) -> Response {
    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let context = auth_service.authenticate(auth_header);
    req.extensions_mut().insert(context);

    next.run(req).await
}

// Extractors

impl<S> FromRequestParts<S> for AuthContext
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<AuthContext>()
            .cloned()
            .unwrap_or_default())
    }
}

/// Requires a valid access token.
pub struct AuthUser(pub ClaimSet);

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        match parts.extensions.get::<AuthContext>() {
            Some(AuthContext::Authenticated(claims)) => Ok(AuthUser(claims.clone())),
            Some(AuthContext::Rejected(err)) => Err(AppError::Token(err.clone())),
            _ => Err(AppError::Unauthorized("Authentication required".to_string())),
        }
    }
}
