//! Token Authentication and Middleware
//!
//! This module provides the authentication core of the EduDesk API: dual
//! access/refresh tokens, password hashing and the per-request
//! authentication context.
//!
//! # Module Structure
//!
//! - [`auth::claims`](crate::auth::claims) - The claim set carried inside a token
//! - [`auth::jwt`](crate::auth::jwt) - Token signing and verification
//! - [`auth::service`](crate::auth::service) - Login, refresh and validation
//! - [`auth::context`](crate::auth::context) - Request-scoped authentication state
//! - [`auth::middleware`](crate::auth::middleware) - Axum middleware and extractors
//!
//! # Security Features
//!
//! - **Password Hashing**: Uses Argon2id (memory-hard) for secure password storage
//! - **Two Secrets**: Access and refresh tokens are signed with different
//!   secrets; the `kid` header selects which one verifies a token
//! - **No Revocation**: Tokens stay valid until they expire
//!
//! # Usage
//!
//! ## Token Issuance
//!
//! ```ignore
//! use edudesk::auth::jwt::TokenCodec;
//! use edudesk::auth::service::AuthService;
//!
//! let codec = TokenCodec::new(&access_secret, &refresh_secret);
//! let auth = AuthService::new(codec, Duration::minutes(60), Duration::minutes(180), users);
//! let pair = auth.login(&LoginRequest { email, password }).await?;
//! ```
//!
//! ## Middleware
//!
//! `auth_middleware` decodes the optional bearer token and stores an
//! [`AuthContext`](crate::auth::context::AuthContext) in the request
//! extensions. It never rejects a request by itself:
//!
//! ```ignore
//! let app = Router::new()
//!     .route("/homeworks", get(list))
//!     .layer(middleware::from_fn_with_state(auth_service, auth_middleware));
//! ```
//!
//! ## Extracting Identity in Handlers
//!
//! ```ignore
//! async fn handler(ctx: AuthContext) -> impl IntoResponse { /* optional auth */ }
//! async fn protected(AuthUser(claims): AuthUser) -> impl IntoResponse { /* required */ }
//! ```
//!
//! # Configuration
//!
//! Configure via `edudesk.toml`:
//! ```toml
//! [auth]
//! access_secret_env = "EDUDESK_ACCESS_SECRET"
//! refresh_secret_env = "EDUDESK_REFRESH_SECRET"
//! access_ttl_minutes = 60
//! refresh_ttl_minutes = 180
//! ```

/// Claim set and key kinds.
pub mod claims;
/// Request-scoped authentication state.
pub mod context;
/// Token signing and verification.
pub mod jwt;
/// Authentication middleware and extractors for protected routes.
pub mod middleware;
/// Login, refresh, validation and password services.
pub mod service;
