//! HTTP API Handlers and Routes
//!
//! This module provides the REST API layer for EduDesk, built on the Axum web framework.
//!
//! # Module Structure
//!
//! - [`api::handlers`](crate::api::handlers) - Request handlers for each endpoint
//! - [`api::routes`](crate::api::routes) - Route definitions and router configuration
//!
//! # API Endpoints
//!
//! ## Authentication (`/api/auth`)
//! - `POST /api/auth/register` - Register a teacher or student
//! - `POST /api/auth/login` - Login and receive an access/refresh token pair
//! - `POST /api/auth/refresh` - Exchange a refresh token for a new pair
//!
//! ## Account (`/api/users`)
//! - `GET /api/users/me` - Profile of the caller
//! - `PATCH /api/users/me/password` - Change password
//!
//! ## Assignments (`/api/homeworks`, `/api/quizzes`, `/api/attendances`)
//! - `GET /` - List own records (teacher)
//! - `POST /` - Create a record, returns both share links
//! - `GET|PATCH|DELETE /{id}` - Owner access by id
//! - `PATCH /attendances/{id}/renew` - Replace the attendance PIN
//! - `GET|PATCH|DELETE /shared/{link}/teacher` - Access through the teacher link
//! - `GET /shared/{link}/student` - Access through the student link
//! - `POST /shared/{link}/student/submissions` - Submit a response
//!
//! ## Groups (`/api/groups`)
//! - `GET|POST /api/groups` - Groups of the caller, create a group (teacher)
//! - `GET|PATCH|DELETE /api/groups/{id}` - View (group teachers), rename or delete (owner)
//! - `POST /api/groups/{id}/members` - Add students by id (owner)
//! - `DELETE /api/groups/{id}/members/{user_id}` - Remove a member (owner)
//! - `POST /api/groups/shared/{link}/accept` - Join as co-teacher
//!
//! An assignment created with a `group_id` only opens its student link to
//! the group's students.
//!
//! ## Submissions (`/api/submissions`)
//! - `GET /api/submissions` - The calling student's submissions
//! - `GET|PATCH|DELETE /api/submissions/{id}` - Read, edit or grade, delete
//!
//! # Authentication
//!
//! Credentials are optional at the transport level. When present they go in
//! the `Authorization` header:
//! ```text
//! Authorization: Bearer <access token>
//! ```
//! Whether a request is allowed is decided per operation by
//! [`policy::evaluate`](crate::policy::evaluate).
//!
//! # OpenAPI Documentation
//!
//! The OpenAPI document for the account endpoints is served at
//! `/api/openapi.json`.

/// Request and response handlers for all API endpoints.
pub mod handlers;
/// Router configuration and route definitions.
pub mod routes;

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

/// OpenAPI document for the authentication and account endpoints.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::auth::register,
        handlers::auth::login,
        handlers::auth::refresh_token,
        handlers::users::me,
        handlers::users::change_password,
    ),
    components(schemas(
        crate::types::Role,
        crate::types::LoginRequest,
        crate::types::RegisterRequest,
        crate::types::RegisterResponse,
        crate::types::RefreshRequest,
        crate::types::TokenResponse,
        crate::types::UserProfile,
        crate::types::ChangePasswordRequest,
    )),
    modifiers(&BearerAuth),
    tags(
        (name = "auth", description = "Login, registration and token refresh"),
        (name = "users", description = "Account of the authenticated user")
    )
)]
pub struct ApiDoc;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}
