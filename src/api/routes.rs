use crate::api::handlers::{assignments, auth, groups, submissions, users};
use crate::api::ApiDoc;
use crate::auth::middleware::auth_middleware;
use crate::types::AssignmentKind;
use crate::AppState;
use axum::{
    middleware,
    routing::{get, patch, post},
    Extension, Json, Router,
};
use utoipa::OpenApi;

/// Routes shared by homeworks, quizzes and attendances.
fn assignment_routes(kind: AssignmentKind) -> Router<AppState> {
    let mut router = Router::new()
        .route("/", get(assignments::list).post(assignments::create))
        .route(
            "/{id}",
            get(assignments::get_one)
                .patch(assignments::update)
                .delete(assignments::delete),
        )
        .route(
            "/shared/{link}/teacher",
            get(assignments::shared_teacher)
                .patch(assignments::shared_teacher_update)
                .delete(assignments::shared_teacher_delete),
        )
        .route("/shared/{link}/student", get(assignments::shared_student))
        .route(
            "/shared/{link}/student/submissions",
            post(assignments::submit),
        );

    if kind.uses_pin() {
        router = router.route("/{id}/renew", patch(assignments::renew_pin));
    }

    router.layer(Extension(kind))
}

fn group_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(groups::list).post(groups::create))
        .route(
            "/{id}",
            get(groups::get_one)
                .patch(groups::rename)
                .delete(groups::delete),
        )
        .route("/{id}/members", post(groups::add_members))
        .route(
            "/{id}/members/{user_id}",
            axum::routing::delete(groups::remove_member),
        )
        .route("/shared/{link}/accept", post(groups::accept_share))
}

/// Routes mounted under `/api`.
pub fn create_router(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/refresh", post(auth::refresh_token))
        .route("/users/me", get(users::me))
        .route("/users/me/password", patch(users::change_password))
        .nest("/homeworks", assignment_routes(AssignmentKind::Homework))
        .nest("/quizzes", assignment_routes(AssignmentKind::Quiz))
        .nest("/attendances", assignment_routes(AssignmentKind::Attendance))
        .nest("/groups", group_routes())
        .route("/submissions", get(submissions::list_own))
        .route(
            "/submissions/{id}",
            get(submissions::get_one)
                .patch(submissions::update)
                .delete(submissions::delete),
        )
        .route("/openapi.json", get(|| async { Json(ApiDoc::openapi()) }))
        // Optional authentication: every route sees an AuthContext
        .layer(middleware::from_fn_with_state(
            state.auth_service.clone(),
            auth_middleware,
        ))
}

/// Full application router with state applied.
pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .nest("/api", create_router(&state))
        .with_state(state)
}
