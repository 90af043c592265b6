//! Submission handlers.
//!
//! Access to a submission follows its assignment: the assignment owner may
//! read, grade and delete it, the submitting student may read, edit and
//! delete it, and the teacher link of an ownerless assignment (passed as
//! `?link=`) grants read and grade access.

use crate::{
    auth::context::AuthContext,
    policy::{self, Operation, Target},
    types::{
        AppError, Assignment, LinkQuery, Result, Submission, SubmissionList,
        UpdateSubmissionRequest,
    },
    AppState,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

async fn load(state: &AppState, id: &str) -> Result<(Submission, Assignment)> {
    let submission = state
        .db
        .get_submission(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Submission not found".to_string()))?;

    let assignment = state
        .db
        .get_assignment_any(&submission.assignment_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Assignment not found".to_string()))?;

    Ok((submission, assignment))
}

fn target_for<'a>(
    submission: &'a Submission,
    assignment: &'a Assignment,
    link: Option<&str>,
) -> Target<'a> {
    let matched = policy::match_link(link, &assignment.student_link, &assignment.teacher_link);
    Target::owned_by(assignment.owner_id.as_deref())
        .with_link(matched)
        .with_mode(assignment.mode)
        .with_submitter(submission.student_id.as_deref())
}

/// List the calling student's submissions.
pub async fn list_own(
    State(state): State<AppState>,
    ctx: AuthContext,
) -> Result<Json<SubmissionList>> {
    policy::authorize(&ctx, Operation::ListSubmissions, &Target::default())?;
    let student_id = ctx
        .user_id()
        .ok_or_else(|| AppError::Unauthorized("Authentication required".to_string()))?;

    let items = state.db.list_submissions_for_student(student_id).await?;
    Ok(Json(SubmissionList {
        total: items.len(),
        items,
    }))
}

pub async fn get_one(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(id): Path<String>,
    Query(query): Query<LinkQuery>,
) -> Result<Json<Submission>> {
    let (submission, assignment) = load(&state, &id).await?;
    let target = target_for(&submission, &assignment, query.link.as_deref());
    policy::authorize(&ctx, Operation::ReadSubmission, &target)?;

    Ok(Json(submission))
}

/// Edit a response (submitter) or grade it (assignment owner or teacher link).
pub async fn update(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(id): Path<String>,
    Query(query): Query<LinkQuery>,
    Json(payload): Json<UpdateSubmissionRequest>,
) -> Result<Json<Submission>> {
    let (submission, assignment) = load(&state, &id).await?;
    let target = target_for(&submission, &assignment, query.link.as_deref());

    if payload.response.is_none() && !payload.touches_grading() {
        return Err(AppError::InvalidInput("Nothing to update".to_string()));
    }
    if payload.response.is_some() {
        policy::authorize(&ctx, Operation::EditSubmission, &target)?;
    }
    if payload.touches_grading() {
        policy::authorize(&ctx, Operation::GradeSubmission, &target)?;
    }

    if let Some(grade) = payload.grade {
        if !(0.0..=assignment.max_grade).contains(&grade) {
            return Err(AppError::InvalidInput(format!(
                "Grade must be between 0 and {}",
                assignment.max_grade
            )));
        }
    }

    state.db.update_submission(&submission.id, &payload).await?;

    let updated = state
        .db
        .get_submission(&submission.id)
        .await?
        .ok_or_else(|| AppError::NotFound("Submission not found".to_string()))?;

    Ok(Json(updated))
}

pub async fn delete(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    let (submission, assignment) = load(&state, &id).await?;
    let target = target_for(&submission, &assignment, None);
    policy::authorize(&ctx, Operation::DeleteSubmission, &target)?;

    state.db.delete_submission(&submission.id).await?;
    Ok(StatusCode::NO_CONTENT)
}
