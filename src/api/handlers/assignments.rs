//! Homework, quiz and attendance handlers.
//!
//! The three kinds share one set of handlers; the router attaches the kind as
//! an [`Extension`]. Every handler asks the access policy before touching the
//! store, and renders the record according to the scope it was granted.

use super::groups;
use crate::{
    auth::context::AuthContext,
    policy::{self, LinkMatch, Membership, Operation, Scope, Target},
    types::{
        now_ts, AppError, Assignment, AssignmentKind, AssignmentList, AssignmentView,
        CreateAssignmentRequest, CreateSubmissionRequest, CreatedAssignment, PinResponse, Result,
        Role, Submission, UpdateAssignmentRequest,
    },
    AppState,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use uuid::Uuid;

/// Whether a caller with `scope` sees the submissions of `assignment`.
///
/// The teacher link of an owned record is a read-only share: its holders see
/// the record but not the students' work, which stays with the owner.
fn shows_submissions(assignment: &Assignment, scope: Option<Scope>) -> bool {
    match scope {
        None => true,
        Some(Scope::TeacherLink) => assignment.owner_id.is_none(),
        Some(Scope::StudentLink) => false,
    }
}

/// Renders an assignment for the granted scope. `None` means full access.
pub fn project(
    assignment: Assignment,
    scope: Option<Scope>,
    submissions: Vec<Submission>,
) -> AssignmentView {
    let submissions = shows_submissions(&assignment, scope).then_some(submissions);
    let (owner_id, student_link, teacher_link, pin) = match scope {
        None => (
            assignment.owner_id,
            Some(assignment.student_link),
            Some(assignment.teacher_link),
            assignment.pin,
        ),
        Some(Scope::TeacherLink) => (
            None,
            Some(assignment.student_link),
            Some(assignment.teacher_link),
            assignment.pin,
        ),
        Some(Scope::StudentLink) => (None, Some(assignment.student_link), None, None),
    };

    AssignmentView {
        id: assignment.id,
        kind: assignment.kind,
        title: assignment.title,
        content: assignment.content,
        course_title: assignment.course_title,
        max_grade: assignment.max_grade,
        mode: assignment.mode,
        group_id: assignment.group_id,
        created_at: assignment.created_at,
        updated_at: assignment.updated_at,
        owner_id,
        student_link,
        teacher_link,
        pin,
        submissions,
    }
}

async fn render(state: &AppState, assignment: Assignment, scope: Option<Scope>) -> Result<AssignmentView> {
    let submissions = if shows_submissions(&assignment, scope) {
        state.db.list_submissions_for_assignment(&assignment.id).await?
    } else {
        Vec::new()
    };
    Ok(project(assignment, scope, submissions))
}

async fn load(state: &AppState, kind: AssignmentKind, id: &str) -> Result<Assignment> {
    state
        .db
        .get_assignment(kind, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("{} not found", kind.as_str())))
}

/// Loads the assignment behind `link` and reports which link it was.
async fn load_by_link(
    state: &AppState,
    kind: AssignmentKind,
    link: &str,
) -> Result<(Assignment, LinkMatch)> {
    let assignment = state
        .db
        .get_assignment_by_link(kind, link)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("{} not found", kind.as_str())))?;

    let matched = policy::match_link(Some(link), &assignment.student_link, &assignment.teacher_link);
    Ok((assignment, matched))
}

/// Only the link a route expects counts as a match.
fn expect_link(matched: LinkMatch, expected: LinkMatch) -> LinkMatch {
    if matched == expected {
        matched
    } else {
        LinkMatch::None
    }
}

fn target_for(assignment: &Assignment, link: LinkMatch) -> Target<'_> {
    Target::owned_by(assignment.owner_id.as_deref())
        .with_link(link)
        .with_mode(assignment.mode)
}

/// The caller's standing in the group the assignment is bound to.
async fn membership(state: &AppState, assignment: &Assignment, ctx: &AuthContext) -> Result<Membership> {
    match assignment.group_id.as_deref() {
        Some(group_id) => groups::standing(state, group_id, ctx).await,
        None => Ok(Membership::Unrestricted),
    }
}

/// List the caller's own assignments of this kind.
pub async fn list(
    State(state): State<AppState>,
    Extension(kind): Extension<AssignmentKind>,
    ctx: AuthContext,
) -> Result<Json<AssignmentList>> {
    policy::authorize(&ctx, Operation::List, &Target::default())?;
    let owner_id = ctx
        .user_id()
        .ok_or_else(|| AppError::Unauthorized("Authentication required".to_string()))?;

    let items: Vec<AssignmentView> = state
        .db
        .list_assignments(kind, owner_id)
        .await?
        .into_iter()
        .map(|a| project(a, None, Vec::new()))
        .map(|mut view| {
            view.submissions = None;
            view
        })
        .collect();

    Ok(Json(AssignmentList {
        total: items.len(),
        items,
    }))
}

/// Create an assignment. Anonymous callers get an ownerless record managed
/// only through its teacher link.
pub async fn create(
    State(state): State<AppState>,
    Extension(kind): Extension<AssignmentKind>,
    ctx: AuthContext,
    Json(payload): Json<CreateAssignmentRequest>,
) -> Result<(StatusCode, Json<CreatedAssignment>)> {
    let scope = policy::authorize(&ctx, Operation::Create, &Target::default())?;
    payload.validate()?;

    if let Some(group_id) = payload.group_id.as_deref() {
        let group = groups::load(&state, group_id).await?;
        let standing = groups::standing(&state, &group.id, &ctx).await?;
        let target = Target::owned_by(Some(group.owner_id.as_str())).with_membership(standing);
        policy::authorize(&ctx, Operation::UseGroup, &target)?;
    }

    let owner_id = match scope {
        None => ctx.user_id().map(str::to_string),
        Some(_) => None,
    };

    let now = now_ts();
    let id = Uuid::new_v4().to_string();

    let assignment = state
        .links
        .with_unique_links(kind.uses_pin(), |links| {
            let assignment = Assignment {
                id: id.clone(),
                kind,
                title: payload.title.trim().to_string(),
                content: payload.content.clone(),
                course_title: payload.course_title.clone(),
                max_grade: payload.max_grade,
                mode: payload.mode,
                owner_id: owner_id.clone(),
                group_id: payload.group_id.clone(),
                student_link: links.student,
                teacher_link: links.teacher,
                pin: links.pin,
                created_at: now,
                updated_at: now,
            };
            let db = state.db.clone();
            async move {
                db.create_assignment(&assignment).await?;
                Ok(assignment)
            }
        })
        .await?;

    tracing::info!(
        id = %assignment.id,
        kind = kind.as_str(),
        owned = assignment.owner_id.is_some(),
        "assignment created"
    );

    Ok((
        StatusCode::CREATED,
        Json(CreatedAssignment {
            id: assignment.id,
            kind,
            student_link: assignment.student_link,
            teacher_link: assignment.teacher_link,
            pin: assignment.pin,
        }),
    ))
}

/// Read an owned assignment by id.
pub async fn get_one(
    State(state): State<AppState>,
    Extension(kind): Extension<AssignmentKind>,
    ctx: AuthContext,
    Path(id): Path<String>,
) -> Result<Json<AssignmentView>> {
    let assignment = load(&state, kind, &id).await?;
    let scope = policy::authorize(&ctx, Operation::Read, &target_for(&assignment, LinkMatch::None))?;

    Ok(Json(render(&state, assignment, scope).await?))
}

/// Update an owned assignment by id.
pub async fn update(
    State(state): State<AppState>,
    Extension(kind): Extension<AssignmentKind>,
    ctx: AuthContext,
    Path(id): Path<String>,
    Json(payload): Json<UpdateAssignmentRequest>,
) -> Result<Json<AssignmentView>> {
    let assignment = load(&state, kind, &id).await?;
    let scope = policy::authorize(&ctx, Operation::Update, &target_for(&assignment, LinkMatch::None))?;
    payload.validate()?;

    state.db.update_assignment(&assignment.id, &payload).await?;
    let updated = load(&state, kind, &id).await?;

    Ok(Json(render(&state, updated, scope).await?))
}

/// Delete an owned assignment and its submissions.
pub async fn delete(
    State(state): State<AppState>,
    Extension(kind): Extension<AssignmentKind>,
    ctx: AuthContext,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    let assignment = load(&state, kind, &id).await?;
    policy::authorize(&ctx, Operation::Delete, &target_for(&assignment, LinkMatch::None))?;

    state.db.delete_assignment(&assignment.id).await?;
    tracing::info!(id = %assignment.id, kind = kind.as_str(), "assignment deleted");

    Ok(StatusCode::NO_CONTENT)
}

/// Replace the attendance PIN. The previous PIN stops working immediately.
pub async fn renew_pin(
    State(state): State<AppState>,
    Extension(kind): Extension<AssignmentKind>,
    ctx: AuthContext,
    Path(id): Path<String>,
) -> Result<Json<PinResponse>> {
    if !kind.uses_pin() {
        return Err(AppError::InvalidInput(format!(
            "{} records have no PIN",
            kind.as_str()
        )));
    }

    let assignment = load(&state, kind, &id).await?;
    policy::authorize(&ctx, Operation::RenewPin, &target_for(&assignment, LinkMatch::None))?;

    let pin = state.links.new_pin();
    state.db.set_pin(&assignment.id, &pin).await?;

    Ok(Json(PinResponse { pin }))
}

/// View a record through its teacher link.
pub async fn shared_teacher(
    State(state): State<AppState>,
    Extension(kind): Extension<AssignmentKind>,
    ctx: AuthContext,
    Path(link): Path<String>,
) -> Result<Json<AssignmentView>> {
    let (assignment, matched) = load_by_link(&state, kind, &link).await?;
    let target = target_for(&assignment, expect_link(matched, LinkMatch::Teacher));
    let scope = policy::authorize(&ctx, Operation::ViewShared, &target)?;

    Ok(Json(render(&state, assignment, scope).await?))
}

/// Update a record through its teacher link.
pub async fn shared_teacher_update(
    State(state): State<AppState>,
    Extension(kind): Extension<AssignmentKind>,
    ctx: AuthContext,
    Path(link): Path<String>,
    Json(payload): Json<UpdateAssignmentRequest>,
) -> Result<Json<AssignmentView>> {
    let (assignment, matched) = load_by_link(&state, kind, &link).await?;
    let target = target_for(&assignment, expect_link(matched, LinkMatch::Teacher));
    let scope = policy::authorize(&ctx, Operation::ManageShared, &target)?;
    payload.validate()?;

    state.db.update_assignment(&assignment.id, &payload).await?;
    let updated = load(&state, kind, &assignment.id).await?;

    Ok(Json(render(&state, updated, scope).await?))
}

/// Delete a record through its teacher link.
pub async fn shared_teacher_delete(
    State(state): State<AppState>,
    Extension(kind): Extension<AssignmentKind>,
    ctx: AuthContext,
    Path(link): Path<String>,
) -> Result<StatusCode> {
    let (assignment, matched) = load_by_link(&state, kind, &link).await?;
    let target = target_for(&assignment, expect_link(matched, LinkMatch::Teacher));
    policy::authorize(&ctx, Operation::ManageShared, &target)?;

    state.db.delete_assignment(&assignment.id).await?;
    tracing::info!(id = %assignment.id, kind = kind.as_str(), "assignment deleted via link");

    Ok(StatusCode::NO_CONTENT)
}

/// View a record through its student link.
pub async fn shared_student(
    State(state): State<AppState>,
    Extension(kind): Extension<AssignmentKind>,
    ctx: AuthContext,
    Path(link): Path<String>,
) -> Result<Json<AssignmentView>> {
    let (assignment, matched) = load_by_link(&state, kind, &link).await?;
    let standing = membership(&state, &assignment, &ctx).await?;
    let target = target_for(&assignment, expect_link(matched, LinkMatch::Student))
        .with_membership(standing);
    let scope = policy::authorize(&ctx, Operation::ViewShared, &target)?;

    Ok(Json(render(&state, assignment, scope).await?))
}

/// Submit a response through the student link.
///
/// Registered students are recorded by id and name. Anonymous callers must
/// give a name. Attendance submissions must carry the current PIN. Group
/// assignments only take submissions from the group's students.
pub async fn submit(
    State(state): State<AppState>,
    Extension(kind): Extension<AssignmentKind>,
    ctx: AuthContext,
    Path(link): Path<String>,
    Json(payload): Json<CreateSubmissionRequest>,
) -> Result<(StatusCode, Json<Submission>)> {
    let (assignment, matched) = load_by_link(&state, kind, &link).await?;
    let standing = membership(&state, &assignment, &ctx).await?;
    let target = target_for(&assignment, expect_link(matched, LinkMatch::Student))
        .with_membership(standing);
    policy::authorize(&ctx, Operation::Submit, &target)?;

    let present = match (kind.uses_pin(), assignment.pin.as_deref()) {
        (true, Some(expected)) => {
            if payload.pin.as_deref().map(str::trim) != Some(expected) {
                tracing::warn!(id = %assignment.id, "attendance submitted with wrong PIN");
                return Err(AppError::InvalidInput("Invalid PIN".to_string()));
            }
            true
        }
        _ => false,
    };

    let (student_id, student_name) = match ctx.claims() {
        Some(claims) if claims.role == Role::Student => {
            let user = state
                .db
                .get_user_by_id(&claims.user_id)
                .await?
                .ok_or_else(|| AppError::Unauthorized("User no longer exists".to_string()))?;
            let name = user.full_name();
            let name = if name.is_empty() { user.email.clone() } else { name };
            (Some(user.id), name)
        }
        _ => {
            let name = payload
                .student_name
                .as_deref()
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .ok_or_else(|| AppError::InvalidInput("Student name required".to_string()))?;
            (None, name.to_string())
        }
    };

    let now = now_ts();
    let submission = Submission {
        id: Uuid::new_v4().to_string(),
        assignment_id: assignment.id.clone(),
        student_id,
        student_name,
        response: payload.response,
        present,
        grade: None,
        comments: String::new(),
        submitted_at: now,
        updated_at: now,
    };

    state.db.create_submission(&submission).await?;
    tracing::info!(
        id = %submission.id,
        assignment_id = %assignment.id,
        registered = submission.student_id.is_some(),
        "submission received"
    );

    Ok((StatusCode::CREATED, Json(submission)))
}
