//! Group handlers.
//!
//! A group is owned by the teacher who created it. The owner adds students by
//! id; other teachers join as co-teachers by accepting the group's share link.
//! Co-teachers may view the group and bind assignments to it, only the owner
//! changes it.

use crate::{
    auth::context::AuthContext,
    policy::{self, LinkMatch, Membership, Operation, Target},
    types::{
        now_ts, AddMembersRequest, AppError, Group, GroupList, GroupRequest, GroupView, Result,
        Role, UserProfile,
    },
    AppState,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

pub(crate) async fn load(state: &AppState, id: &str) -> Result<Group> {
    state
        .db
        .get_group(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Group not found".to_string()))
}

/// The caller's standing in a group. Anonymous callers are outsiders.
pub(crate) async fn standing(state: &AppState, group_id: &str, ctx: &AuthContext) -> Result<Membership> {
    match ctx.user_id() {
        Some(user_id) => Ok(Membership::from_role(
            state.db.group_role(group_id, user_id).await?,
        )),
        None => Ok(Membership::Outsider),
    }
}

async fn authorize_on(
    state: &AppState,
    ctx: &AuthContext,
    op: Operation,
    group: &Group,
) -> Result<()> {
    let membership = standing(state, &group.id, ctx).await?;
    let target = Target::owned_by(Some(group.owner_id.as_str())).with_membership(membership);
    policy::authorize(ctx, op, &target)?;
    Ok(())
}

/// Group with its members and share link, for the group's teachers.
async fn full_view(state: &AppState, group: Group) -> Result<GroupView> {
    let students = state.db.list_group_members(&group.id, Role::Student).await?;
    let teachers = state.db.list_group_members(&group.id, Role::Teacher).await?;
    let share_link = group.share_link.clone();

    let mut view = GroupView::summary(group);
    view.share_link = Some(share_link);
    view.students = Some(students.iter().map(UserProfile::from).collect());
    view.teachers = Some(teachers.iter().map(UserProfile::from).collect());
    Ok(view)
}

pub async fn create(
    State(state): State<AppState>,
    ctx: AuthContext,
    Json(payload): Json<GroupRequest>,
) -> Result<(StatusCode, Json<GroupView>)> {
    policy::authorize(&ctx, Operation::CreateGroup, &Target::default())?;
    payload.validate()?;
    let owner_id = ctx
        .user_id()
        .ok_or_else(|| AppError::Unauthorized("Authentication required".to_string()))?
        .to_string();

    let now = now_ts();
    let id = Uuid::new_v4().to_string();

    // Group shares are teacher invitations, so they take the teacher half of a link pair
    let group = state
        .links
        .with_unique_links(false, |links| {
            let group = Group {
                id: id.clone(),
                name: payload.name.trim().to_string(),
                owner_id: owner_id.clone(),
                share_link: links.teacher,
                created_at: now,
                updated_at: now,
            };
            let db = state.db.clone();
            async move {
                db.create_group(&group).await?;
                Ok(group)
            }
        })
        .await?;

    tracing::info!(id = %group.id, owner_id = %group.owner_id, "group created");

    Ok((StatusCode::CREATED, Json(full_view(&state, group).await?)))
}

/// Groups the caller owns or belongs to.
pub async fn list(State(state): State<AppState>, ctx: AuthContext) -> Result<Json<GroupList>> {
    policy::authorize(&ctx, Operation::ListGroups, &Target::default())?;
    let user_id = ctx
        .user_id()
        .ok_or_else(|| AppError::Unauthorized("Authentication required".to_string()))?;

    let items: Vec<GroupView> = state
        .db
        .list_groups_for_user(user_id)
        .await?
        .into_iter()
        .map(GroupView::summary)
        .collect();

    Ok(Json(GroupList {
        total: items.len(),
        items,
    }))
}

pub async fn get_one(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(id): Path<String>,
) -> Result<Json<GroupView>> {
    let group = load(&state, &id).await?;
    authorize_on(&state, &ctx, Operation::ViewGroup, &group).await?;

    Ok(Json(full_view(&state, group).await?))
}

pub async fn rename(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(id): Path<String>,
    Json(payload): Json<GroupRequest>,
) -> Result<Json<GroupView>> {
    let group = load(&state, &id).await?;
    authorize_on(&state, &ctx, Operation::ManageGroup, &group).await?;
    payload.validate()?;

    state.db.rename_group(&group.id, payload.name.trim()).await?;
    let updated = load(&state, &id).await?;

    Ok(Json(full_view(&state, updated).await?))
}

/// Delete a group. Refused while assignments are still bound to it.
pub async fn delete(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    let group = load(&state, &id).await?;
    authorize_on(&state, &ctx, Operation::ManageGroup, &group).await?;

    state.db.delete_group(&group.id).await?;
    tracing::info!(id = %group.id, "group deleted");

    Ok(StatusCode::NO_CONTENT)
}

/// Add students by id. Every id must name a student account; nothing is
/// added if one does not.
pub async fn add_members(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(id): Path<String>,
    Json(payload): Json<AddMembersRequest>,
) -> Result<Json<GroupView>> {
    let group = load(&state, &id).await?;
    authorize_on(&state, &ctx, Operation::ManageGroup, &group).await?;

    if payload.user_ids.is_empty() {
        return Err(AppError::InvalidInput("No users to add".to_string()));
    }

    for user_id in &payload.user_ids {
        let user = state
            .db
            .get_user_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::InvalidInput(format!("Unknown user {}", user_id)))?;
        if user.role != Role::Student {
            return Err(AppError::InvalidInput(format!(
                "User {} is not a student",
                user_id
            )));
        }
    }

    for user_id in &payload.user_ids {
        state
            .db
            .add_group_member(&group.id, user_id, Role::Student)
            .await?;
    }
    tracing::info!(id = %group.id, added = payload.user_ids.len(), "group members added");

    Ok(Json(full_view(&state, group).await?))
}

pub async fn remove_member(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path((id, user_id)): Path<(String, String)>,
) -> Result<StatusCode> {
    let group = load(&state, &id).await?;
    authorize_on(&state, &ctx, Operation::ManageGroup, &group).await?;

    state.db.remove_group_member(&group.id, &user_id).await?;
    tracing::info!(id = %group.id, user_id = %user_id, "group member removed");

    Ok(StatusCode::NO_CONTENT)
}

/// Join a group as co-teacher through its share link.
pub async fn accept_share(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(link): Path<String>,
) -> Result<Json<GroupView>> {
    let group = state
        .db
        .get_group_by_share_link(&link)
        .await?
        .ok_or_else(|| AppError::NotFound("Group not found".to_string()))?;

    let target = Target::owned_by(Some(group.owner_id.as_str())).with_link(LinkMatch::Teacher);
    policy::authorize(&ctx, Operation::AcceptGroupShare, &target)?;

    if let Some(user_id) = ctx.user_id() {
        if user_id != group.owner_id {
            state
                .db
                .add_group_member(&group.id, user_id, Role::Teacher)
                .await?;
            tracing::info!(id = %group.id, user_id = %user_id, "co-teacher joined group");
        }
    }

    Ok(Json(full_view(&state, group).await?))
}
