//! Access decisions for assignments and submissions.
//!
//! Role-based rules (teacher / student / anonymous) are layered with
//! capability links: holding a record's student or teacher link grants the
//! access that link implies, even without an account. An assignment bound to
//! a group narrows its student link to the group's members. Every handler
//! goes through [`evaluate`] before touching the store.
//!
//! The decision is a pure function of the caller, the operation and a
//! [`Target`] describing the record, so the whole table is unit tested here
//! without a database.

use crate::auth::context::AuthContext;
use crate::types::{AppError, Mode, Result, Role};

/// Operations gated by the policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Create an assignment
    Create,
    /// List the caller's own assignments
    List,
    /// Read an assignment by id
    Read,
    /// Update an assignment by id
    Update,
    /// Delete an assignment by id
    Delete,
    /// Replace the attendance PIN
    RenewPin,
    /// View an assignment through a shared link
    ViewShared,
    /// Update or delete an assignment through its teacher link
    ManageShared,
    /// Submit through the student link
    Submit,
    /// List the caller's own submissions
    ListSubmissions,
    ReadSubmission,
    GradeSubmission,
    EditSubmission,
    DeleteSubmission,
    CreateGroup,
    /// List the groups the caller owns or belongs to
    ListGroups,
    /// See a group with its members and share link
    ViewGroup,
    /// Rename or delete a group, add or remove students
    ManageGroup,
    /// Bind a new assignment to a group
    UseGroup,
    /// Join a group as co-teacher through its share link
    AcceptGroupShare,
}

/// Which of the record's links the request presented, if any.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LinkMatch {
    #[default]
    None,
    Student,
    Teacher,
}

/// Restricted view granted by a link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    StudentLink,
    TeacherLink,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    AllowScoped(Scope),
    Deny(&'static str),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        !matches!(self, Decision::Deny(_))
    }
}

/// The caller's standing in the group a record belongs to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Membership {
    /// The record is not bound to a group
    #[default]
    Unrestricted,
    Student,
    Teacher,
    Outsider,
}

impl Membership {
    /// Standing derived from an optional member role.
    pub fn from_role(role: Option<Role>) -> Self {
        match role {
            Some(Role::Student) => Membership::Student,
            Some(Role::Teacher) => Membership::Teacher,
            None => Membership::Outsider,
        }
    }
}

/// The record an operation is aimed at.
#[derive(Debug, Clone, Copy, Default)]
pub struct Target<'a> {
    /// Owning teacher of the assignment or group; `None` for anonymously created records
    pub owner_id: Option<&'a str>,
    pub link: LinkMatch,
    pub mode: Mode,
    /// Author of the submission, for submission operations
    pub submitter_id: Option<&'a str>,
    pub membership: Membership,
}

impl<'a> Target<'a> {
    pub fn owned_by(owner_id: Option<&'a str>) -> Self {
        Self {
            owner_id,
            ..Self::default()
        }
    }

    pub fn with_link(mut self, link: LinkMatch) -> Self {
        self.link = link;
        self
    }

    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_submitter(mut self, submitter_id: Option<&'a str>) -> Self {
        self.submitter_id = submitter_id;
        self
    }

    pub fn with_membership(mut self, membership: Membership) -> Self {
        self.membership = membership;
        self
    }
}

/// Who is asking. [`evaluate`] sees a rejected token as anonymous;
/// [`authorize`] refuses it before the table is consulted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Caller<'a> {
    Anonymous,
    Student(&'a str),
    Teacher(&'a str),
}

impl<'a> From<&'a AuthContext> for Caller<'a> {
    fn from(ctx: &'a AuthContext) -> Self {
        match ctx.claims() {
            Some(claims) => match claims.role {
                Role::Teacher => Caller::Teacher(&claims.user_id),
                Role::Student => Caller::Student(&claims.user_id),
            },
            None => Caller::Anonymous,
        }
    }
}

fn allow() -> Decision {
    Decision::Allow
}

fn scoped(scope: Scope) -> Decision {
    Decision::AllowScoped(scope)
}

fn deny(reason: &'static str) -> Decision {
    Decision::Deny(reason)
}

fn is_owner(user_id: &str, target: &Target<'_>) -> bool {
    target.owner_id == Some(user_id)
}

fn is_submitter(user_id: &str, target: &Target<'_>) -> bool {
    target.submitter_id == Some(user_id)
}

/// Decides whether `ctx` may perform `op` on `target`.
pub fn evaluate(ctx: &AuthContext, op: Operation, target: &Target<'_>) -> Decision {
    let caller = Caller::from(ctx);

    match op {
        Operation::Create => match caller {
            Caller::Anonymous => scoped(Scope::TeacherLink),
            Caller::Student(_) => deny("students cannot create assignments"),
            Caller::Teacher(_) => allow(),
        },

        Operation::List => match caller {
            Caller::Teacher(_) => allow(),
            _ => deny("only teachers have assignment lists"),
        },

        Operation::Read | Operation::Update | Operation::Delete | Operation::RenewPin => {
            match caller {
                Caller::Teacher(uid) if is_owner(uid, target) => allow(),
                _ => deny("not the owner of this assignment"),
            }
        }

        Operation::ViewShared => view_shared(caller, target),
        Operation::ManageShared => manage_shared(caller, target),
        Operation::Submit => submit(caller, target),

        Operation::ListSubmissions => match caller {
            Caller::Student(_) => allow(),
            _ => deny("only students have submission lists"),
        },

        Operation::ReadSubmission => match caller {
            Caller::Student(uid) if is_submitter(uid, target) => allow(),
            Caller::Teacher(uid) if is_owner(uid, target) => allow(),
            Caller::Anonymous if ownerless_teacher_link(target) => scoped(Scope::TeacherLink),
            _ => deny("no access to this submission"),
        },

        Operation::GradeSubmission => match caller {
            Caller::Teacher(uid) if is_owner(uid, target) => allow(),
            Caller::Anonymous if ownerless_teacher_link(target) => scoped(Scope::TeacherLink),
            _ => deny("only the assignment owner can grade"),
        },

        Operation::EditSubmission => match caller {
            Caller::Student(uid) if is_submitter(uid, target) => allow(),
            _ => deny("only the submitter can edit a submission"),
        },

        Operation::DeleteSubmission => match caller {
            Caller::Student(uid) if is_submitter(uid, target) => allow(),
            Caller::Teacher(uid) if is_owner(uid, target) => allow(),
            _ => deny("no access to this submission"),
        },

        Operation::CreateGroup => match caller {
            Caller::Teacher(_) => allow(),
            _ => deny("only teachers create groups"),
        },

        Operation::ListGroups => match caller {
            Caller::Anonymous => deny("authentication required"),
            _ => allow(),
        },

        Operation::ViewGroup | Operation::UseGroup => match caller {
            Caller::Teacher(uid) if is_owner(uid, target) => allow(),
            Caller::Teacher(_) if target.membership == Membership::Teacher => allow(),
            _ => deny("not a teacher of this group"),
        },

        Operation::ManageGroup => match caller {
            Caller::Teacher(uid) if is_owner(uid, target) => allow(),
            _ => deny("only the group owner can manage it"),
        },

        Operation::AcceptGroupShare => match (target.link, caller) {
            (LinkMatch::Teacher, Caller::Teacher(_)) => allow(),
            (LinkMatch::Teacher, _) => deny("only teachers can join as co-teachers"),
            _ => deny("share link does not match"),
        },
    }
}

/// Students outside the group an assignment is bound to may not use its
/// student link, whether or not they have an account.
fn outside_group(target: &Target<'_>) -> bool {
    target.membership == Membership::Outsider
}

fn ownerless_teacher_link(target: &Target<'_>) -> bool {
    target.owner_id.is_none() && target.link == LinkMatch::Teacher
}

fn view_shared(caller: Caller<'_>, target: &Target<'_>) -> Decision {
    match (target.link, caller) {
        (LinkMatch::None, _) => deny("link does not match"),

        (LinkMatch::Teacher, Caller::Anonymous) => scoped(Scope::TeacherLink),
        (LinkMatch::Teacher, Caller::Student(_)) => deny("students cannot use teacher links"),
        (LinkMatch::Teacher, Caller::Teacher(uid)) if is_owner(uid, target) => allow(),
        (LinkMatch::Teacher, Caller::Teacher(_)) => scoped(Scope::TeacherLink),

        (LinkMatch::Student, Caller::Anonymous | Caller::Student(_)) if outside_group(target) => {
            deny("not a member of this group")
        }
        (LinkMatch::Student, Caller::Anonymous | Caller::Student(_)) => {
            scoped(Scope::StudentLink)
        }
        (LinkMatch::Student, Caller::Teacher(uid)) if is_owner(uid, target) => allow(),
        (LinkMatch::Student, Caller::Teacher(_)) => {
            deny("teachers cannot view other teachers' student links")
        }
    }
}

fn manage_shared(caller: Caller<'_>, target: &Target<'_>) -> Decision {
    if target.link != LinkMatch::Teacher {
        return deny("teacher link required");
    }

    match (target.owner_id, caller) {
        (Some(_), Caller::Teacher(uid)) if is_owner(uid, target) => allow(),
        (Some(_), _) => deny("owned assignments are managed by their owner"),
        (None, Caller::Student(_)) => deny("students cannot use teacher links"),
        (None, Caller::Anonymous | Caller::Teacher(_)) => scoped(Scope::TeacherLink),
    }
}

fn submit(caller: Caller<'_>, target: &Target<'_>) -> Decision {
    if target.link != LinkMatch::Student {
        return deny("student link required");
    }

    match caller {
        Caller::Anonymous | Caller::Student(_) if outside_group(target) => {
            deny("not a member of this group")
        }
        Caller::Anonymous => match target.mode {
            Mode::All => scoped(Scope::StudentLink),
            Mode::Registered => deny("this assignment requires a registered student"),
        },
        Caller::Student(_) => allow(),
        Caller::Teacher(_) => deny("teachers cannot submit"),
    }
}

/// Evaluates the policy and turns a denial into an error.
///
/// Returns the granted scope, `None` meaning full access. A request whose
/// token failed verification is refused with that token error on every
/// operation, including those open to anonymous callers, so an expired
/// session never degrades into anonymous access.
pub fn authorize(ctx: &AuthContext, op: Operation, target: &Target<'_>) -> Result<Option<Scope>> {
    if let Some(err) = ctx.rejection() {
        tracing::debug!(operation = ?op, error = %err, "rejected token");
        return Err(AppError::Token(err.clone()));
    }

    match evaluate(ctx, op, target) {
        Decision::Allow => Ok(None),
        Decision::AllowScoped(scope) => Ok(Some(scope)),
        Decision::Deny(reason) => {
            tracing::debug!(operation = ?op, reason, "access denied");
            Err(AppError::Unauthorized(reason.to_string()))
        }
    }
}

/// Classifies a presented link against a record's two links.
pub fn match_link(presented: Option<&str>, student_link: &str, teacher_link: &str) -> LinkMatch {
    match presented {
        Some(link) if link == teacher_link => LinkMatch::Teacher,
        Some(link) if link == student_link => LinkMatch::Student,
        _ => LinkMatch::None,
    }
}
