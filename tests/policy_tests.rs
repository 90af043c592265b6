//! Access decision table tests
//!
//! One case per cell of the decision table. `t1` owns the assignment, `t2`
//! is another teacher, `s1` is the submitting student and `s2` another
//! student.

use chrono::{Duration, Utc};
use edudesk::{
    auth::{
        claims::{ClaimSet, KeyKind},
        context::AuthContext,
        jwt::TokenError,
    },
    policy::{authorize, evaluate, Decision, LinkMatch, Membership, Operation, Scope, Target},
    types::{AppError, Mode, Role},
};
use rstest::rstest;

#[derive(Debug, Clone, Copy)]
enum Who {
    Anonymous,
    Owner,
    OtherTeacher,
    Submitter,
    OtherStudent,
}

fn context(who: Who) -> AuthContext {
    let (uid, role) = match who {
        Who::Anonymous => return AuthContext::Anonymous,
        Who::Owner => ("t1", Role::Teacher),
        Who::OtherTeacher => ("t2", Role::Teacher),
        Who::Submitter => ("s1", Role::Student),
        Who::OtherStudent => ("s2", Role::Student),
    };

    AuthContext::Authenticated(ClaimSet::new(
        format!("{uid}@example.com"),
        uid,
        role,
        KeyKind::Access,
        Utc::now(),
        Duration::minutes(60),
    ))
}

fn owned() -> Target<'static> {
    Target::owned_by(Some("t1")).with_submitter(Some("s1"))
}

fn ownerless() -> Target<'static> {
    Target::owned_by(None).with_submitter(Some("s1"))
}

const ALLOW: Decision = Decision::Allow;
const STUDENT_SCOPE: Decision = Decision::AllowScoped(Scope::StudentLink);
const TEACHER_SCOPE: Decision = Decision::AllowScoped(Scope::TeacherLink);

fn assert_decision(actual: Decision, expected: Option<Decision>) {
    match expected {
        Some(expected) => assert_eq!(actual, expected),
        None => assert!(!actual.is_allowed(), "expected deny, got {:?}", actual),
    }
}

#[rstest]
#[case::anonymous(Who::Anonymous, Some(TEACHER_SCOPE))]
#[case::student(Who::Submitter, None)]
#[case::teacher(Who::Owner, Some(ALLOW))]
fn test_create(#[case] who: Who, #[case] expected: Option<Decision>) {
    assert_decision(
        evaluate(&context(who), Operation::Create, &Target::default()),
        expected,
    );
}

#[rstest]
#[case::anonymous(Who::Anonymous, false)]
#[case::student(Who::Submitter, false)]
#[case::teacher(Who::Owner, true)]
fn test_list_own(#[case] who: Who, #[case] allowed: bool) {
    assert_eq!(
        evaluate(&context(who), Operation::List, &Target::default()).is_allowed(),
        allowed
    );
}

#[rstest]
fn test_by_id_operations_owner_only(
    #[values(Operation::Read, Operation::Update, Operation::Delete, Operation::RenewPin)]
    op: Operation,
    #[values(Who::Anonymous, Who::Owner, Who::OtherTeacher, Who::Submitter)] who: Who,
) {
    let decision = evaluate(&context(who), op, &owned());
    assert_eq!(decision.is_allowed(), matches!(who, Who::Owner), "{op:?} by {who:?}");
}

#[rstest]
#[case::anonymous(Who::Anonymous, Some(TEACHER_SCOPE))]
#[case::student(Who::Submitter, None)]
#[case::owner(Who::Owner, Some(ALLOW))]
#[case::other_teacher(Who::OtherTeacher, Some(TEACHER_SCOPE))]
fn test_view_via_teacher_link(#[case] who: Who, #[case] expected: Option<Decision>) {
    let target = owned().with_link(LinkMatch::Teacher);
    assert_decision(evaluate(&context(who), Operation::ViewShared, &target), expected);
}

#[rstest]
#[case::anonymous(Who::Anonymous, Some(STUDENT_SCOPE))]
#[case::student(Who::OtherStudent, Some(STUDENT_SCOPE))]
#[case::owner(Who::Owner, Some(ALLOW))]
#[case::other_teacher(Who::OtherTeacher, None)]
fn test_view_via_student_link(#[case] who: Who, #[case] expected: Option<Decision>) {
    let target = owned().with_link(LinkMatch::Student);
    assert_decision(evaluate(&context(who), Operation::ViewShared, &target), expected);
}

#[rstest]
#[case::anonymous(Who::Anonymous, None)]
#[case::student(Who::Submitter, None)]
#[case::owner(Who::Owner, Some(ALLOW))]
#[case::other_teacher(Who::OtherTeacher, None)]
fn test_manage_owned_via_teacher_link(#[case] who: Who, #[case] expected: Option<Decision>) {
    let target = owned().with_link(LinkMatch::Teacher);
    assert_decision(evaluate(&context(who), Operation::ManageShared, &target), expected);
}

#[rstest]
#[case::anonymous(Who::Anonymous, Some(TEACHER_SCOPE))]
#[case::student(Who::Submitter, None)]
#[case::teacher(Who::OtherTeacher, Some(TEACHER_SCOPE))]
fn test_manage_ownerless_via_teacher_link(#[case] who: Who, #[case] expected: Option<Decision>) {
    let target = ownerless().with_link(LinkMatch::Teacher);
    assert_decision(evaluate(&context(who), Operation::ManageShared, &target), expected);
}

#[rstest]
#[case::anonymous_open(Who::Anonymous, Mode::All, Some(STUDENT_SCOPE))]
#[case::anonymous_registered(Who::Anonymous, Mode::Registered, None)]
#[case::student_open(Who::Submitter, Mode::All, Some(ALLOW))]
#[case::student_registered(Who::Submitter, Mode::Registered, Some(ALLOW))]
#[case::owner(Who::Owner, Mode::All, None)]
#[case::other_teacher(Who::OtherTeacher, Mode::All, None)]
fn test_submit_via_student_link(
    #[case] who: Who,
    #[case] mode: Mode,
    #[case] expected: Option<Decision>,
) {
    let target = owned().with_link(LinkMatch::Student).with_mode(mode);
    assert_decision(evaluate(&context(who), Operation::Submit, &target), expected);
}

#[rstest]
#[case::anonymous(Who::Anonymous, false)]
#[case::student(Who::Submitter, true)]
#[case::teacher(Who::Owner, false)]
fn test_list_own_submissions(#[case] who: Who, #[case] allowed: bool) {
    let decision = evaluate(&context(who), Operation::ListSubmissions, &Target::default());
    assert_eq!(decision.is_allowed(), allowed);
}

#[rstest]
#[case::anonymous(Who::Anonymous, None)]
#[case::submitter(Who::Submitter, Some(ALLOW))]
#[case::other_student(Who::OtherStudent, None)]
#[case::owner(Who::Owner, Some(ALLOW))]
#[case::other_teacher(Who::OtherTeacher, None)]
fn test_read_submission(#[case] who: Who, #[case] expected: Option<Decision>) {
    assert_decision(
        evaluate(&context(who), Operation::ReadSubmission, &owned()),
        expected,
    );
}

#[rstest]
#[case::anonymous(Who::Anonymous, None)]
#[case::submitter(Who::Submitter, None)]
#[case::owner(Who::Owner, Some(ALLOW))]
#[case::other_teacher(Who::OtherTeacher, None)]
fn test_grade_submission(#[case] who: Who, #[case] expected: Option<Decision>) {
    assert_decision(
        evaluate(&context(who), Operation::GradeSubmission, &owned()),
        expected,
    );
}

#[rstest]
#[case::anonymous(Who::Anonymous, false)]
#[case::submitter(Who::Submitter, true)]
#[case::other_student(Who::OtherStudent, false)]
#[case::owner(Who::Owner, false)]
fn test_edit_submission(#[case] who: Who, #[case] allowed: bool) {
    let decision = evaluate(&context(who), Operation::EditSubmission, &owned());
    assert_eq!(decision.is_allowed(), allowed);
}

#[rstest]
#[case::anonymous(Who::Anonymous, false)]
#[case::submitter(Who::Submitter, true)]
#[case::other_student(Who::OtherStudent, false)]
#[case::owner(Who::Owner, true)]
#[case::other_teacher(Who::OtherTeacher, false)]
fn test_delete_submission(#[case] who: Who, #[case] allowed: bool) {
    let decision = evaluate(&context(who), Operation::DeleteSubmission, &owned());
    assert_eq!(decision.is_allowed(), allowed);
}

#[rstest]
fn test_ownerless_teacher_link_grants_scoped_submission_access(
    #[values(Operation::ReadSubmission, Operation::GradeSubmission)] op: Operation,
) {
    let with_link = ownerless().with_link(LinkMatch::Teacher);
    assert_eq!(evaluate(&AuthContext::Anonymous, op, &with_link), TEACHER_SCOPE);

    let student_link = ownerless().with_link(LinkMatch::Student);
    assert!(!evaluate(&AuthContext::Anonymous, op, &student_link).is_allowed());
    assert!(!evaluate(&AuthContext::Anonymous, op, &ownerless()).is_allowed());
}

#[rstest]
fn test_link_operations_deny_without_matching_link(
    #[values(Operation::ViewShared, Operation::ManageShared, Operation::Submit)] op: Operation,
    #[values(Who::Anonymous, Who::Owner, Who::OtherTeacher, Who::Submitter)] who: Who,
) {
    let decision = evaluate(&context(who), op, &ownerless().with_link(LinkMatch::None));
    assert!(!decision.is_allowed(), "{op:?} by {who:?} without a link");
}

// ============= Groups =============

#[rstest]
#[case::anonymous_outsider(Who::Anonymous, Membership::Outsider, None)]
#[case::student_member(Who::Submitter, Membership::Student, Some(STUDENT_SCOPE))]
#[case::student_outsider(Who::OtherStudent, Membership::Outsider, None)]
#[case::owner(Who::Owner, Membership::Outsider, Some(ALLOW))]
#[case::co_teacher(Who::OtherTeacher, Membership::Teacher, None)]
fn test_group_narrows_student_link_view(
    #[case] who: Who,
    #[case] membership: Membership,
    #[case] expected: Option<Decision>,
) {
    let target = owned()
        .with_link(LinkMatch::Student)
        .with_membership(membership);
    assert_decision(evaluate(&context(who), Operation::ViewShared, &target), expected);
}

#[rstest]
#[case::anonymous_outsider(Who::Anonymous, Membership::Outsider, None)]
#[case::student_member(Who::Submitter, Membership::Student, Some(ALLOW))]
#[case::student_outsider(Who::OtherStudent, Membership::Outsider, None)]
#[case::owner(Who::Owner, Membership::Outsider, None)]
fn test_group_narrows_submission(
    #[case] who: Who,
    #[case] membership: Membership,
    #[case] expected: Option<Decision>,
) {
    let target = owned()
        .with_link(LinkMatch::Student)
        .with_mode(Mode::All)
        .with_membership(membership);
    assert_decision(evaluate(&context(who), Operation::Submit, &target), expected);
}

#[test]
fn test_group_teacher_link_unaffected_by_membership() {
    let target = owned()
        .with_link(LinkMatch::Teacher)
        .with_membership(Membership::Outsider);
    assert_eq!(
        evaluate(&context(Who::OtherTeacher), Operation::ViewShared, &target),
        TEACHER_SCOPE
    );
}

#[rstest]
#[case::anonymous(Who::Anonymous, Membership::Outsider, false, false)]
#[case::student_member(Who::Submitter, Membership::Student, false, false)]
#[case::owner(Who::Owner, Membership::Outsider, true, true)]
#[case::co_teacher(Who::OtherTeacher, Membership::Teacher, true, false)]
#[case::other_teacher(Who::OtherTeacher, Membership::Outsider, false, false)]
fn test_group_operations(
    #[case] who: Who,
    #[case] membership: Membership,
    #[case] can_view: bool,
    #[case] can_manage: bool,
) {
    let ctx = context(who);
    let group = Target::owned_by(Some("t1")).with_membership(membership);

    assert_eq!(evaluate(&ctx, Operation::ViewGroup, &group).is_allowed(), can_view);
    assert_eq!(evaluate(&ctx, Operation::UseGroup, &group).is_allowed(), can_view);
    assert_eq!(evaluate(&ctx, Operation::ManageGroup, &group).is_allowed(), can_manage);
}

#[rstest]
#[case::anonymous(Who::Anonymous, false, false)]
#[case::student(Who::Submitter, false, true)]
#[case::teacher(Who::OtherTeacher, true, true)]
fn test_group_creation_and_listing(
    #[case] who: Who,
    #[case] can_create: bool,
    #[case] can_list: bool,
) {
    let ctx = context(who);
    assert_eq!(
        evaluate(&ctx, Operation::CreateGroup, &Target::default()).is_allowed(),
        can_create
    );
    assert_eq!(
        evaluate(&ctx, Operation::ListGroups, &Target::default()).is_allowed(),
        can_list
    );
}

#[rstest]
#[case::anonymous(Who::Anonymous, LinkMatch::Teacher, false)]
#[case::student(Who::Submitter, LinkMatch::Teacher, false)]
#[case::teacher(Who::OtherTeacher, LinkMatch::Teacher, true)]
#[case::teacher_without_link(Who::OtherTeacher, LinkMatch::None, false)]
fn test_accept_group_share(#[case] who: Who, #[case] link: LinkMatch, #[case] allowed: bool) {
    let target = Target::owned_by(Some("t1")).with_link(link);
    assert_eq!(
        evaluate(&context(who), Operation::AcceptGroupShare, &target).is_allowed(),
        allowed
    );
}

#[test]
fn test_membership_from_role() {
    assert_eq!(Membership::from_role(Some(Role::Student)), Membership::Student);
    assert_eq!(Membership::from_role(Some(Role::Teacher)), Membership::Teacher);
    assert_eq!(Membership::from_role(None), Membership::Outsider);
}

#[test]
fn test_roles_are_disjoint() {
    // A student never passes a teacher-only check even when ids collide.
    let student_t1 = AuthContext::Authenticated(ClaimSet::new(
        "t1@example.com",
        "t1",
        Role::Student,
        KeyKind::Access,
        Utc::now(),
        Duration::minutes(60),
    ));

    assert!(!evaluate(&student_t1, Operation::Read, &owned()).is_allowed());
    assert!(!evaluate(&student_t1, Operation::GradeSubmission, &owned()).is_allowed());
}

#[rstest]
fn test_rejected_token_is_refused_on_every_operation(
    #[values(TokenError::Expired, TokenError::SignatureInvalid)] error: TokenError,
    #[values(
        Operation::Create,
        Operation::Update,
        Operation::ViewShared,
        Operation::ManageShared,
        Operation::Submit
    )]
    op: Operation,
) {
    let ctx = AuthContext::Rejected(error.clone());
    // Every one of these is open to anonymous callers on an ownerless record
    // reached through the right link.
    let link = match op {
        Operation::ViewShared | Operation::Submit => LinkMatch::Student,
        _ => LinkMatch::Teacher,
    };
    let target = ownerless().with_link(link);

    match authorize(&ctx, op, &target).unwrap_err() {
        AppError::Token(inner) => assert_eq!(inner, error),
        other => panic!("unexpected error for {op:?}: {:?}", other),
    }
}

#[test]
fn test_anonymous_still_reaches_open_operations() {
    let view = ownerless().with_link(LinkMatch::Student);
    assert_eq!(
        authorize(&AuthContext::Anonymous, Operation::ViewShared, &view).ok(),
        Some(Some(Scope::StudentLink))
    );
    assert_eq!(
        authorize(&AuthContext::Anonymous, Operation::Create, &Target::default()).ok(),
        Some(Some(Scope::TeacherLink))
    );
}
