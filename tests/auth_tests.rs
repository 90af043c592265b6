//! Token and authentication service tests
//!
//! Exercise the codec and the auth service against an in-memory user store.

mod common;

use chrono::{Duration, TimeZone, Utc};
use common::mocks::{user, MockUsers};
use edudesk::{
    auth::{
        claims::{ClaimSet, KeyKind},
        context::AuthContext,
        jwt::{TokenCodec, TokenError},
    },
    types::{AppError, LoginRequest, Role, TokenResponse},
    AuthService,
};
use rstest::rstest;
use std::sync::Arc;

const ACCESS_SECRET: &str = "access-secret-for-tests-0123456789";
const REFRESH_SECRET: &str = "refresh-secret-for-tests-9876543210";

fn codec() -> TokenCodec {
    TokenCodec::new(ACCESS_SECRET, REFRESH_SECRET)
}

/// Service with one teacher (`t1`) and one student (`s1`), both using `password123`.
fn service_with_users() -> (AuthService, Arc<MockUsers>) {
    let users = Arc::new(MockUsers::new());
    let service = AuthService::new(
        codec(),
        Duration::minutes(60),
        Duration::minutes(180),
        users.clone(),
    );

    let hash = service
        .hash_password("password123")
        .expect("hashing should succeed");
    users.insert(user("t1", "teacher@example.com", Role::Teacher, &hash));
    users.insert(user("s1", "student@example.com", Role::Student, &hash));

    (service, users)
}

fn login_request(email: &str, password: &str) -> LoginRequest {
    LoginRequest {
        email: email.to_string(),
        password: password.to_string(),
    }
}

fn claims(kind: KeyKind, issued_at: chrono::DateTime<Utc>, ttl: Duration) -> ClaimSet {
    ClaimSet::new("teacher@example.com", "t1", Role::Teacher, kind, issued_at, ttl)
}

// ============= Key separation =============

#[test]
fn test_access_token_rejected_under_refresh_secret() {
    let codec = codec();
    let now = Utc::now();
    let token = codec
        .issue(&claims(KeyKind::Access, now, Duration::minutes(60)))
        .expect("issue should succeed");

    let result = codec.decode_with(&token, now, |_| codec.decoding_key(KeyKind::Refresh));
    assert_eq!(result.unwrap_err(), TokenError::SignatureInvalid);
}

#[test]
fn test_refresh_token_rejected_under_access_secret() {
    let codec = codec();
    let now = Utc::now();
    let token = codec
        .issue(&claims(KeyKind::Refresh, now, Duration::minutes(180)))
        .expect("issue should succeed");

    let result = codec.decode_with(&token, now, |_| codec.decoding_key(KeyKind::Access));
    assert_eq!(result.unwrap_err(), TokenError::SignatureInvalid);
}

#[test]
fn test_codecs_with_different_secrets_do_not_share_tokens() {
    let now = Utc::now();
    let token = codec()
        .issue(&claims(KeyKind::Access, now, Duration::minutes(60)))
        .expect("issue should succeed");

    let other = TokenCodec::new("another-access-secret", "another-refresh-secret");
    assert_eq!(
        other.decode_at(&token, now).unwrap_err(),
        TokenError::SignatureInvalid
    );
}

// ============= Expiry =============

#[rstest]
#[case::one_second_before(-1, true)]
#[case::at_expiry(0, false)]
#[case::one_second_after(1, false)]
fn test_expiry_boundary(#[case] offset_secs: i64, #[case] accepted: bool) {
    let codec = codec();
    let issued = Utc.with_ymd_and_hms(2030, 1, 1, 12, 0, 0).unwrap();
    let ttl = Duration::minutes(60);
    let token = codec
        .issue(&claims(KeyKind::Access, issued, ttl))
        .expect("issue should succeed");

    let now = issued + ttl + Duration::seconds(offset_secs);
    let result = codec.decode_at(&token, now);

    if accepted {
        assert!(result.is_ok(), "token should be valid at {offset_secs}s");
    } else {
        assert_eq!(result.unwrap_err(), TokenError::Expired);
    }
}

// ============= Login =============

#[tokio::test]
async fn test_teacher_login_issues_access_token_for_sixty_minutes() {
    let (service, _) = service_with_users();

    let pair = service
        .login(&login_request("teacher@example.com", "password123"))
        .await
        .expect("login should succeed");

    let decoded = service
        .codec()
        .decode(&pair.access_token)
        .expect("access token should decode");
    assert_eq!(decoded.subject, "teacher@example.com");
    assert_eq!(decoded.role, Role::Teacher);
    assert_eq!(decoded.key_kind, KeyKind::Access);
    assert_eq!(decoded.expires_at - decoded.issued_at, Duration::minutes(60));

    let refresh = service
        .codec()
        .decode(&pair.refresh_token)
        .expect("refresh token should decode");
    assert_eq!(refresh.key_kind, KeyKind::Refresh);
    assert_eq!(refresh.expires_at - refresh.issued_at, Duration::minutes(180));

    let response = TokenResponse::from(pair);
    assert_eq!(response.role, Role::Teacher);
    assert_eq!(response.email.as_deref(), Some("teacher@example.com"));
}

#[tokio::test]
async fn test_login_email_is_case_insensitive() {
    let (service, _) = service_with_users();

    let pair = service
        .login(&login_request("  Teacher@Example.com ", "password123"))
        .await
        .expect("login should succeed");
    assert_eq!(pair.access.user_id, "t1");
}

#[rstest]
#[case::wrong_password("teacher@example.com", "wrongpassword")]
#[case::unknown_email("nobody@example.com", "password123")]
#[tokio::test]
async fn test_login_credential_mismatch(#[case] email: &str, #[case] password: &str) {
    let (service, _) = service_with_users();

    let err = service
        .login(&login_request(email, password))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::CredentialMismatch));
}

#[tokio::test]
async fn test_login_empty_form_is_validation_error() {
    let (service, _) = service_with_users();

    let err = service.login(&login_request("", "")).await.unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
}

#[tokio::test]
async fn test_login_with_corrupt_stored_hash_is_internal() {
    let (service, users) = service_with_users();
    users.insert(user("t2", "broken@example.com", Role::Teacher, "not-a-phc-string"));

    let err = service
        .login(&login_request("broken@example.com", "password123"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Internal(_)));
}

// ============= Refresh =============

#[tokio::test]
async fn test_refresh_twice_with_same_token() {
    let (service, _) = service_with_users();
    let pair = service
        .login(&login_request("student@example.com", "password123"))
        .await
        .expect("login should succeed");

    let first = service
        .refresh(&pair.refresh_token)
        .await
        .expect("first refresh should succeed");
    let second = service
        .refresh(&pair.refresh_token)
        .await
        .expect("second refresh should succeed");

    assert_eq!(first.access.role, Role::Student);
    assert_eq!(second.access.subject, "student@example.com");
}

#[tokio::test]
async fn test_refresh_with_access_token_is_wrong_kind() {
    let (service, _) = service_with_users();
    let pair = service
        .login(&login_request("teacher@example.com", "password123"))
        .await
        .expect("login should succeed");

    let err = service.refresh(&pair.access_token).await.unwrap_err();
    assert!(matches!(
        err,
        AppError::WrongTokenKind {
            expected: KeyKind::Refresh,
            found: KeyKind::Access
        }
    ));
}

#[tokio::test]
async fn test_refresh_picks_up_role_change() {
    let (service, users) = service_with_users();
    let pair = service
        .login(&login_request("student@example.com", "password123"))
        .await
        .expect("login should succeed");

    users.set_role("s1", Role::Teacher);

    let refreshed = service
        .refresh(&pair.refresh_token)
        .await
        .expect("refresh should succeed");
    assert_eq!(refreshed.access.role, Role::Teacher);
}

#[tokio::test]
async fn test_refresh_for_deleted_user_is_unauthorized() {
    let (service, users) = service_with_users();
    let pair = service
        .login(&login_request("student@example.com", "password123"))
        .await
        .expect("login should succeed");

    users.remove("s1");

    let err = service.refresh(&pair.refresh_token).await.unwrap_err();
    assert!(matches!(err, AppError::Unauthorized(_)));
}

#[tokio::test]
async fn test_expired_refresh_token() {
    let (service, _) = service_with_users();
    let issued = Utc::now();
    let pair = service
        .login(&login_request("teacher@example.com", "password123"))
        .await
        .expect("login should succeed");

    let later = issued + Duration::minutes(181);
    let err = service
        .refresh_at(&pair.refresh_token, later)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Token(TokenError::Expired)));
}

// ============= Validate / authenticate =============

#[tokio::test]
async fn test_validate_only_accepts_access_tokens() {
    let (service, _) = service_with_users();
    let pair = service
        .login(&login_request("teacher@example.com", "password123"))
        .await
        .expect("login should succeed");

    assert!(service.validate(&pair.access_token).is_some());
    assert!(service.validate(&pair.refresh_token).is_none());
    assert!(service.validate("garbage").is_none());
}

#[rstest]
#[case::absent(None)]
#[case::empty(Some(""))]
#[case::basic_scheme(Some("Basic dXNlcjpwYXNz"))]
#[case::bearer_without_token(Some("Bearer"))]
#[case::bearer_garbage(Some("Bearer not.a.token"))]
#[case::bearer_random_bytes(Some("Bearer \u{1F600}\u{0000}"))]
fn test_malformed_or_absent_bearer_is_anonymous(#[case] header: Option<&str>) {
    let (service, _) = service_with_users();

    let ctx = service.authenticate(header);
    assert_eq!(ctx, AuthContext::Anonymous);
    assert!(!ctx.is_present());
}

#[tokio::test]
async fn test_authenticate_expired_token_is_rejected() {
    let (service, _) = service_with_users();
    let pair = service
        .login(&login_request("teacher@example.com", "password123"))
        .await
        .expect("login should succeed");

    let header = format!("Bearer {}", pair.access_token);
    let later = Utc::now() + Duration::minutes(61);

    assert_eq!(
        service.authenticate_at(Some(&header), later),
        AuthContext::Rejected(TokenError::Expired)
    );
    assert!(service.authenticate(Some(&header)).is_present());
}

#[tokio::test]
async fn test_authenticate_refresh_token_as_bearer_is_anonymous() {
    let (service, _) = service_with_users();
    let pair = service
        .login(&login_request("teacher@example.com", "password123"))
        .await
        .expect("login should succeed");

    let header = format!("bearer {}", pair.refresh_token);
    assert_eq!(service.authenticate(Some(&header)), AuthContext::Anonymous);
}

// ============= Password change =============

#[tokio::test]
async fn test_change_password() {
    let (service, _) = service_with_users();
    let pair = service
        .login(&login_request("teacher@example.com", "password123"))
        .await
        .expect("login should succeed");

    let err = service
        .change_password(&pair.access, "wrongpassword", "newpassword123")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::CredentialMismatch));

    let err = service
        .change_password(&pair.access, "password123", "short")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    let hash = service
        .change_password(&pair.access, "password123", "newpassword123")
        .await
        .expect("change should succeed");
    assert!(service
        .verify_password("newpassword123", &hash)
        .expect("verify should succeed"));
}
