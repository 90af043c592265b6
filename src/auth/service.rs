use crate::auth::claims::{ClaimSet, KeyKind};
use crate::auth::context::AuthContext;
use crate::auth::jwt::{TokenCodec, TokenError};
use crate::db::UserLookup;
use crate::types::{AppError, LoginRequest, Result, TokenResponse, User, UserProfile};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;

/// Access and refresh tokens issued together for one user.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    /// Claims inside the access token
    pub access: ClaimSet,
    /// Claims inside the refresh token
    pub refresh: ClaimSet,
    pub profile: UserProfile,
}

impl From<TokenPair> for TokenResponse {
    fn from(pair: TokenPair) -> Self {
        let expires_in = (pair.access.expires_at - pair.access.issued_at).num_seconds();
        TokenResponse {
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
            role: pair.profile.role,
            expires_in,
            first_name: Some(pair.profile.first_name),
            last_name: Some(pair.profile.last_name),
            email: Some(pair.profile.email),
        }
    }
}

/// Authentication service: credential checks, token issuance and validation.
///
/// Provides password hashing using Argon2id and token handling through a
/// [`TokenCodec`]. Holds no process-wide state; everything it needs is
/// injected at construction.
pub struct AuthService {
    codec: TokenCodec,
    access_ttl: Duration,
    refresh_ttl: Duration,
    users: Arc<dyn UserLookup>,
}

impl AuthService {
    /// Creates a new AuthService.
    ///
    /// # Arguments
    /// * `codec` - Token codec holding the access and refresh secrets
    /// * `access_ttl` - Access token validity
    /// * `refresh_ttl` - Refresh token validity
    /// * `users` - User source for login and refresh
    pub fn new(
        codec: TokenCodec,
        access_ttl: Duration,
        refresh_ttl: Duration,
        users: Arc<dyn UserLookup>,
    ) -> Self {
        Self {
            codec,
            access_ttl,
            refresh_ttl,
            users,
        }
    }

    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    pub fn access_ttl(&self) -> Duration {
        self.access_ttl
    }

    fn ttl(&self, kind: KeyKind) -> Duration {
        match kind {
            KeyKind::Access => self.access_ttl,
            KeyKind::Refresh => self.refresh_ttl,
        }
    }

    /// Hashes a password using Argon2id.
    ///
    /// Returns a PHC-formatted hash string.
    pub fn hash_password(&self, password: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        let argon2 = Argon2::default();

        argon2
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))
    }

    /// Verifies a password against an Argon2 hash.
    pub fn verify_password(&self, password: &str, hash: &str) -> Result<bool> {
        let parsed_hash = PasswordHash::new(hash)
            .map_err(|e| AppError::Internal(format!("Invalid password hash: {}", e)))?;

        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok())
    }

    /// Issues an access/refresh pair for `user` starting at `now`.
    pub fn issue_pair(&self, user: &User, now: DateTime<Utc>) -> Result<TokenPair> {
        let access = self.claims_for(user, KeyKind::Access, now);
        let refresh = self.claims_for(user, KeyKind::Refresh, now);

        Ok(TokenPair {
            access_token: self.codec.issue(&access)?,
            refresh_token: self.codec.issue(&refresh)?,
            access,
            refresh,
            profile: UserProfile::from(user),
        })
    }

    fn claims_for(&self, user: &User, kind: KeyKind, now: DateTime<Utc>) -> ClaimSet {
        ClaimSet::new(
            user.email.clone(),
            user.id.clone(),
            user.role,
            kind,
            now,
            self.ttl(kind),
        )
    }

    /// Checks credentials and issues a token pair.
    ///
    /// Unknown users and wrong passwords fail the same way.
    pub async fn login(&self, req: &LoginRequest) -> Result<TokenPair> {
        req.validate()?;

        let email = req.email.trim().to_lowercase();
        let user = match self.users.find_by_email(&email).await? {
            Some(user) => user,
            None => {
                tracing::warn!("login failed: unknown email");
                return Err(AppError::CredentialMismatch);
            }
        };

        if !self.verify_password(&req.password, &user.password_hash)? {
            tracing::warn!(user_id = %user.id, "login failed: wrong password");
            return Err(AppError::CredentialMismatch);
        }

        tracing::info!(user_id = %user.id, role = %user.role, "user logged in");
        self.issue_pair(&user, Utc::now())
    }

    /// Exchanges a refresh token for a fresh pair.
    ///
    /// The presented token stays valid until it expires.
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPair> {
        self.refresh_at(refresh_token, Utc::now()).await
    }

    pub async fn refresh_at(&self, refresh_token: &str, now: DateTime<Utc>) -> Result<TokenPair> {
        let claims = self.codec.decode_at(refresh_token, now)?;

        if claims.key_kind != KeyKind::Refresh {
            return Err(AppError::WrongTokenKind {
                expected: KeyKind::Refresh,
                found: claims.key_kind,
            });
        }

        let user = self
            .users
            .find_by_id(&claims.user_id)
            .await?
            .ok_or_else(|| AppError::Unauthorized("User no longer exists".to_string()))?;

        self.issue_pair(&user, now)
    }

    /// Returns the claims of a valid access token, `None` for anything else.
    pub fn validate(&self, token: &str) -> Option<ClaimSet> {
        self.validate_at(token, Utc::now())
    }

    pub fn validate_at(&self, token: &str, now: DateTime<Utc>) -> Option<ClaimSet> {
        match self.codec.decode_at(token, now) {
            Ok(claims) if claims.key_kind == KeyKind::Access => Some(claims),
            Ok(_) => None,
            Err(_) => None,
        }
    }

    /// Builds the request's [`AuthContext`] from an `Authorization` header value.
    ///
    /// Missing, non-bearer and malformed credentials give an anonymous
    /// context. A well-formed token that is expired or badly signed gives a
    /// rejected one.
    pub fn authenticate(&self, header: Option<&str>) -> AuthContext {
        self.authenticate_at(header, Utc::now())
    }

    pub fn authenticate_at(&self, header: Option<&str>, now: DateTime<Utc>) -> AuthContext {
        let Some(token) = header.and_then(bearer_token) else {
            return AuthContext::Anonymous;
        };

        match self.codec.decode_at(token, now) {
            Ok(claims) if claims.key_kind == KeyKind::Access => AuthContext::Authenticated(claims),
            Ok(claims) => {
                tracing::debug!(user_id = %claims.user_id, "refresh token presented as bearer");
                AuthContext::Anonymous
            }
            Err(TokenError::Malformed(reason)) => {
                tracing::debug!(%reason, "ignoring malformed bearer token");
                AuthContext::Anonymous
            }
            Err(err) => {
                tracing::debug!(error = %err, "bearer token rejected");
                AuthContext::Rejected(err)
            }
        }
    }

    /// Verifies the current password and returns the hash of the new one.
    pub async fn change_password(
        &self,
        claims: &ClaimSet,
        old_password: &str,
        new_password: &str,
    ) -> Result<String> {
        if new_password.len() < 8 {
            return Err(AppError::Validation(
                "Password must be at least 8 characters".to_string(),
            ));
        }

        let user = self
            .users
            .find_by_id(&claims.user_id)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

        if !self.verify_password(old_password, &user.password_hash)? {
            tracing::warn!(user_id = %user.id, "password change with wrong password");
            return Err(AppError::CredentialMismatch);
        }

        self.hash_password(new_password)
    }
}

/// Extracts the token from `Bearer <token>`. The scheme is case-insensitive.
fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Role;
    use async_trait::async_trait;
    use std::collections::HashMap;

    struct StaticUsers(HashMap<String, User>);

    #[async_trait]
    impl UserLookup for StaticUsers {
        async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
            Ok(self.0.values().find(|u| u.email == email).cloned())
        }

        async fn find_by_id(&self, id: &str) -> Result<Option<User>> {
            Ok(self.0.get(id).cloned())
        }
    }

    fn create_test_service() -> AuthService {
        let codec = TokenCodec::new(
            "access-secret-key-that-is-at-least-32-chars",
            "refresh-secret-key-that-is-at-least-32-chars",
        );
        let mut service = AuthService::new(
            codec,
            Duration::minutes(60),
            Duration::minutes(180),
            Arc::new(StaticUsers(HashMap::new())),
        );

        let hash = service
            .hash_password("correct_password")
            .expect("should hash password");
        let user = User {
            id: "t1".to_string(),
            email: "teacher@example.com".to_string(),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            role: Role::Teacher,
            password_hash: hash,
            created_at: 0,
            updated_at: 0,
        };
        service.users = Arc::new(StaticUsers(HashMap::from([(user.id.clone(), user)])));
        service
    }

    fn login_request(email: &str, password: &str) -> LoginRequest {
        LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    #[test]
    fn test_password_hashing() {
        let service = create_test_service();
        let password = "test_password_123";

        let hash = service
            .hash_password(password)
            .expect("should hash password");

        assert_ne!(hash, password);
        assert!(hash.starts_with("$argon2"), "hash should be in PHC format");
        assert!(service.verify_password(password, &hash).expect("should verify"));
        assert!(!service
            .verify_password("wrong_password", &hash)
            .expect("should verify"));
    }

    #[test]
    fn test_malformed_stored_hash_is_internal() {
        let service = create_test_service();
        let result = service.verify_password("anything", "not-a-phc-string");
        assert!(matches!(result, Err(AppError::Internal(_))));
    }

    #[tokio::test]
    async fn test_login_issues_pair() {
        let service = create_test_service();

        let pair = service
            .login(&login_request("teacher@example.com", "correct_password"))
            .await
            .expect("login should succeed");

        assert_eq!(pair.access.subject, "teacher@example.com");
        assert_eq!(pair.access.role, Role::Teacher);
        assert_eq!(pair.access.key_kind, KeyKind::Access);
        assert_eq!(pair.refresh.key_kind, KeyKind::Refresh);
        assert_eq!(
            pair.access.expires_at - pair.access.issued_at,
            Duration::minutes(60)
        );
        assert_eq!(
            pair.refresh.expires_at - pair.refresh.issued_at,
            Duration::minutes(180)
        );

        let response = TokenResponse::from(pair);
        assert_eq!(response.expires_in, 3600);
        assert_eq!(response.first_name.as_deref(), Some("Ada"));
    }

    #[tokio::test]
    async fn test_login_failures() {
        let service = create_test_service();

        let wrong = service
            .login(&login_request("teacher@example.com", "wrong_password"))
            .await;
        assert!(matches!(wrong, Err(AppError::CredentialMismatch)));

        let unknown = service
            .login(&login_request("ghost@example.com", "correct_password"))
            .await;
        assert!(matches!(unknown, Err(AppError::CredentialMismatch)));

        let empty = service.login(&login_request("", "")).await;
        assert!(matches!(empty, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_refresh_rejects_access_token() {
        let service = create_test_service();
        let pair = service
            .login(&login_request("teacher@example.com", "correct_password"))
            .await
            .expect("login should succeed");

        let result = service.refresh(&pair.access_token).await;
        assert!(matches!(
            result,
            Err(AppError::WrongTokenKind {
                expected: KeyKind::Refresh,
                found: KeyKind::Access
            })
        ));
    }

    #[tokio::test]
    async fn test_refresh_twice_with_same_token() {
        let service = create_test_service();
        let pair = service
            .login(&login_request("teacher@example.com", "correct_password"))
            .await
            .expect("login should succeed");

        let first = service.refresh(&pair.refresh_token).await;
        let second = service.refresh(&pair.refresh_token).await;

        assert!(first.is_ok(), "first refresh should succeed");
        assert!(second.is_ok(), "no rotation: second refresh should succeed");
    }

    #[tokio::test]
    async fn test_refresh_expired_token() {
        let service = create_test_service();
        let pair = service
            .login(&login_request("teacher@example.com", "correct_password"))
            .await
            .expect("login should succeed");

        let later = pair.refresh.expires_at + Duration::seconds(1);
        let result = service.refresh_at(&pair.refresh_token, later).await;
        assert!(matches!(result, Err(AppError::Token(TokenError::Expired))));
    }

    #[tokio::test]
    async fn test_validate_only_accepts_access_tokens() {
        let service = create_test_service();
        let pair = service
            .login(&login_request("teacher@example.com", "correct_password"))
            .await
            .expect("login should succeed");

        assert!(service.validate(&pair.access_token).is_some());
        assert!(service.validate(&pair.refresh_token).is_none());
        assert!(service.validate("garbage").is_none());
    }

    #[tokio::test]
    async fn test_authenticate_header_handling() {
        let service = create_test_service();
        let pair = service
            .login(&login_request("teacher@example.com", "correct_password"))
            .await
            .expect("login should succeed");

        let header = format!("Bearer {}", pair.access_token);
        assert!(service.authenticate(Some(&header)).is_present());

        let lower = format!("bearer {}", pair.access_token);
        assert!(service.authenticate(Some(&lower)).is_present());

        for bad in [None, Some(""), Some("Bearer"), Some("Basic abc"), Some("Bearer x.y.z")] {
            assert_eq!(service.authenticate(bad), AuthContext::Anonymous);
        }

        let refresh = format!("Bearer {}", pair.refresh_token);
        assert_eq!(service.authenticate(Some(&refresh)), AuthContext::Anonymous);

        let later = pair.access.expires_at + Duration::seconds(1);
        assert_eq!(
            service.authenticate_at(Some(&header), later),
            AuthContext::Rejected(TokenError::Expired)
        );
    }

    #[tokio::test]
    async fn test_change_password() {
        let service = create_test_service();
        let pair = service
            .login(&login_request("teacher@example.com", "correct_password"))
            .await
            .expect("login should succeed");

        let wrong = service
            .change_password(&pair.access, "nope", "new_password_1")
            .await;
        assert!(matches!(wrong, Err(AppError::CredentialMismatch)));

        let short = service
            .change_password(&pair.access, "correct_password", "short")
            .await;
        assert!(matches!(short, Err(AppError::Validation(_))));

        let hash = service
            .change_password(&pair.access, "correct_password", "new_password_1")
            .await
            .expect("should hash new password");
        assert!(service
            .verify_password("new_password_1", &hash)
            .expect("should verify"));
    }
}
