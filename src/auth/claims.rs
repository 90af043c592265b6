use crate::types::Role;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Key id placed in the header of access tokens.
pub const ACCESS_KEY_ID: &str = "441253856187b286";
/// Key id placed in the header of refresh tokens.
pub const REFRESH_KEY_ID: &str = "c425ad3cc7feb212";

/// Which secret a token is signed with. Never part of the payload; it travels
/// as the `kid` header field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyKind {
    Access,
    Refresh,
}

impl KeyKind {
    pub fn key_id(&self) -> &'static str {
        match self {
            KeyKind::Access => ACCESS_KEY_ID,
            KeyKind::Refresh => REFRESH_KEY_ID,
        }
    }

    pub fn from_key_id(kid: &str) -> Option<Self> {
        match kid {
            ACCESS_KEY_ID => Some(KeyKind::Access),
            REFRESH_KEY_ID => Some(KeyKind::Refresh),
            _ => None,
        }
    }
}

impl std::fmt::Display for KeyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KeyKind::Access => f.write_str("access"),
            KeyKind::Refresh => f.write_str("refresh"),
        }
    }
}

/// Data carried inside a signed token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimSet {
    /// The user's email
    pub subject: String,
    pub user_id: String,
    pub role: Role,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub key_kind: KeyKind,
}

impl ClaimSet {
    /// Builds a claim set valid for `ttl` starting at `now`.
    pub fn new(
        subject: impl Into<String>,
        user_id: impl Into<String>,
        role: Role,
        key_kind: KeyKind,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Self {
        // JWT timestamps are whole seconds
        let issued_at = DateTime::from_timestamp(now.timestamp(), 0).unwrap_or(now);
        Self {
            subject: subject.into(),
            user_id: user_id.into(),
            role,
            issued_at,
            expires_at: issued_at + ttl,
            key_kind,
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Registered claims as they appear on the wire.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct WireClaims {
    pub sub: String,
    pub uid: String,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

impl WireClaims {
    pub(crate) fn from_claims(claims: &ClaimSet) -> Self {
        Self {
            sub: claims.subject.clone(),
            uid: claims.user_id.clone(),
            role: claims.role,
            iat: claims.issued_at.timestamp(),
            exp: claims.expires_at.timestamp(),
        }
    }

    /// Returns `None` when a timestamp is out of range.
    pub(crate) fn into_claims(self, key_kind: KeyKind) -> Option<ClaimSet> {
        Some(ClaimSet {
            subject: self.sub,
            user_id: self.uid,
            role: self.role,
            issued_at: DateTime::from_timestamp(self.iat, 0)?,
            expires_at: DateTime::from_timestamp(self.exp, 0)?,
            key_kind,
        })
    }
}
