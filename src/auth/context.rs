use crate::auth::claims::ClaimSet;
use crate::auth::jwt::TokenError;
use crate::types::Role;

/// Request-scoped authentication state, created once by the middleware.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum AuthContext {
    /// No usable credentials were presented.
    #[default]
    Anonymous,
    /// A valid access token was presented.
    Authenticated(ClaimSet),
    /// A bearer token was presented but failed verification.
    Rejected(TokenError),
}

impl AuthContext {
    pub fn is_present(&self) -> bool {
        matches!(self, AuthContext::Authenticated(_))
    }

    pub fn claims(&self) -> Option<&ClaimSet> {
        match self {
            AuthContext::Authenticated(claims) => Some(claims),
            _ => None,
        }
    }

    pub fn user_id(&self) -> Option<&str> {
        self.claims().map(|c| c.user_id.as_str())
    }

    pub fn role(&self) -> Option<Role> {
        self.claims().map(|c| c.role)
    }

    pub fn rejection(&self) -> Option<&TokenError> {
        match self {
            AuthContext::Rejected(err) => Some(err),
            _ => None,
        }
    }
}
