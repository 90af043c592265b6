use crate::auth::claims::{ClaimSet, KeyKind, WireClaims};
use crate::types::{AppError, Result};
use chrono::{DateTime, Utc};
use jsonwebtoken::{
    decode, decode_header, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header,
    Validation,
};

/// Why a token could not be turned into a [`ClaimSet`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("Malformed token")]
    Malformed(String),

    #[error("Token has expired")]
    Expired,

    #[error("Invalid token signature")]
    SignatureInvalid,
}

/// Signs and verifies HS256 tokens with two independent secrets.
///
/// The secret is selected by the token's key kind: access tokens are signed
/// and checked with the access secret, refresh tokens with the refresh secret.
/// The kind travels in the `kid` header, so a token signed with one secret can
/// never verify under the other.
pub struct TokenCodec {
    access_encoding: EncodingKey,
    access_decoding: DecodingKey,
    refresh_encoding: EncodingKey,
    refresh_decoding: DecodingKey,
}

impl TokenCodec {
    /// Creates a codec from the two signing secrets.
    ///
    /// # Arguments
    /// * `access_secret` - Secret for access tokens
    /// * `refresh_secret` - Secret for refresh tokens (must differ from the access secret)
    pub fn new(access_secret: &str, refresh_secret: &str) -> Self {
        Self {
            access_encoding: EncodingKey::from_secret(access_secret.as_bytes()),
            access_decoding: DecodingKey::from_secret(access_secret.as_bytes()),
            refresh_encoding: EncodingKey::from_secret(refresh_secret.as_bytes()),
            refresh_decoding: DecodingKey::from_secret(refresh_secret.as_bytes()),
        }
    }

    fn encoding_key(&self, kind: KeyKind) -> &EncodingKey {
        match kind {
            KeyKind::Access => &self.access_encoding,
            KeyKind::Refresh => &self.refresh_encoding,
        }
    }

    pub fn decoding_key(&self, kind: KeyKind) -> &DecodingKey {
        match kind {
            KeyKind::Access => &self.access_decoding,
            KeyKind::Refresh => &self.refresh_decoding,
        }
    }

    /// Signs a claim set with the secret for its key kind.
    pub fn issue(&self, claims: &ClaimSet) -> Result<String> {
        let mut header = Header::new(Algorithm::HS256);
        header.kid = Some(claims.key_kind.key_id().to_string());

        encode(
            &header,
            &WireClaims::from_claims(claims),
            self.encoding_key(claims.key_kind),
        )
        .map_err(|e| AppError::Internal(format!("Failed to sign {} token: {}", claims.key_kind, e)))
    }

    /// Decodes and validates a token against the current time.
    pub fn decode(&self, token: &str) -> std::result::Result<ClaimSet, TokenError> {
        self.decode_at(token, Utc::now())
    }

    /// Decodes and validates a token against an explicit clock.
    pub fn decode_at(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> std::result::Result<ClaimSet, TokenError> {
        self.decode_with(token, now, |kind| self.decoding_key(kind))
    }

    /// Decodes a token, asking `resolve` for the key matching the header's key id.
    ///
    /// The header is read without being trusted: it only selects which secret
    /// to try. Expiry is checked against `now` with zero leeway.
    pub fn decode_with<'k, F>(
        &self,
        token: &str,
        now: DateTime<Utc>,
        resolve: F,
    ) -> std::result::Result<ClaimSet, TokenError>
    where
        F: Fn(KeyKind) -> &'k DecodingKey,
    {
        let header = decode_header(token).map_err(|e| TokenError::Malformed(e.to_string()))?;

        let kind = header
            .kid
            .as_deref()
            .and_then(KeyKind::from_key_id)
            .ok_or_else(|| TokenError::Malformed("unknown key id".to_string()))?;

        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        let data = decode::<WireClaims>(token, resolve(kind), &validation).map_err(|e| {
            match e.kind() {
                ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => {
                    TokenError::SignatureInvalid
                }
                _ => TokenError::Malformed(e.to_string()),
            }
        })?;

        let claims = data
            .claims
            .into_claims(kind)
            .ok_or_else(|| TokenError::Malformed("timestamp out of range".to_string()))?;

        if claims.is_expired_at(now) {
            return Err(TokenError::Expired);
        }

        Ok(claims)
    }
}
