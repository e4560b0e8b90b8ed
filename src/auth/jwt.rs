//! JWT Token Handler
//! Issue and validate signed, expiring session tokens

use crate::auth::models::{Claims, TokenKind, TokenSubject};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum TokenError {
    /// Bad signature, malformed structure or past expiry. Not distinguished further.
    #[error("Invalid or expired token")]
    Invalid,
    #[error("Token lifetime must be at least one second")]
    InvalidTtl,
    #[error("Signing secret must not be empty")]
    EmptySecret,
    #[error("Failed to sign token: {0}")]
    Encode(#[from] jsonwebtoken::errors::Error),
}

/// JWT Handler for token operations
pub struct JwtHandler {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl JwtHandler {
    /// Create a handler signing with `secret`. The secret is never read from globals.
    pub fn new(
        secret: &str,
        access_ttl: Duration,
        refresh_ttl: Duration,
    ) -> Result<Self, TokenError> {
        if secret.is_empty() {
            return Err(TokenError::EmptySecret);
        }
        if access_ttl.num_seconds() < 1 || refresh_ttl.num_seconds() < 1 {
            return Err(TokenError::InvalidTtl);
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            access_ttl,
            refresh_ttl,
        })
    }

    pub fn access_ttl(&self) -> Duration {
        self.access_ttl
    }

    pub fn refresh_ttl(&self) -> Duration {
        self.refresh_ttl
    }

    /// Sign `subject` as a token of `kind` expiring `ttl` from now
    pub fn encode(
        &self,
        subject: &TokenSubject,
        kind: TokenKind,
        ttl: Duration,
    ) -> Result<String, TokenError> {
        if ttl.num_seconds() < 1 {
            return Err(TokenError::InvalidTtl);
        }

        let iat = Utc::now().timestamp();
        let exp = iat
            .checked_add(ttl.num_seconds())
            .ok_or(TokenError::InvalidTtl)?;
        let claims = Claims {
            sub: subject.sub.clone(),
            email: subject.email.clone(),
            role: subject.role.clone(),
            kind,
            iat,
            exp,
            jti: Uuid::new_v4().to_string(),
        };

        debug!(
            "Generating {} token for subject {}, expires in {}s",
            kind.as_str(),
            claims.sub,
            ttl.num_seconds()
        );

        self.encode_claims(&claims)
    }

    pub fn issue_access(&self, subject: &TokenSubject) -> Result<String, TokenError> {
        self.encode(subject, TokenKind::Access, self.access_ttl)
    }

    pub fn issue_refresh(&self, subject: &TokenSubject) -> Result<String, TokenError> {
        self.encode(subject, TokenKind::Refresh, self.refresh_ttl)
    }

    pub(crate) fn encode_claims(&self, claims: &Claims) -> Result<String, TokenError> {
        Ok(encode(&Header::default(), claims, &self.encoding_key)?)
    }

    /// Validate a token and extract its claims. Valid only while `now < exp`.
    pub fn decode(&self, token: &str) -> Result<Claims, TokenError> {
        let decoded = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(|_| TokenError::Invalid)?;

        let claims = decoded.claims;
        if claims.exp <= Utc::now().timestamp() || claims.exp <= claims.iat {
            return Err(TokenError::Invalid);
        }

        debug!("Validated {} token for subject {}", claims.kind.as_str(), claims.sub);

        Ok(claims)
    }
}
