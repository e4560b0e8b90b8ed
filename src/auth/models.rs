//! Authentication Models
//! Credentials, roles, session claims and the request/response bodies of the auth routes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Role name carried in access tokens when a credential has no resolvable role.
pub const DEFAULT_ROLE: &str = "user";
/// Role required by the user-management routes.
pub const ADMIN_ROLE: &str = "admin";
/// Description given to the `user` role when registration bootstraps it.
pub const DEFAULT_ROLE_DESCRIPTION: &str = "Standard user role";

/// Authorization label shared by many credentials
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Stored user identity
#[derive(Debug, Clone, Serialize)]
pub struct Credential {
    pub id: i64,
    pub email: String,
    pub username: String,
    pub full_name: Option<String>,
    #[serde(skip_serializing)]
    pub password_hash: String, // bcrypt hash - never serialize
    pub is_active: bool,
    pub is_verified: bool,
    pub role_id: i64,
    pub role: Option<Role>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub last_login: Option<DateTime<Utc>>,
}

impl Credential {
    /// Name of the joined role, if the role row could be resolved.
    pub fn role_name(&self) -> Option<&str> {
        self.role.as_ref().map(|r| r.name.as_str())
    }

    /// Role name to embed in an access token, falling back to [`DEFAULT_ROLE`].
    pub fn claim_role(&self) -> &str {
        self.role_name().unwrap_or(DEFAULT_ROLE)
    }

    pub fn has_role(&self, role_name: &str) -> bool {
        self.role_name() == Some(role_name)
    }
}

/// Fields for a credential insert. The store assigns `id` and `created_at`.
#[derive(Debug, Clone)]
pub struct NewCredential {
    pub email: String,
    pub username: String,
    pub full_name: Option<String>,
    pub password_hash: String,
    pub role_id: i64,
    pub is_active: bool,
    pub is_verified: bool,
}

/// Partial credential update. `None` leaves the column untouched.
#[derive(Debug, Clone, Default)]
pub struct CredentialUpdate {
    pub email: Option<String>,
    pub username: Option<String>,
    /// `Some(None)` clears the column
    pub full_name: Option<Option<String>>,
    pub password_hash: Option<String>,
    pub is_active: Option<bool>,
    pub is_verified: Option<bool>,
    pub role_id: Option<i64>,
    pub last_login: Option<DateTime<Utc>>,
}

impl CredentialUpdate {
    pub fn is_empty(&self) -> bool {
        self.email.is_none()
            && self.username.is_none()
            && self.full_name.is_none()
            && self.password_hash.is_none()
            && self.is_active.is_none()
            && self.is_verified.is_none()
            && self.role_id.is_none()
            && self.last_login.is_none()
    }
}

/// Filters for listing credentials
#[derive(Debug, Clone, Default)]
pub struct UserFilter {
    /// Case-insensitive substring matched against email, username and full name
    pub search: Option<String>,
    pub role_name: Option<String>,
    pub is_active: Option<bool>,
}

/// Token kind: short-lived API access or long-lived renewal
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

impl TokenKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenKind::Access => "access",
            TokenKind::Refresh => "refresh",
        }
    }
}

/// Identity data a token is issued for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenSubject {
    pub sub: String,
    pub email: Option<String>,
    pub role: Option<String>,
}

impl TokenSubject {
    /// Subject for an access token: id, email and role name.
    pub fn access(credential: &Credential) -> Self {
        Self {
            sub: credential.id.to_string(),
            email: Some(credential.email.clone()),
            role: Some(credential.claim_role().to_string()),
        }
    }

    /// Subject for a refresh token: id only.
    pub fn refresh(credential: &Credential) -> Self {
        Self {
            sub: credential.id.to_string(),
            email: None,
            role: None,
        }
    }
}

/// JWT Claims payload
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    pub sub: String, // subject (user id)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(rename = "type")]
    pub kind: TokenKind,
    pub iat: i64,
    pub exp: i64, // expiration timestamp
    pub jti: String,
}

impl Claims {
    pub fn subject(&self) -> TokenSubject {
        TokenSubject {
            sub: self.sub.clone(),
            email: self.email.clone(),
            role: self.role.clone(),
        }
    }

    /// Numeric credential id, if `sub` holds one.
    pub fn user_id(&self) -> Option<i64> {
        self.sub.parse().ok()
    }
}

/// Login request body
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Registration request body
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub username: String,
    pub full_name: Option<String>,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshTokenRequest {
    pub refresh_token: String,
}

#[derive(Debug, Deserialize)]
pub struct PasswordChangeRequest {
    pub current_password: String,
    pub new_password: String,
}

/// Access + refresh token pair returned by login and refresh
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64, // seconds until the access token expires
}

/// User response (sanitized)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: i64,
    pub email: String,
    pub username: String,
    pub full_name: Option<String>,
    pub is_active: bool,
    pub is_verified: bool,
    pub role: Option<Role>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub last_login: Option<DateTime<Utc>>,
}

impl UserResponse {
    pub fn from_credential(credential: &Credential) -> Self {
        Self {
            id: credential.id,
            email: credential.email.clone(),
            username: credential.username.clone(),
            full_name: credential.full_name.clone(),
            is_active: credential.is_active,
            is_verified: credential.is_verified,
            role: credential.role.clone(),
            created_at: credential.created_at,
            updated_at: credential.updated_at,
            last_login: credential.last_login,
        }
    }
}

impl From<&Credential> for UserResponse {
    fn from(credential: &Credential) -> Self {
        Self::from_credential(credential)
    }
}

/// Plain acknowledgement body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
