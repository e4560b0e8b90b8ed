//! Auth Service
//! Login, registration, token refresh, password change and request-time identity resolution

use crate::auth::{
    errors::{AuthError, StoreError},
    jwt::JwtHandler,
    models::{
        Credential, CredentialUpdate, NewCredential, RegisterRequest, Role, TokenKind,
        TokenResponse, TokenSubject, DEFAULT_ROLE, DEFAULT_ROLE_DESCRIPTION,
    },
    password::PasswordHasher,
    user_store::CredentialStore,
    validation::{validate_email, validate_password, validate_username},
};
use anyhow::Context;
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Orchestrates the password hasher, token handler and credential store
#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn CredentialStore>,
    hasher: PasswordHasher,
    jwt: Arc<JwtHandler>,
    // Verified against when the email is unknown so both login failures cost one bcrypt round.
    dummy_digest: Arc<str>,
}

impl AuthService {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        hasher: PasswordHasher,
        jwt: Arc<JwtHandler>,
    ) -> anyhow::Result<Self> {
        let dummy_digest = hasher
            .hash("microshell-dummy-password")
            .context("Failed to prepare login digest")?;

        Ok(Self {
            store,
            hasher,
            jwt,
            dummy_digest: dummy_digest.into(),
        })
    }

    pub fn store(&self) -> &Arc<dyn CredentialStore> {
        &self.store
    }

    pub fn hasher(&self) -> PasswordHasher {
        self.hasher
    }

    pub fn jwt(&self) -> &JwtHandler {
        &self.jwt
    }

    /// Verify email and password, stamp `last_login`, and issue a token pair
    pub async fn login(&self, email: &str, password: &str) -> Result<TokenResponse, AuthError> {
        let credential = match self.store.find_by_email(email).await? {
            Some(c) if self.hasher.verify(password, &c.password_hash) => c,
            Some(_) => {
                warn!("Failed login attempt: {}", email);
                return Err(AuthError::InvalidCredentials);
            }
            None => {
                self.hasher.verify(password, &self.dummy_digest);
                warn!("Failed login attempt: {}", email);
                return Err(AuthError::InvalidCredentials);
            }
        };

        if !credential.is_active {
            warn!("Login refused for inactive user {}", credential.id);
            return Err(AuthError::AccountInactive);
        }

        let update = CredentialUpdate {
            last_login: Some(Utc::now()),
            ..Default::default()
        };
        if let Err(e) = self.store.update_credential(credential.id, update).await {
            warn!("Failed to record last login for user {}: {}", credential.id, e);
        }

        let tokens = self.issue_tokens(&credential)?;

        info!(
            "Login successful: {} ({})",
            credential.username,
            credential.claim_role()
        );

        Ok(tokens)
    }

    /// Create a new active, unverified account with the `user` role
    pub async fn register(&self, request: RegisterRequest) -> Result<Credential, AuthError> {
        validate_email(&request.email)?;
        validate_username(&request.username)?;
        validate_password("password", &request.password)?;

        if self.store.find_by_email(&request.email).await?.is_some() {
            return Err(AuthError::DuplicateEmail);
        }
        if self.store.find_by_username(&request.username).await?.is_some() {
            return Err(AuthError::DuplicateUsername);
        }

        let role = resolve_role(self.store.as_ref(), DEFAULT_ROLE, DEFAULT_ROLE_DESCRIPTION).await?;
        let password_hash = self.hasher.hash(&request.password)?;

        let credential = self
            .store
            .insert_credential(NewCredential {
                email: request.email,
                username: request.username,
                full_name: request.full_name,
                password_hash,
                role_id: role.id,
                is_active: true,
                is_verified: false,
            })
            .await?;

        info!("Registered user: {} ({})", credential.username, credential.id);

        Ok(credential)
    }

    /// Exchange a refresh token for a fresh token pair
    pub async fn refresh_token(&self, refresh_token: &str) -> Result<TokenResponse, AuthError> {
        let claims = self
            .jwt
            .decode(refresh_token)
            .map_err(|_| AuthError::InvalidRefreshToken)?;

        if claims.kind != TokenKind::Refresh {
            return Err(AuthError::InvalidRefreshToken);
        }
        let user_id = claims.user_id().ok_or(AuthError::InvalidRefreshToken)?;

        let credential = self
            .store
            .find_by_id(user_id)
            .await?
            .filter(|c| c.is_active)
            .ok_or(AuthError::InvalidRefreshToken)?;

        debug!("Refreshing tokens for user {}", credential.id);

        self.issue_tokens(&credential)
    }

    /// Replace the caller's password after checking the current one
    pub async fn change_password(
        &self,
        current_user: &Credential,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        if !self
            .hasher
            .verify(current_password, &current_user.password_hash)
        {
            return Err(AuthError::IncorrectPassword);
        }
        validate_password("new_password", new_password)?;

        let password_hash = self.hasher.hash(new_password)?;
        self.store
            .update_credential(
                current_user.id,
                CredentialUpdate {
                    password_hash: Some(password_hash),
                    ..Default::default()
                },
            )
            .await?;

        info!("Password changed for user {}", current_user.id);
        Ok(())
    }

    /// Resolve the credential behind an access token
    pub async fn resolve_identity(&self, token: &str) -> Result<Credential, AuthError> {
        let claims = self
            .jwt
            .decode(token)
            .map_err(|_| AuthError::Unauthenticated)?;

        if claims.kind != TokenKind::Access {
            return Err(AuthError::Unauthenticated);
        }
        let user_id = claims.user_id().ok_or(AuthError::Unauthenticated)?;

        let credential = self
            .store
            .find_by_id(user_id)
            .await?
            .ok_or(AuthError::Unauthenticated)?;

        if !credential.is_active {
            return Err(AuthError::AccountInactive);
        }

        Ok(credential)
    }

    /// Fail with `Forbidden` unless `identity` holds `role_name`
    pub fn require_role(identity: &Credential, role_name: &str) -> Result<(), AuthError> {
        if identity.has_role(role_name) {
            Ok(())
        } else {
            warn!(
                "User {} denied: requires role {}, has {:?}",
                identity.id,
                role_name,
                identity.role_name()
            );
            Err(AuthError::Forbidden)
        }
    }

    fn issue_tokens(&self, credential: &Credential) -> Result<TokenResponse, AuthError> {
        let access_token = self
            .jwt
            .issue_access(&TokenSubject::access(credential))
            .map_err(|e| AuthError::Internal(e.into()))?;
        let refresh_token = self
            .jwt
            .issue_refresh(&TokenSubject::refresh(credential))
            .map_err(|e| AuthError::Internal(e.into()))?;

        Ok(TokenResponse {
            access_token,
            refresh_token,
            token_type: "bearer".to_string(),
            expires_in: self.jwt.access_ttl().num_seconds(),
        })
    }
}

/// Find role `name`, creating it when absent. Losing a creation race re-reads the winner's row.
pub(crate) async fn resolve_role(
    store: &dyn CredentialStore,
    name: &str,
    description: &str,
) -> Result<Role, AuthError> {
    if let Some(role) = store.find_role_by_name(name).await? {
        return Ok(role);
    }

    match store.insert_role(name, Some(description)).await {
        Ok(role) => Ok(role),
        Err(StoreError::Conflict { .. }) => store
            .find_role_by_name(name)
            .await?
            .ok_or(AuthError::StoreConflict),
        Err(e) => Err(e.into()),
    }
}
