//! User Management Service
//! Admin-only listing, creation, update, deletion and (de)activation of accounts

use crate::auth::{
    errors::AuthError,
    models::{
        Credential, CredentialUpdate, NewCredential, Role, UserFilter, UserResponse, DEFAULT_ROLE,
        DEFAULT_ROLE_DESCRIPTION,
    },
    password::PasswordHasher,
    service::resolve_role,
    user_store::CredentialStore,
    validation::{validate_email, validate_password, validate_username},
};
use crate::users::models::{
    UserCreate, UserListQuery, UserListResponse, UserUpdate, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE,
};
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub struct UserService {
    store: Arc<dyn CredentialStore>,
    hasher: PasswordHasher,
}

impl UserService {
    pub fn new(store: Arc<dyn CredentialStore>, hasher: PasswordHasher) -> Self {
        Self { store, hasher }
    }

    pub async fn list_users(&self, query: &UserListQuery) -> Result<UserListResponse, AuthError> {
        let page = query.page.unwrap_or(1);
        let per_page = query.per_page.unwrap_or(DEFAULT_PAGE_SIZE);

        if page < 1 {
            return Err(AuthError::validation("page", "Page must be at least 1"));
        }
        if !(1..=MAX_PAGE_SIZE).contains(&per_page) {
            return Err(AuthError::validation(
                "per_page",
                format!("Page size must be between 1 and {MAX_PAGE_SIZE}"),
            ));
        }

        let filter = UserFilter {
            search: query.search.clone(),
            role_name: query.role_filter.clone(),
            is_active: query.is_active,
        };
        // Past the addressable range is simply past the last row
        let offset = (page - 1).saturating_mul(per_page);
        let (users, total) = self.store.list_credentials(&filter, offset, per_page).await?;

        let total_pages = total.div_ceil(per_page);

        Ok(UserListResponse {
            users: users.iter().map(UserResponse::from_credential).collect(),
            total,
            page,
            per_page,
            has_next: page < total_pages,
            has_prev: page > 1,
        })
    }

    pub async fn get_user(&self, id: i64) -> Result<Credential, AuthError> {
        self.store
            .find_by_id(id)
            .await?
            .ok_or(AuthError::UserNotFound)
    }

    pub async fn create_user(&self, input: UserCreate) -> Result<Credential, AuthError> {
        validate_email(&input.email)?;
        validate_username(&input.username)?;
        validate_password("password", &input.password)?;

        if self.store.find_by_email(&input.email).await?.is_some() {
            return Err(AuthError::DuplicateEmail);
        }
        if self.store.find_by_username(&input.username).await?.is_some() {
            return Err(AuthError::DuplicateUsername);
        }

        let role_id = match input.role_id {
            Some(id) => self.known_role(id).await?.id,
            None => {
                resolve_role(self.store.as_ref(), DEFAULT_ROLE, DEFAULT_ROLE_DESCRIPTION)
                    .await?
                    .id
            }
        };

        let password_hash = self.hasher.hash(&input.password)?;
        let credential = self
            .store
            .insert_credential(NewCredential {
                email: input.email,
                username: input.username,
                full_name: input.full_name,
                password_hash,
                role_id,
                is_active: input.is_active.unwrap_or(true),
                is_verified: false,
            })
            .await?;

        info!(
            "User created: {} ({})",
            credential.username,
            credential.claim_role()
        );

        Ok(credential)
    }

    pub async fn update_user(&self, id: i64, input: UserUpdate) -> Result<Credential, AuthError> {
        let existing = self.get_user(id).await?;

        if let Some(email) = &input.email {
            validate_email(email)?;
            if *email != existing.email && self.store.find_by_email(email).await?.is_some() {
                return Err(AuthError::DuplicateEmail);
            }
        }
        if let Some(username) = &input.username {
            validate_username(username)?;
            if *username != existing.username
                && self.store.find_by_username(username).await?.is_some()
            {
                return Err(AuthError::DuplicateUsername);
            }
        }
        if let Some(role_id) = input.role_id {
            self.known_role(role_id).await?;
        }

        self.store
            .update_credential(
                id,
                CredentialUpdate {
                    email: input.email,
                    username: input.username,
                    full_name: input.full_name,
                    is_active: input.is_active,
                    role_id: input.role_id,
                    ..Default::default()
                },
            )
            .await?;

        info!("User updated: {}", id);

        self.get_user(id).await
    }

    pub async fn delete_user(&self, actor: &Credential, id: i64) -> Result<(), AuthError> {
        let target = self.get_user(id).await?;
        if target.id == actor.id {
            return Err(AuthError::CannotModifySelf("delete"));
        }

        self.store.delete_credential(target.id).await?;
        info!("User {} deleted by {}", target.id, actor.id);
        Ok(())
    }

    pub async fn set_active(
        &self,
        actor: &Credential,
        id: i64,
        active: bool,
    ) -> Result<Credential, AuthError> {
        let target = self.get_user(id).await?;
        if !active && target.id == actor.id {
            return Err(AuthError::CannotModifySelf("deactivate"));
        }

        self.store
            .update_credential(
                target.id,
                CredentialUpdate {
                    is_active: Some(active),
                    ..Default::default()
                },
            )
            .await?;

        info!(
            "User {} {} by {}",
            target.id,
            if active { "activated" } else { "deactivated" },
            actor.id
        );

        self.get_user(id).await
    }

    pub async fn list_roles(&self) -> Result<Vec<Role>, AuthError> {
        Ok(self.store.list_roles().await?)
    }

    async fn known_role(&self, id: i64) -> Result<Role, AuthError> {
        self.store
            .find_role_by_id(id)
            .await?
            .ok_or(AuthError::InvalidRole)
    }
}
