//! Request and response bodies of the user-management routes

use crate::auth::models::UserResponse;
use serde::{Deserialize, Deserializer, Serialize};

pub const DEFAULT_PAGE_SIZE: u64 = 10;
pub const MAX_PAGE_SIZE: u64 = 100;

/// Create user request (admin)
#[derive(Debug, Clone, Deserialize)]
pub struct UserCreate {
    pub email: String,
    pub username: String,
    pub full_name: Option<String>,
    pub password: String,
    /// Defaults to the `user` role when absent
    pub role_id: Option<i64>,
    pub is_active: Option<bool>,
}

/// Partial user update (admin)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserUpdate {
    pub email: Option<String>,
    pub username: Option<String>,
    /// Absent leaves the name alone; an explicit `null` clears it
    #[serde(default, deserialize_with = "present")]
    pub full_name: Option<Option<String>>,
    pub is_active: Option<bool>,
    pub role_id: Option<i64>,
}

/// Query string of `GET /api/users`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserListQuery {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
    pub search: Option<String>,
    pub role_filter: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserListResponse {
    pub users: Vec<UserResponse>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
    pub has_next: bool,
    pub has_prev: bool,
}

/// Marks a field as present, so `null` and absent deserialize differently.
fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}
