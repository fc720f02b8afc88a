use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::{Party, User};

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateUserRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub password_confirmation: String,
}

/// Absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub password_confirmation: Option<String>,
    /// `true` grants the admin role, `false` revokes it.
    pub admin: Option<bool>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct UserList {
    #[schema(value_type = Vec<User>)]
    pub items: Vec<User>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct PartyList {
    #[schema(value_type = Vec<Party>)]
    pub items: Vec<Party>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MessageData {
    pub message: String,
}
