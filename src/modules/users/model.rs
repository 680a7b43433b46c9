//! User data models and DTOs.
//!
//! The [`User`] entity never carries the password hash: services select
//! explicit column lists and the hash only ever appears in throwaway row
//! structs private to the operations that verify it.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// An authenticatable principal.
///
/// Every user has exactly one role; the link is enforced at the
/// application layer (not by a foreign key) so that role deletion stays
/// unconditional. The guardian link is a weak reference.
#[derive(Serialize, Deserialize, FromRow, Debug, Clone, PartialEq, Eq, ToSchema)]
pub struct User {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub enabled: bool,
    pub role_id: Uuid,
    pub guardian_id: Option<Uuid>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// User joined with its role's name, for list/detail responses.
#[derive(Serialize, Deserialize, FromRow, Debug, Clone, ToSchema)]
pub struct UserWithRole {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub enabled: bool,
    pub role_id: Uuid,
    /// None when the role link dangles
    pub role_name: Option<String>,
    pub guardian_id: Option<Uuid>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

// DTOs

#[derive(Deserialize, Debug, Clone, Validate, ToSchema)]
pub struct CreateUserDto {
    #[validate(length(min = 1, message = "first_name is required"))]
    pub first_name: String,
    #[validate(length(min = 1, message = "last_name is required"))]
    pub last_name: String,
    #[validate(email(message = "email must be a valid email address"))]
    pub email: String,
    #[validate(length(min = 8, message = "password must be at least 8 characters"))]
    pub password: String,
    pub role_id: Uuid,
    pub guardian_id: Option<Uuid>,
    /// Defaults to enabled when omitted
    pub enabled: Option<bool>,
}

#[derive(Deserialize, Debug, Clone, Validate, ToSchema)]
pub struct UpdateUserDto {
    #[validate(length(min = 1, message = "first_name must not be blank"))]
    pub first_name: Option<String>,
    #[validate(length(min = 1, message = "last_name must not be blank"))]
    pub last_name: Option<String>,
    pub role_id: Option<Uuid>,
    pub guardian_id: Option<Uuid>,
    pub enabled: Option<bool>,
}

#[derive(Deserialize, Debug, Clone, Validate, ToSchema)]
pub struct ChangePasswordDto {
    #[validate(length(min = 1, message = "current_password is required"))]
    #[serde(alias = "old_password")]
    pub current_password: String,
    #[validate(length(min = 8, message = "new_password must be at least 8 characters"))]
    pub new_password: String,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct UserFilterParams {
    pub email: Option<String>,
    /// Substring match against first or last name
    pub name: Option<String>,
    pub role_id: Option<Uuid>,
    #[serde(flatten)]
    pub pagination: rollbook_core::PaginationParams,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PaginatedUsersResponse {
    pub data: Vec<UserWithRole>,
    pub meta: rollbook_core::PaginationMeta,
}
