use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// A guardian (parent or other responsible adult).
///
/// Guardians are referenced weakly from students and users; deleting a
/// guardian is unconditional and leaves those links dangling, which
/// readers tolerate.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Guardian {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateGuardianDto {
    #[validate(length(min = 1, message = "first_name is required"))]
    pub first_name: String,
    #[validate(length(min = 1, message = "last_name is required"))]
    pub last_name: String,
    #[validate(email(message = "email must be a valid email address"))]
    pub email: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpdateGuardianDto {
    #[validate(length(min = 1, message = "first_name must not be blank"))]
    pub first_name: Option<String>,
    #[validate(length(min = 1, message = "last_name must not be blank"))]
    pub last_name: Option<String>,
    #[validate(email(message = "email must be a valid email address"))]
    pub email: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct GuardianFilterParams {
    /// Substring match against first or last name
    pub name: Option<String>,
    #[serde(flatten)]
    pub pagination: rollbook_core::PaginationParams,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PaginatedGuardiansResponse {
    pub data: Vec<Guardian>,
    pub meta: rollbook_core::PaginationMeta,
}
