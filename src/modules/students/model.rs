use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// A student in the directory.
///
/// `guardian_id` is a weak reference: the student does not own the
/// guardian and tolerates its absence. Single-record reads null the link
/// out when the guardian row is gone.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Student {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: chrono::NaiveDate,
    pub guardian_id: Option<Uuid>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateStudentDto {
    #[validate(length(min = 1, message = "first_name is required"))]
    pub first_name: String,
    #[validate(length(min = 1, message = "last_name is required"))]
    pub last_name: String,
    pub date_of_birth: chrono::NaiveDate,
    pub guardian_id: Option<Uuid>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpdateStudentDto {
    #[validate(length(min = 1, message = "first_name must not be blank"))]
    pub first_name: Option<String>,
    #[validate(length(min = 1, message = "last_name must not be blank"))]
    pub last_name: Option<String>,
    pub date_of_birth: Option<chrono::NaiveDate>,
    pub guardian_id: Option<Uuid>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct StudentFilterParams {
    /// Substring match against first or last name
    pub name: Option<String>,
    pub guardian_id: Option<Uuid>,
    #[serde(flatten)]
    pub pagination: rollbook_core::PaginationParams,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PaginatedStudentsResponse {
    pub data: Vec<Student>,
    pub meta: rollbook_core::PaginationMeta,
}
