use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// A student's membership in a class.
///
/// Invariants: one enrolment per (student, class) pair, and when an end
/// date is present it must not precede the start date.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Enrolment {
    pub id: Uuid,
    pub student_id: Uuid,
    pub class_id: Uuid,
    pub start_date: chrono::NaiveDate,
    pub end_date: Option<chrono::NaiveDate>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateEnrolmentDto {
    pub student_id: Uuid,
    pub class_id: Uuid,
    pub start_date: chrono::NaiveDate,
    pub end_date: Option<chrono::NaiveDate>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct EnrolmentFilterParams {
    pub student_id: Option<Uuid>,
    pub class_id: Option<Uuid>,
    #[serde(flatten)]
    pub pagination: rollbook_core::PaginationParams,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PaginatedEnrolmentsResponse {
    pub data: Vec<Enrolment>,
    pub meta: rollbook_core::PaginationMeta,
}
