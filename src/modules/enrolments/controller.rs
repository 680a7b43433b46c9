use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use tracing::instrument;
use uuid::Uuid;

use rollbook_core::AppError;

use crate::middleware::auth::CurrentUser;
use crate::state::AppState;

use super::model::{
    CreateEnrolmentDto, Enrolment, EnrolmentFilterParams, PaginatedEnrolmentsResponse,
};
use super::service::EnrolmentService;

/// Enrol a student in a class
#[utoipa::path(
    post,
    path = "/api/enrolments",
    request_body = CreateEnrolmentDto,
    responses(
        (status = 201, description = "Enrolment created", body = Enrolment),
        (status = 400, description = "Duplicate enrolment or end_date before start_date"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - requires manage_enrolments"),
        (status = 404, description = "Student or class not found"),
        (status = 409, description = "Creation raced a concurrent duplicate")
    ),
    tag = "Enrolments",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn enrol(
    State(state): State<AppState>,
    CurrentUser(principal): CurrentUser,
    Json(dto): Json<CreateEnrolmentDto>,
) -> Result<(StatusCode, Json<Enrolment>), AppError> {
    let enrolment = EnrolmentService::enrol(&state.db, &principal, dto).await?;
    Ok((StatusCode::CREATED, Json(enrolment)))
}

/// List enrolments, optionally filtered by student or class
#[utoipa::path(
    get,
    path = "/api/enrolments",
    responses(
        (status = 200, description = "Paginated enrolments", body = PaginatedEnrolmentsResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - requires view_directory")
    ),
    tag = "Enrolments",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_enrolments(
    State(state): State<AppState>,
    CurrentUser(principal): CurrentUser,
    Query(params): Query<EnrolmentFilterParams>,
) -> Result<Json<PaginatedEnrolmentsResponse>, AppError> {
    let enrolments = EnrolmentService::get_enrolments(&state.db, &principal, params).await?;
    Ok(Json(enrolments))
}

/// Remove an enrolment
#[utoipa::path(
    delete,
    path = "/api/enrolments/{id}",
    params(("id" = Uuid, Path, description = "Enrolment ID")),
    responses(
        (status = 204, description = "Enrolment removed"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - requires manage_enrolments"),
        (status = 404, description = "Enrolment not found")
    ),
    tag = "Enrolments",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn unenrol(
    State(state): State<AppState>,
    CurrentUser(principal): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    EnrolmentService::unenrol(&state.db, &principal, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
