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
use crate::validator::ValidatedJson;

use super::model::{
    AttendanceRecord, AttendanceSession, CreateSessionDto, PaginatedSessionsResponse,
    RecordAttendanceDto, SessionFilterParams,
};
use super::service::AttendanceService;

/// Create an attendance session for a class on a date
#[utoipa::path(
    post,
    path = "/api/attendance/sessions",
    request_body = CreateSessionDto,
    responses(
        (status = 201, description = "Session created", body = AttendanceSession),
        (status = 400, description = "A session for this class and date already exists"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - requires edit_attendance"),
        (status = 404, description = "Class not found")
    ),
    tag = "Attendance",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn create_session(
    State(state): State<AppState>,
    CurrentUser(principal): CurrentUser,
    Json(dto): Json<CreateSessionDto>,
) -> Result<(StatusCode, Json<AttendanceSession>), AppError> {
    let session = AttendanceService::create_session(&state.db, &principal, dto).await?;
    Ok((StatusCode::CREATED, Json(session)))
}

/// List attendance sessions, optionally filtered by class
#[utoipa::path(
    get,
    path = "/api/attendance/sessions",
    responses(
        (status = 200, description = "Paginated sessions", body = PaginatedSessionsResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - requires view_attendance")
    ),
    tag = "Attendance",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_sessions(
    State(state): State<AppState>,
    CurrentUser(principal): CurrentUser,
    Query(params): Query<SessionFilterParams>,
) -> Result<Json<PaginatedSessionsResponse>, AppError> {
    let sessions = AttendanceService::get_sessions(&state.db, &principal, params).await?;
    Ok(Json(sessions))
}

/// Record (or overwrite) one student's attendance in a session
#[utoipa::path(
    post,
    path = "/api/attendance/sessions/{id}/records",
    params(("id" = Uuid, Path, description = "Session ID")),
    request_body = RecordAttendanceDto,
    responses(
        (status = 200, description = "Attendance recorded", body = AttendanceRecord),
        (status = 400, description = "Invalid status or student not enrolled"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - requires edit_attendance"),
        (status = 404, description = "Session not found")
    ),
    tag = "Attendance",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn record_attendance(
    State(state): State<AppState>,
    CurrentUser(principal): CurrentUser,
    Path(id): Path<Uuid>,
    ValidatedJson(dto): ValidatedJson<RecordAttendanceDto>,
) -> Result<Json<AttendanceRecord>, AppError> {
    let record = AttendanceService::record_attendance(&state.db, &principal, id, dto).await?;
    Ok(Json(record))
}

/// List a session's attendance records
#[utoipa::path(
    get,
    path = "/api/attendance/sessions/{id}/records",
    params(("id" = Uuid, Path, description = "Session ID")),
    responses(
        (status = 200, description = "The session's records", body = Vec<AttendanceRecord>),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - requires view_attendance"),
        (status = 404, description = "Session not found")
    ),
    tag = "Attendance",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_records(
    State(state): State<AppState>,
    CurrentUser(principal): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<AttendanceRecord>>, AppError> {
    let records = AttendanceService::get_records(&state.db, &principal, id).await?;
    Ok(Json(records))
}
