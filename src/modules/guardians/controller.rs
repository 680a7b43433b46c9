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
    CreateGuardianDto, Guardian, GuardianFilterParams, PaginatedGuardiansResponse,
    UpdateGuardianDto,
};
use super::service::GuardianService;

/// Create a guardian
#[utoipa::path(
    post,
    path = "/api/guardians",
    request_body = CreateGuardianDto,
    responses(
        (status = 201, description = "Guardian created", body = Guardian),
        (status = 400, description = "Duplicate email or blank name"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - requires manage_guardians")
    ),
    tag = "Guardians",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn create_guardian(
    State(state): State<AppState>,
    CurrentUser(principal): CurrentUser,
    ValidatedJson(dto): ValidatedJson<CreateGuardianDto>,
) -> Result<(StatusCode, Json<Guardian>), AppError> {
    let guardian = GuardianService::create_guardian(&state.db, &principal, dto).await?;
    Ok((StatusCode::CREATED, Json(guardian)))
}

/// List guardians
#[utoipa::path(
    get,
    path = "/api/guardians",
    responses(
        (status = 200, description = "Paginated guardians", body = PaginatedGuardiansResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - requires view_directory")
    ),
    tag = "Guardians",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_guardians(
    State(state): State<AppState>,
    CurrentUser(principal): CurrentUser,
    Query(params): Query<GuardianFilterParams>,
) -> Result<Json<PaginatedGuardiansResponse>, AppError> {
    let guardians = GuardianService::get_guardians(&state.db, &principal, params).await?;
    Ok(Json(guardians))
}

/// Get a guardian by id
#[utoipa::path(
    get,
    path = "/api/guardians/{id}",
    params(("id" = Uuid, Path, description = "Guardian ID")),
    responses(
        (status = 200, description = "The guardian", body = Guardian),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - requires view_directory"),
        (status = 404, description = "Guardian not found")
    ),
    tag = "Guardians",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_guardian_by_id(
    State(state): State<AppState>,
    CurrentUser(principal): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Guardian>, AppError> {
    let guardian = GuardianService::get_guardian_by_id(&state.db, &principal, id).await?;
    Ok(Json(guardian))
}

/// Update a guardian
#[utoipa::path(
    put,
    path = "/api/guardians/{id}",
    params(("id" = Uuid, Path, description = "Guardian ID")),
    request_body = UpdateGuardianDto,
    responses(
        (status = 200, description = "Guardian updated", body = Guardian),
        (status = 400, description = "Duplicate email or blank name"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - requires manage_guardians"),
        (status = 404, description = "Guardian not found")
    ),
    tag = "Guardians",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn update_guardian(
    State(state): State<AppState>,
    CurrentUser(principal): CurrentUser,
    Path(id): Path<Uuid>,
    ValidatedJson(dto): ValidatedJson<UpdateGuardianDto>,
) -> Result<Json<Guardian>, AppError> {
    let guardian = GuardianService::update_guardian(&state.db, &principal, id, dto).await?;
    Ok(Json(guardian))
}

/// Delete a guardian
#[utoipa::path(
    delete,
    path = "/api/guardians/{id}",
    params(("id" = Uuid, Path, description = "Guardian ID")),
    responses(
        (status = 204, description = "Guardian deleted"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - requires manage_guardians"),
        (status = 404, description = "Guardian not found")
    ),
    tag = "Guardians",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn delete_guardian(
    State(state): State<AppState>,
    CurrentUser(principal): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    GuardianService::delete_guardian(&state.db, &principal, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
