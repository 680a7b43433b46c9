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
    CreateRoleDto, PaginatedRolesResponse, PermissionInfo, Role, RoleFilterParams, UpdateRoleDto,
};
use super::service;

/// List the permission catalogue
#[utoipa::path(
    get,
    path = "/api/roles/permissions",
    responses(
        (status = 200, description = "The compile-time permission catalogue", body = Vec<PermissionInfo>),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - administrator only")
    ),
    tag = "Roles",
    security(("bearer_auth" = []))
)]
#[instrument(skip(_state))]
pub async fn get_permissions(
    State(_state): State<AppState>,
    CurrentUser(principal): CurrentUser,
) -> Result<Json<Vec<PermissionInfo>>, AppError> {
    crate::utils::authz::require_admin(&principal)?;
    Ok(Json(service::get_permission_catalogue()))
}

/// Create a role
#[utoipa::path(
    post,
    path = "/api/roles",
    request_body = CreateRoleDto,
    responses(
        (status = 201, description = "Role created", body = Role),
        (status = 400, description = "Blank or duplicate name, negative mask"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - administrator only"),
        (status = 409, description = "Creation raced a concurrent duplicate")
    ),
    tag = "Roles",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn create_role(
    State(state): State<AppState>,
    CurrentUser(principal): CurrentUser,
    ValidatedJson(dto): ValidatedJson<CreateRoleDto>,
) -> Result<(StatusCode, Json<Role>), AppError> {
    let role = service::create_role(&state.db, &principal, dto).await?;
    Ok((StatusCode::CREATED, Json(role)))
}

/// List roles
#[utoipa::path(
    get,
    path = "/api/roles",
    responses(
        (status = 200, description = "Paginated roles", body = PaginatedRolesResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - administrator only")
    ),
    tag = "Roles",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_roles(
    State(state): State<AppState>,
    CurrentUser(principal): CurrentUser,
    Query(params): Query<RoleFilterParams>,
) -> Result<Json<PaginatedRolesResponse>, AppError> {
    let roles = service::get_roles(&state.db, &principal, params).await?;
    Ok(Json(roles))
}

/// Get a role by id
#[utoipa::path(
    get,
    path = "/api/roles/{id}",
    params(("id" = Uuid, Path, description = "Role ID")),
    responses(
        (status = 200, description = "The role", body = Role),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - administrator only"),
        (status = 404, description = "Role not found")
    ),
    tag = "Roles",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_role_by_id(
    State(state): State<AppState>,
    CurrentUser(principal): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Role>, AppError> {
    let role = service::get_role_by_id(&state.db, &principal, id).await?;
    Ok(Json(role))
}

/// Get a role by name (case-insensitive)
#[utoipa::path(
    get,
    path = "/api/roles/by-name/{name}",
    params(("name" = String, Path, description = "Role name, any casing")),
    responses(
        (status = 200, description = "The role", body = Role),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - administrator only"),
        (status = 404, description = "Role not found")
    ),
    tag = "Roles",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_role_by_name(
    State(state): State<AppState>,
    CurrentUser(principal): CurrentUser,
    Path(name): Path<String>,
) -> Result<Json<Role>, AppError> {
    let role = service::get_role_by_name(&state.db, &principal, &name).await?;
    Ok(Json(role))
}

/// Update a role
#[utoipa::path(
    put,
    path = "/api/roles/{id}",
    params(("id" = Uuid, Path, description = "Role ID")),
    request_body = UpdateRoleDto,
    responses(
        (status = 200, description = "Role updated", body = Role),
        (status = 400, description = "Blank or duplicate name, negative mask"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - administrator only"),
        (status = 404, description = "Role not found")
    ),
    tag = "Roles",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn update_role(
    State(state): State<AppState>,
    CurrentUser(principal): CurrentUser,
    Path(id): Path<Uuid>,
    ValidatedJson(dto): ValidatedJson<UpdateRoleDto>,
) -> Result<Json<Role>, AppError> {
    let role = service::update_role(&state.db, &principal, id, dto).await?;
    Ok(Json(role))
}

/// Delete a role
#[utoipa::path(
    delete,
    path = "/api/roles/{id}",
    params(("id" = Uuid, Path, description = "Role ID")),
    responses(
        (status = 204, description = "Role deleted"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - administrator only"),
        (status = 404, description = "Role not found")
    ),
    tag = "Roles",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn delete_role(
    State(state): State<AppState>,
    CurrentUser(principal): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    service::delete_role(&state.db, &principal, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
