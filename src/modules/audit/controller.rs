use axum::Json;
use axum::extract::{Query, State};
use tracing::instrument;

use rollbook_core::AppError;

use crate::middleware::auth::CurrentUser;
use crate::state::AppState;

use super::model::{AuditFilterParams, PaginatedAuditResponse};
use super::service::AuditService;

/// List audit-log entries
#[utoipa::path(
    get,
    path = "/api/audit",
    params(
        ("entity" = Option<String>, Query, description = "Filter by entity kind"),
    ),
    responses(
        (status = 200, description = "Audit entries", body = PaginatedAuditResponse),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden - administrator only")
    ),
    tag = "Audit",
    security(("bearer_auth" = []))
)]
#[instrument(skip(state))]
pub async fn get_audit_entries(
    State(state): State<AppState>,
    CurrentUser(principal): CurrentUser,
    Query(params): Query<AuditFilterParams>,
) -> Result<Json<PaginatedAuditResponse>, AppError> {
    let entries = AuditService::get_entries(&state.db, &principal, params).await?;
    Ok(Json(entries))
}
