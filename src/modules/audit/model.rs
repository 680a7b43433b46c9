use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// One row of the append-only audit trail.
///
/// `actor_id` is the principal that performed the mutation; it is kept as
/// a plain id (not a foreign key) so audit history survives user
/// deletion.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct AuditEntry {
    pub id: Uuid,
    pub actor_id: Option<Uuid>,
    pub action: String,
    pub entity: String,
    pub entity_id: Option<Uuid>,
    pub detail: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AuditFilterParams {
    /// Filter by entity kind (e.g. "role", "student")
    pub entity: Option<String>,
    #[serde(flatten)]
    pub pagination: rollbook_core::PaginationParams,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaginatedAuditResponse {
    pub data: Vec<AuditEntry>,
    pub meta: rollbook_core::PaginationMeta,
}
