use sqlx::PgPool;
use tracing::{instrument, warn};
use uuid::Uuid;

use rollbook_core::{AppError, PaginationMeta};

use crate::middleware::auth::Principal;
use crate::utils::authz;

use super::model::{AuditEntry, AuditFilterParams, PaginatedAuditResponse};

pub struct AuditService;

impl AuditService {
    /// Appends an audit row for a mutation.
    ///
    /// Best-effort: a failed audit write is logged and swallowed so it
    /// can never fail the mutation it describes.
    pub async fn record(
        db: &PgPool,
        actor_id: Option<Uuid>,
        action: &str,
        entity: &str,
        entity_id: Option<Uuid>,
        detail: Option<String>,
    ) {
        let result = sqlx::query(
            r#"INSERT INTO audit_log (actor_id, action, entity, entity_id, detail)
               VALUES ($1, $2, $3, $4, $5)"#,
        )
        .bind(actor_id)
        .bind(action)
        .bind(entity)
        .bind(entity_id)
        .bind(detail)
        .execute(db)
        .await;

        if let Err(e) = result {
            warn!(action = %action, entity = %entity, error = %e, "Failed to write audit entry");
        }
    }

    #[instrument(skip(db, principal))]
    pub async fn get_entries(
        db: &PgPool,
        principal: &Principal,
        params: AuditFilterParams,
    ) -> Result<PaginatedAuditResponse, AppError> {
        authz::require_admin(principal)?;

        let limit = params.pagination.limit();
        let offset = params.pagination.offset();

        let (entries, total): (Vec<AuditEntry>, i64) = if let Some(entity) = &params.entity {
            let entries = sqlx::query_as::<_, AuditEntry>(
                r#"SELECT id, actor_id, action, entity, entity_id, detail, created_at
                   FROM audit_log WHERE entity = $1
                   ORDER BY created_at DESC LIMIT $2 OFFSET $3"#,
            )
            .bind(entity)
            .bind(limit)
            .bind(offset)
            .fetch_all(db)
            .await?;

            let total =
                sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM audit_log WHERE entity = $1")
                    .bind(entity)
                    .fetch_one(db)
                    .await?;

            (entries, total)
        } else {
            let entries = sqlx::query_as::<_, AuditEntry>(
                r#"SELECT id, actor_id, action, entity, entity_id, detail, created_at
                   FROM audit_log
                   ORDER BY created_at DESC LIMIT $1 OFFSET $2"#,
            )
            .bind(limit)
            .bind(offset)
            .fetch_all(db)
            .await?;

            let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM audit_log")
                .fetch_one(db)
                .await?;

            (entries, total)
        };

        let has_more = offset + (entries.len() as i64) < total;

        Ok(PaginatedAuditResponse {
            data: entries,
            meta: PaginationMeta {
                total,
                limit,
                offset: Some(offset),
                page: params.pagination.page(),
                has_more,
            },
        })
    }
}
