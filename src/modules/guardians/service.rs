use anyhow::anyhow;
use sqlx::PgPool;
use tracing::instrument;
use uuid::Uuid;

use rollbook_core::permissions;
use rollbook_core::{AppError, PaginationMeta};

use crate::middleware::auth::Principal;
use crate::modules::audit::service::AuditService;
use crate::utils::authz;

use super::model::{
    CreateGuardianDto, Guardian, GuardianFilterParams, PaginatedGuardiansResponse,
    UpdateGuardianDto,
};

const GUARDIAN_COLUMNS: &str =
    "id, first_name, last_name, email, phone, created_at, updated_at";

/// Case-insensitive duplicate check on the optional email, excluding
/// `exclude_id` so updates don't collide with the row being edited.
async fn email_taken(
    db: &PgPool,
    email: &str,
    exclude_id: Option<Uuid>,
) -> Result<bool, AppError> {
    let taken = match exclude_id {
        Some(id) => {
            sqlx::query_scalar::<_, bool>(
                "SELECT EXISTS(SELECT 1 FROM guardians WHERE LOWER(email) = LOWER($1) AND id <> $2)",
            )
            .bind(email)
            .bind(id)
            .fetch_one(db)
            .await?
        }
        None => {
            sqlx::query_scalar::<_, bool>(
                "SELECT EXISTS(SELECT 1 FROM guardians WHERE LOWER(email) = LOWER($1))",
            )
            .bind(email)
            .fetch_one(db)
            .await?
        }
    };

    Ok(taken)
}

pub struct GuardianService;

impl GuardianService {
    #[instrument(skip(db, principal))]
    pub async fn create_guardian(
        db: &PgPool,
        principal: &Principal,
        dto: CreateGuardianDto,
    ) -> Result<Guardian, AppError> {
        authz::require(principal, permissions::MANAGE_GUARDIANS)?;

        if let Some(email) = &dto.email
            && email_taken(db, email, None).await?
        {
            return Err(AppError::bad_request(anyhow!(
                "A guardian with this email already exists"
            )));
        }

        let guardian = sqlx::query_as::<_, Guardian>(&format!(
            "INSERT INTO guardians (first_name, last_name, email, phone)
             VALUES ($1, $2, $3, $4)
             RETURNING {GUARDIAN_COLUMNS}"
        ))
        .bind(&dto.first_name)
        .bind(&dto.last_name)
        .bind(&dto.email)
        .bind(&dto.phone)
        .fetch_one(db)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e
                && db_err.is_unique_violation()
            {
                return AppError::conflict();
            }
            AppError::from(e)
        })?;

        AuditService::record(
            db,
            Some(principal.id),
            "create",
            "guardian",
            Some(guardian.id),
            Some(format!("{} {}", guardian.first_name, guardian.last_name)),
        )
        .await;

        Ok(guardian)
    }

    #[instrument(skip(db, principal))]
    pub async fn get_guardians(
        db: &PgPool,
        principal: &Principal,
        params: GuardianFilterParams,
    ) -> Result<PaginatedGuardiansResponse, AppError> {
        authz::require(principal, permissions::VIEW_DIRECTORY)?;

        let limit = params.pagination.limit();
        let offset = params.pagination.offset();

        let mut where_clause = String::from(" WHERE 1=1");
        let mut name_bind: Option<String> = None;

        if let Some(name) = &params.name {
            name_bind = Some(format!("%{}%", name));
            where_clause.push_str(" AND (first_name ILIKE $1 OR last_name ILIKE $1)");
        }

        let data_query = format!(
            "SELECT {GUARDIAN_COLUMNS} FROM guardians {where_clause}
             ORDER BY last_name, first_name LIMIT {limit} OFFSET {offset}"
        );
        let count_query = format!("SELECT COUNT(*) FROM guardians {where_clause}");

        let mut data_sql = sqlx::query_as::<_, Guardian>(&data_query);
        let mut count_sql = sqlx::query_scalar::<_, i64>(&count_query);
        if let Some(bind) = &name_bind {
            data_sql = data_sql.bind(bind);
            count_sql = count_sql.bind(bind);
        }

        let guardians = data_sql.fetch_all(db).await?;
        let total = count_sql.fetch_one(db).await?;

        let has_more = offset + (guardians.len() as i64) < total;

        Ok(PaginatedGuardiansResponse {
            data: guardians,
            meta: PaginationMeta {
                total,
                limit,
                offset: Some(offset),
                page: params.pagination.page(),
                has_more,
            },
        })
    }

    #[instrument(skip(db, principal))]
    pub async fn get_guardian_by_id(
        db: &PgPool,
        principal: &Principal,
        id: Uuid,
    ) -> Result<Guardian, AppError> {
        authz::require(principal, permissions::VIEW_DIRECTORY)?;

        sqlx::query_as::<_, Guardian>(&format!(
            "SELECT {GUARDIAN_COLUMNS} FROM guardians WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow!("Guardian not found: {}", id)))
    }

    #[instrument(skip(db, principal))]
    pub async fn update_guardian(
        db: &PgPool,
        principal: &Principal,
        id: Uuid,
        dto: UpdateGuardianDto,
    ) -> Result<Guardian, AppError> {
        authz::require(principal, permissions::MANAGE_GUARDIANS)?;

        let existing = sqlx::query_as::<_, Guardian>(&format!(
            "SELECT {GUARDIAN_COLUMNS} FROM guardians WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow!("Guardian not found: {}", id)))?;

        if let Some(email) = &dto.email
            && email_taken(db, email, Some(id)).await?
        {
            return Err(AppError::bad_request(anyhow!(
                "A guardian with this email already exists"
            )));
        }

        let first_name = dto.first_name.unwrap_or(existing.first_name);
        let last_name = dto.last_name.unwrap_or(existing.last_name);
        let email = dto.email.or(existing.email);
        let phone = dto.phone.or(existing.phone);

        let guardian = sqlx::query_as::<_, Guardian>(&format!(
            "UPDATE guardians
             SET first_name = $1, last_name = $2, email = $3, phone = $4, updated_at = NOW()
             WHERE id = $5
             RETURNING {GUARDIAN_COLUMNS}"
        ))
        .bind(&first_name)
        .bind(&last_name)
        .bind(&email)
        .bind(&phone)
        .bind(id)
        .fetch_one(db)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e
                && db_err.is_unique_violation()
            {
                return AppError::conflict();
            }
            AppError::from(e)
        })?;

        AuditService::record(
            db,
            Some(principal.id),
            "update",
            "guardian",
            Some(guardian.id),
            None,
        )
        .await;

        Ok(guardian)
    }

    /// Unconditional delete; student and user links to this guardian are
    /// left dangling and nulled out by readers.
    #[instrument(skip(db, principal))]
    pub async fn delete_guardian(
        db: &PgPool,
        principal: &Principal,
        id: Uuid,
    ) -> Result<(), AppError> {
        authz::require(principal, permissions::MANAGE_GUARDIANS)?;

        let result = sqlx::query("DELETE FROM guardians WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(anyhow!("Guardian not found: {}", id)));
        }

        AuditService::record(db, Some(principal.id), "delete", "guardian", Some(id), None).await;

        Ok(())
    }
}
