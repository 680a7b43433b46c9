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
    Class, ClassFilterParams, CreateClassDto, PaginatedClassesResponse, UpdateClassDto,
};

const CLASS_COLUMNS: &str = "id, name, subject, teacher_id, created_at, updated_at";

async fn teacher_user_exists(db: &PgPool, user_id: Uuid) -> Result<bool, AppError> {
    Ok(
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE id = $1)")
            .bind(user_id)
            .fetch_one(db)
            .await?,
    )
}

async fn name_taken(db: &PgPool, name: &str, exclude_id: Option<Uuid>) -> Result<bool, AppError> {
    let taken = match exclude_id {
        Some(id) => {
            sqlx::query_scalar::<_, bool>(
                "SELECT EXISTS(SELECT 1 FROM classes WHERE UPPER(name) = UPPER($1) AND id <> $2)",
            )
            .bind(name)
            .bind(id)
            .fetch_one(db)
            .await?
        }
        None => {
            sqlx::query_scalar::<_, bool>(
                "SELECT EXISTS(SELECT 1 FROM classes WHERE UPPER(name) = UPPER($1))",
            )
            .bind(name)
            .fetch_one(db)
            .await?
        }
    };

    Ok(taken)
}

pub struct ClassService;

impl ClassService {
    /// Class mutations are privileged: administrator identity required,
    /// not a fine-grained bit.
    #[instrument(skip(db, principal))]
    pub async fn create_class(
        db: &PgPool,
        principal: &Principal,
        dto: CreateClassDto,
    ) -> Result<Class, AppError> {
        authz::require_admin(principal)?;

        let name = dto.name.trim().to_string();
        if name.is_empty() {
            return Err(AppError::bad_request(anyhow!("Class name must not be blank")));
        }

        if name_taken(db, &name, None).await? {
            return Err(AppError::bad_request(anyhow!(
                "A class with this name already exists"
            )));
        }

        if let Some(teacher_id) = dto.teacher_id
            && !teacher_user_exists(db, teacher_id).await?
        {
            return Err(AppError::bad_request(anyhow!(
                "Teacher does not exist: {}",
                teacher_id
            )));
        }

        let class = sqlx::query_as::<_, Class>(&format!(
            "INSERT INTO classes (name, subject, teacher_id)
             VALUES ($1, $2, $3)
             RETURNING {CLASS_COLUMNS}"
        ))
        .bind(&name)
        .bind(&dto.subject)
        .bind(dto.teacher_id)
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
            "class",
            Some(class.id),
            Some(format!("name={}", class.name)),
        )
        .await;

        Ok(class)
    }

    #[instrument(skip(db, principal))]
    pub async fn get_classes(
        db: &PgPool,
        principal: &Principal,
        params: ClassFilterParams,
    ) -> Result<PaginatedClassesResponse, AppError> {
        authz::require(principal, permissions::VIEW_DIRECTORY)?;

        let limit = params.pagination.limit();
        let offset = params.pagination.offset();

        let mut where_clause = String::from(" WHERE 1=1");
        let mut name_bind: Option<String> = None;

        if let Some(name) = &params.name {
            name_bind = Some(format!("%{}%", name));
            where_clause.push_str(" AND name ILIKE $1");
        }

        let data_query = format!(
            "SELECT {CLASS_COLUMNS} FROM classes {where_clause}
             ORDER BY name LIMIT {limit} OFFSET {offset}"
        );
        let count_query = format!("SELECT COUNT(*) FROM classes {where_clause}");

        let mut data_sql = sqlx::query_as::<_, Class>(&data_query);
        let mut count_sql = sqlx::query_scalar::<_, i64>(&count_query);
        if let Some(bind) = &name_bind {
            data_sql = data_sql.bind(bind);
            count_sql = count_sql.bind(bind);
        }

        let classes = data_sql.fetch_all(db).await?;
        let total = count_sql.fetch_one(db).await?;

        let has_more = offset + (classes.len() as i64) < total;

        Ok(PaginatedClassesResponse {
            data: classes,
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
    pub async fn get_class_by_id(
        db: &PgPool,
        principal: &Principal,
        id: Uuid,
    ) -> Result<Class, AppError> {
        authz::require(principal, permissions::VIEW_DIRECTORY)?;

        sqlx::query_as::<_, Class>(&format!("SELECT {CLASS_COLUMNS} FROM classes WHERE id = $1"))
            .bind(id)
            .fetch_optional(db)
            .await?
            .ok_or_else(|| AppError::not_found(anyhow!("Class not found: {}", id)))
    }

    #[instrument(skip(db, principal))]
    pub async fn update_class(
        db: &PgPool,
        principal: &Principal,
        id: Uuid,
        dto: UpdateClassDto,
    ) -> Result<Class, AppError> {
        authz::require_admin(principal)?;

        let existing = sqlx::query_as::<_, Class>(&format!(
            "SELECT {CLASS_COLUMNS} FROM classes WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow!("Class not found: {}", id)))?;

        let name = match dto.name {
            Some(name) => {
                let name = name.trim().to_string();
                if name.is_empty() {
                    return Err(AppError::bad_request(anyhow!(
                        "Class name must not be blank"
                    )));
                }
                name
            }
            None => existing.name,
        };

        if name_taken(db, &name, Some(id)).await? {
            return Err(AppError::bad_request(anyhow!(
                "A class with this name already exists"
            )));
        }

        if let Some(teacher_id) = dto.teacher_id
            && !teacher_user_exists(db, teacher_id).await?
        {
            return Err(AppError::bad_request(anyhow!(
                "Teacher does not exist: {}",
                teacher_id
            )));
        }

        let subject = dto.subject.or(existing.subject);
        let teacher_id = dto.teacher_id.or(existing.teacher_id);

        let class = sqlx::query_as::<_, Class>(&format!(
            "UPDATE classes
             SET name = $1, subject = $2, teacher_id = $3, updated_at = NOW()
             WHERE id = $4
             RETURNING {CLASS_COLUMNS}"
        ))
        .bind(&name)
        .bind(&subject)
        .bind(teacher_id)
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
            "class",
            Some(class.id),
            Some(format!("name={}", class.name)),
        )
        .await;

        Ok(class)
    }

    #[instrument(skip(db, principal))]
    pub async fn delete_class(
        db: &PgPool,
        principal: &Principal,
        id: Uuid,
    ) -> Result<(), AppError> {
        authz::require_admin(principal)?;

        let result = sqlx::query("DELETE FROM classes WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(anyhow!("Class not found: {}", id)));
        }

        AuditService::record(db, Some(principal.id), "delete", "class", Some(id), None).await;

        Ok(())
    }
}
