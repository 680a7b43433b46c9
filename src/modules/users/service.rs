use anyhow::anyhow;
use sqlx::PgPool;
use tracing::instrument;
use uuid::Uuid;

use rollbook_core::permissions;
use rollbook_core::{AppError, PaginationMeta, hash_password, verify_password};

use crate::middleware::auth::Principal;
use crate::modules::audit::service::AuditService;
use crate::utils::authz;

use super::model::{
    ChangePasswordDto, CreateUserDto, PaginatedUsersResponse, UpdateUserDto, User, UserFilterParams,
    UserWithRole,
};

const USER_COLUMNS: &str =
    "id, first_name, last_name, email, enabled, role_id, guardian_id, created_at, updated_at";

async fn role_exists(db: &PgPool, role_id: Uuid) -> Result<bool, AppError> {
    Ok(
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM roles WHERE id = $1)")
            .bind(role_id)
            .fetch_one(db)
            .await?,
    )
}

async fn guardian_exists(db: &PgPool, guardian_id: Uuid) -> Result<bool, AppError> {
    Ok(
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM guardians WHERE id = $1)")
            .bind(guardian_id)
            .fetch_one(db)
            .await?,
    )
}

pub struct UserService;

impl UserService {
    #[instrument(skip(db, principal, dto))]
    pub async fn create_user(
        db: &PgPool,
        principal: &Principal,
        dto: CreateUserDto,
    ) -> Result<User, AppError> {
        authz::require(principal, permissions::MANAGE_USERS)?;

        let duplicate = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM users WHERE LOWER(email) = LOWER($1))",
        )
        .bind(&dto.email)
        .fetch_one(db)
        .await?;

        if duplicate {
            return Err(AppError::bad_request(anyhow!(
                "A user with this email already exists"
            )));
        }

        if !role_exists(db, dto.role_id).await? {
            return Err(AppError::bad_request(anyhow!(
                "Role does not exist: {}",
                dto.role_id
            )));
        }

        if let Some(guardian_id) = dto.guardian_id
            && !guardian_exists(db, guardian_id).await?
        {
            return Err(AppError::bad_request(anyhow!(
                "Guardian does not exist: {}",
                guardian_id
            )));
        }

        let hashed_password = hash_password(&dto.password)?;

        let user = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (first_name, last_name, email, password, enabled, role_id, guardian_id)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING {USER_COLUMNS}"
        ))
        .bind(&dto.first_name)
        .bind(&dto.last_name)
        .bind(&dto.email)
        .bind(&hashed_password)
        .bind(dto.enabled.unwrap_or(true))
        .bind(dto.role_id)
        .bind(dto.guardian_id)
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
            "user",
            Some(user.id),
            Some(format!("email={}", user.email)),
        )
        .await;

        Ok(user)
    }

    #[instrument(skip(db, principal))]
    pub async fn get_users(
        db: &PgPool,
        principal: &Principal,
        params: UserFilterParams,
    ) -> Result<PaginatedUsersResponse, AppError> {
        authz::require(principal, permissions::MANAGE_USERS)?;

        let limit = params.pagination.limit();
        let offset = params.pagination.offset();

        let mut where_clause = String::from(" WHERE 1=1");
        let mut binds: Vec<String> = Vec::new();

        if let Some(email) = &params.email {
            binds.push(format!("%{}%", email));
            where_clause.push_str(&format!(" AND u.email ILIKE ${}", binds.len()));
        }
        if let Some(name) = &params.name {
            binds.push(format!("%{}%", name));
            where_clause.push_str(&format!(
                " AND (u.first_name ILIKE ${n} OR u.last_name ILIKE ${n})",
                n = binds.len()
            ));
        }

        // role_id binds as a Uuid, appended after the string filters.
        let role_filter = params.role_id.map(|role_id| {
            let position = binds.len() + 1;
            (role_id, format!(" AND u.role_id = ${}", position))
        });
        if let Some((_, clause)) = &role_filter {
            where_clause.push_str(clause);
        }

        let data_query = format!(
            "SELECT u.id, u.first_name, u.last_name, u.email, u.enabled, u.role_id,
                    r.name AS role_name, u.guardian_id, u.created_at, u.updated_at
             FROM users u
             LEFT JOIN roles r ON r.id = u.role_id
             {where_clause}
             ORDER BY u.last_name, u.first_name
             LIMIT {limit} OFFSET {offset}"
        );
        let count_query = format!("SELECT COUNT(*) FROM users u {where_clause}");

        let mut data_sql = sqlx::query_as::<_, UserWithRole>(&data_query);
        let mut count_sql = sqlx::query_scalar::<_, i64>(&count_query);
        for bind in &binds {
            data_sql = data_sql.bind(bind);
            count_sql = count_sql.bind(bind);
        }
        if let Some((role_id, _)) = role_filter {
            data_sql = data_sql.bind(role_id);
            count_sql = count_sql.bind(role_id);
        }

        let users = data_sql.fetch_all(db).await?;
        let total = count_sql.fetch_one(db).await?;

        let has_more = offset + (users.len() as i64) < total;

        Ok(PaginatedUsersResponse {
            data: users,
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
    pub async fn get_user_by_id(
        db: &PgPool,
        principal: &Principal,
        id: Uuid,
    ) -> Result<UserWithRole, AppError> {
        authz::require(principal, permissions::MANAGE_USERS)?;

        sqlx::query_as::<_, UserWithRole>(
            r#"SELECT u.id, u.first_name, u.last_name, u.email, u.enabled, u.role_id,
                      r.name AS role_name, u.guardian_id, u.created_at, u.updated_at
               FROM users u
               LEFT JOIN roles r ON r.id = u.role_id
               WHERE u.id = $1"#,
        )
        .bind(id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow!("User not found: {}", id)))
    }

    #[instrument(skip(db, principal, dto))]
    pub async fn update_user(
        db: &PgPool,
        principal: &Principal,
        id: Uuid,
        dto: UpdateUserDto,
    ) -> Result<User, AppError> {
        authz::require(principal, permissions::MANAGE_USERS)?;

        let existing = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow!("User not found: {}", id)))?;

        if let Some(role_id) = dto.role_id
            && !role_exists(db, role_id).await?
        {
            return Err(AppError::bad_request(anyhow!(
                "Role does not exist: {}",
                role_id
            )));
        }

        if let Some(guardian_id) = dto.guardian_id
            && !guardian_exists(db, guardian_id).await?
        {
            return Err(AppError::bad_request(anyhow!(
                "Guardian does not exist: {}",
                guardian_id
            )));
        }

        let first_name = dto.first_name.unwrap_or(existing.first_name);
        let last_name = dto.last_name.unwrap_or(existing.last_name);
        let role_id = dto.role_id.unwrap_or(existing.role_id);
        let guardian_id = dto.guardian_id.or(existing.guardian_id);
        let enabled = dto.enabled.unwrap_or(existing.enabled);

        let user = sqlx::query_as::<_, User>(&format!(
            "UPDATE users
             SET first_name = $1, last_name = $2, role_id = $3, guardian_id = $4,
                 enabled = $5, updated_at = NOW()
             WHERE id = $6
             RETURNING {USER_COLUMNS}"
        ))
        .bind(&first_name)
        .bind(&last_name)
        .bind(role_id)
        .bind(guardian_id)
        .bind(enabled)
        .bind(id)
        .fetch_one(db)
        .await?;

        AuditService::record(
            db,
            Some(principal.id),
            "update",
            "user",
            Some(user.id),
            Some(format!("email={} enabled={}", user.email, user.enabled)),
        )
        .await;

        Ok(user)
    }

    #[instrument(skip(db, principal))]
    pub async fn delete_user(
        db: &PgPool,
        principal: &Principal,
        id: Uuid,
    ) -> Result<(), AppError> {
        authz::require(principal, permissions::MANAGE_USERS)?;

        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(anyhow!("User not found: {}", id)));
        }

        AuditService::record(db, Some(principal.id), "delete", "user", Some(id), None).await;

        Ok(())
    }

    /// Self-service password change; no permission bit required, but the
    /// current password must verify first.
    #[instrument(skip(db, principal, dto))]
    pub async fn change_password(
        db: &PgPool,
        principal: &Principal,
        dto: ChangePasswordDto,
    ) -> Result<(), AppError> {
        let current_hash =
            sqlx::query_scalar::<_, String>("SELECT password FROM users WHERE id = $1")
                .bind(principal.id)
                .fetch_optional(db)
                .await?
                .ok_or_else(|| {
                    AppError::not_found(anyhow!("User not found: {}", principal.id))
                })?;

        if !verify_password(&dto.current_password, &current_hash)? {
            return Err(AppError::bad_request(anyhow!(
                "Current password is incorrect"
            )));
        }

        let hashed = hash_password(&dto.new_password)?;

        sqlx::query("UPDATE users SET password = $1, updated_at = NOW() WHERE id = $2")
            .bind(&hashed)
            .bind(principal.id)
            .execute(db)
            .await?;

        AuditService::record(
            db,
            Some(principal.id),
            "change_password",
            "user",
            Some(principal.id),
            None,
        )
        .await;

        Ok(())
    }
}
