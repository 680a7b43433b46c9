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
    CreateRoleDto, PaginatedRolesResponse, PermissionInfo, Role, RoleFilterParams, UpdateRoleDto,
    canonicalize_name,
};

const ROLE_COLUMNS: &str = "id, name, permission_mask, created_at, updated_at";

// ============ Permission catalogue ============

/// The compile-time permission catalogue. Roles are rows; permissions
/// never are.
pub fn get_permission_catalogue() -> Vec<PermissionInfo> {
    permissions::CATALOGUE
        .iter()
        .map(|p| PermissionInfo {
            name: p.name().to_string(),
            bit: p.bit(),
        })
        .collect()
}

// ============ Role services ============

#[instrument(skip(db, principal))]
pub async fn create_role(
    db: &PgPool,
    principal: &Principal,
    dto: CreateRoleDto,
) -> Result<Role, AppError> {
    authz::require_admin(principal)?;

    let name = canonicalize_name(&dto.name);
    if name.is_empty() {
        return Err(AppError::bad_request(anyhow!("Role name must not be blank")));
    }

    let duplicate =
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM roles WHERE UPPER(name) = $1)")
            .bind(&name)
            .fetch_one(db)
            .await?;

    if duplicate {
        return Err(AppError::bad_request(anyhow!(
            "A role with this name already exists"
        )));
    }

    let role = sqlx::query_as::<_, Role>(&format!(
        "INSERT INTO roles (name, permission_mask) VALUES ($1, $2) RETURNING {ROLE_COLUMNS}"
    ))
    .bind(&name)
    .bind(dto.permission_mask)
    .fetch_one(db)
    .await
    .map_err(|e| {
        if let sqlx::Error::Database(db_err) = &e
            && db_err.is_unique_violation()
        {
            // Raced past the application-level check.
            return AppError::conflict();
        }
        AppError::from(e)
    })?;

    AuditService::record(
        db,
        Some(principal.id),
        "create",
        "role",
        Some(role.id),
        Some(format!("name={} mask={}", role.name, role.permission_mask)),
    )
    .await;

    Ok(role)
}

#[instrument(skip(db, principal))]
pub async fn get_roles(
    db: &PgPool,
    principal: &Principal,
    params: RoleFilterParams,
) -> Result<PaginatedRolesResponse, AppError> {
    authz::require_admin(principal)?;

    let limit = params.pagination.limit();
    let offset = params.pagination.offset();

    let roles = sqlx::query_as::<_, Role>(&format!(
        "SELECT {ROLE_COLUMNS} FROM roles ORDER BY name LIMIT $1 OFFSET $2"
    ))
    .bind(limit)
    .bind(offset)
    .fetch_all(db)
    .await?;

    let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM roles")
        .fetch_one(db)
        .await?;

    let has_more = offset + (roles.len() as i64) < total;

    Ok(PaginatedRolesResponse {
        data: roles,
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
pub async fn get_role_by_id(
    db: &PgPool,
    principal: &Principal,
    id: Uuid,
) -> Result<Role, AppError> {
    authz::require_admin(principal)?;

    sqlx::query_as::<_, Role>(&format!("SELECT {ROLE_COLUMNS} FROM roles WHERE id = $1"))
        .bind(id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::not_found(anyhow!("Role not found: {}", id)))
}

#[instrument(skip(db, principal))]
pub async fn get_role_by_name(
    db: &PgPool,
    principal: &Principal,
    name: &str,
) -> Result<Role, AppError> {
    authz::require_admin(principal)?;

    let canonical = canonicalize_name(name);

    sqlx::query_as::<_, Role>(&format!(
        "SELECT {ROLE_COLUMNS} FROM roles WHERE UPPER(name) = $1"
    ))
    .bind(&canonical)
    .fetch_optional(db)
    .await?
    .ok_or_else(|| AppError::not_found(anyhow!("Role not found: {}", name.trim())))
}

#[instrument(skip(db, principal))]
pub async fn update_role(
    db: &PgPool,
    principal: &Principal,
    id: Uuid,
    dto: UpdateRoleDto,
) -> Result<Role, AppError> {
    authz::require_admin(principal)?;

    let existing = sqlx::query_as::<_, Role>(&format!(
        "SELECT {ROLE_COLUMNS} FROM roles WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(db)
    .await?
    .ok_or_else(|| AppError::not_found(anyhow!("Role not found: {}", id)))?;

    let name = match dto.name {
        Some(name) => {
            let name = canonicalize_name(&name);
            if name.is_empty() {
                return Err(AppError::bad_request(anyhow!("Role name must not be blank")));
            }
            name
        }
        None => existing.name,
    };
    let permission_mask = dto.permission_mask.unwrap_or(existing.permission_mask);

    // The uniqueness check excludes the role itself, so a no-op rename
    // is not reported as a duplicate.
    let duplicate = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM roles WHERE UPPER(name) = $1 AND id <> $2)",
    )
    .bind(&name)
    .bind(id)
    .fetch_one(db)
    .await?;

    if duplicate {
        return Err(AppError::bad_request(anyhow!(
            "A role with this name already exists"
        )));
    }

    let role = sqlx::query_as::<_, Role>(&format!(
        "UPDATE roles SET name = $1, permission_mask = $2, updated_at = NOW()
         WHERE id = $3 RETURNING {ROLE_COLUMNS}"
    ))
    .bind(&name)
    .bind(permission_mask)
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
        "role",
        Some(role.id),
        Some(format!("name={} mask={}", role.name, role.permission_mask)),
    )
    .await;

    Ok(role)
}

/// Deletes a role unconditionally: users still referencing it are left
/// with a dangling link that resolves to an empty permission mask.
#[instrument(skip(db, principal))]
pub async fn delete_role(db: &PgPool, principal: &Principal, id: Uuid) -> Result<(), AppError> {
    authz::require_admin(principal)?;

    let result = sqlx::query("DELETE FROM roles WHERE id = $1")
        .bind(id)
        .execute(db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::not_found(anyhow!("Role not found: {}", id)));
    }

    AuditService::record(db, Some(principal.id), "delete", "role", Some(id), None).await;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rollbook_core::PaginationParams;

    fn admin() -> Principal {
        Principal {
            id: Uuid::new_v4(),
            email: "admin@test.com".to_string(),
            first_name: "Admin".to_string(),
            last_name: "User".to_string(),
            guardian_id: None,
            role_name: Some("ADMIN".to_string()),
            permission_mask: permissions::ALL,
        }
    }

    fn teacher() -> Principal {
        Principal {
            permission_mask: permissions::VIEW_ATTENDANCE.bit()
                | permissions::EDIT_ATTENDANCE.bit(),
            role_name: Some("TEACHER".to_string()),
            ..admin()
        }
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_create_role_canonicalizes_name(pool: PgPool) {
        let dto = CreateRoleDto {
            name: "  registrar ".to_string(),
            permission_mask: permissions::VIEW_DIRECTORY.bit(),
        };

        let role = create_role(&pool, &admin(), dto).await.unwrap();

        assert_eq!(role.name, "REGISTRAR");
        assert_eq!(role.permission_mask, permissions::VIEW_DIRECTORY.bit());
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_create_role_rejects_blank_name(pool: PgPool) {
        let dto = CreateRoleDto {
            name: "   ".to_string(),
            permission_mask: 0,
        };

        let err = create_role(&pool, &admin(), dto).await.unwrap_err();
        assert_eq!(err.status.as_u16(), 400);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_create_role_case_insensitive_duplicate(pool: PgPool) {
        // TEACHER is seeded by the migration.
        let dto = CreateRoleDto {
            name: "teacher".to_string(),
            permission_mask: 0,
        };

        let err = create_role(&pool, &admin(), dto).await.unwrap_err();
        assert_eq!(err.status.as_u16(), 400);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_create_role_requires_admin(pool: PgPool) {
        let dto = CreateRoleDto {
            name: "REGISTRAR".to_string(),
            permission_mask: 0,
        };

        let err = create_role(&pool, &teacher(), dto).await.unwrap_err();
        assert_eq!(err.status.as_u16(), 403);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_rename_to_own_name_is_not_a_duplicate(pool: PgPool) {
        let role = create_role(
            &pool,
            &admin(),
            CreateRoleDto {
                name: "REGISTRAR".to_string(),
                permission_mask: 3,
            },
        )
        .await
        .unwrap();

        let updated = update_role(
            &pool,
            &admin(),
            role.id,
            UpdateRoleDto {
                name: Some("REGISTRAR".to_string()),
                permission_mask: None,
            },
        )
        .await
        .unwrap();

        assert_eq!(updated.name, "REGISTRAR");
        assert_eq!(updated.permission_mask, 3);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_rename_to_other_existing_name_is_a_duplicate(pool: PgPool) {
        let role = create_role(
            &pool,
            &admin(),
            CreateRoleDto {
                name: "REGISTRAR".to_string(),
                permission_mask: 0,
            },
        )
        .await
        .unwrap();

        let err = update_role(
            &pool,
            &admin(),
            role.id,
            UpdateRoleDto {
                name: Some("Teacher".to_string()),
                permission_mask: None,
            },
        )
        .await
        .unwrap_err();

        assert_eq!(err.status.as_u16(), 400);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_update_role_not_found(pool: PgPool) {
        let err = update_role(
            &pool,
            &admin(),
            Uuid::new_v4(),
            UpdateRoleDto {
                name: Some("GHOST".to_string()),
                permission_mask: None,
            },
        )
        .await
        .unwrap_err();

        assert_eq!(err.status.as_u16(), 404);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_get_role_by_name_is_case_insensitive(pool: PgPool) {
        let role = get_role_by_name(&pool, &admin(), "teacher").await.unwrap();
        assert_eq!(role.name, "TEACHER");

        let err = get_role_by_name(&pool, &admin(), "nonexistent")
            .await
            .unwrap_err();
        assert_eq!(err.status.as_u16(), 404);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_delete_role_is_unconditional(pool: PgPool) {
        let role = create_role(
            &pool,
            &admin(),
            CreateRoleDto {
                name: "DOOMED".to_string(),
                permission_mask: 0,
            },
        )
        .await
        .unwrap();

        // A user still references the role; deletion proceeds anyway.
        sqlx::query(
            "INSERT INTO users (first_name, last_name, email, password, role_id)
             VALUES ('Ref', 'Holder', 'ref@test.com', 'hash', $1)",
        )
        .bind(role.id)
        .execute(&pool)
        .await
        .unwrap();

        delete_role(&pool, &admin(), role.id).await.unwrap();

        let err = get_role_by_id(&pool, &admin(), role.id).await.unwrap_err();
        assert_eq!(err.status.as_u16(), 404);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_delete_role_not_found(pool: PgPool) {
        let err = delete_role(&pool, &admin(), Uuid::new_v4())
            .await
            .unwrap_err();
        assert_eq!(err.status.as_u16(), 404);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn test_list_roles_includes_seeded(pool: PgPool) {
        let params = RoleFilterParams {
            pagination: PaginationParams {
                limit: Some(50),
                offset: Some(0),
                page: None,
            },
        };

        let response = get_roles(&pool, &admin(), params).await.unwrap();

        let names: Vec<&str> = response.data.iter().map(|r| r.name.as_str()).collect();
        assert!(names.contains(&"ADMIN"));
        assert!(names.contains(&"TEACHER"));
        assert!(names.contains(&"CLERK"));
    }

    #[test]
    fn test_permission_catalogue_matches_constants() {
        let catalogue = get_permission_catalogue();
        assert_eq!(catalogue.len(), permissions::CATALOGUE.len());
        assert!(
            catalogue
                .iter()
                .any(|p| p.name == "administer" && p.bit == permissions::ADMINISTER.bit())
        );
    }
}
