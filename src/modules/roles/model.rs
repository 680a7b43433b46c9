use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Normalizes a role name to its stored form: trimmed and uppercased.
/// Uniqueness is case-insensitive, so "Teacher" and "TEACHER" are the
/// same role.
pub fn canonicalize_name(name: &str) -> String {
    name.trim().to_uppercase()
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Role {
    pub id: Uuid,
    pub name: String,
    /// Bitwise union of permission bits; bits outside the catalogue are
    /// tolerated and grant nothing.
    pub permission_mask: i64,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// One entry of the compile-time permission catalogue, exposed so
/// clients can compose masks.
#[derive(Debug, Serialize, ToSchema)]
pub struct PermissionInfo {
    pub name: String,
    pub bit: i64,
}

// DTOs

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateRoleDto {
    #[validate(length(
        min = 1,
        max = 100,
        message = "Name must be between 1 and 100 characters"
    ))]
    pub name: String,
    #[validate(range(min = 0, message = "permission_mask must not be negative"))]
    pub permission_mask: i64,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateRoleDto {
    #[validate(length(
        min = 1,
        max = 100,
        message = "Name must be between 1 and 100 characters"
    ))]
    pub name: Option<String>,
    #[validate(range(min = 0, message = "permission_mask must not be negative"))]
    pub permission_mask: Option<i64>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct RoleFilterParams {
    #[serde(flatten)]
    pub pagination: rollbook_core::PaginationParams,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaginatedRolesResponse {
    pub data: Vec<Role>,
    pub meta: rollbook_core::PaginationMeta,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonicalize_trims_and_uppercases() {
        assert_eq!(canonicalize_name("  teacher "), "TEACHER");
        assert_eq!(canonicalize_name("Admin"), "ADMIN");
        assert_eq!(canonicalize_name("   "), "");
    }

    #[test]
    fn create_role_dto_rejects_negative_mask() {
        let dto = CreateRoleDto {
            name: "TEACHER".to_string(),
            permission_mask: -1,
        };
        assert!(dto.validate().is_err());
    }

    #[test]
    fn create_role_dto_accepts_zero_mask() {
        let dto = CreateRoleDto {
            name: "OBSERVER".to_string(),
            permission_mask: 0,
        };
        assert!(dto.validate().is_ok());
    }
}
