use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use sqlx::PgPool;
use uuid::Uuid;

use rollbook_auth::verify_session_token;
use rollbook_core::permissions::{self, Permission};
use rollbook_core::{AppError, has_permission};

use crate::state::AppState;

/// The resolved identity attached to an authenticated request: the user
/// row joined with its role's name and permission mask.
///
/// Passed explicitly into services rather than living in ambient state,
/// so authorization logic stays unit-testable without HTTP scaffolding.
#[derive(Debug, Clone)]
pub struct Principal {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub guardian_id: Option<Uuid>,
    /// None when the user's role link dangles (the role was deleted).
    pub role_name: Option<String>,
    /// 0 when the role link dangles; grants nothing.
    pub permission_mask: i64,
}

impl Principal {
    pub fn has_permission(&self, permission: Permission) -> bool {
        has_permission(self.permission_mask, permission)
    }

    pub fn is_admin(&self) -> bool {
        self.has_permission(permissions::ADMINISTER)
    }
}

/// The gate's per-request output: present in extensions once the gate has
/// run, `None` inside when the request is unauthenticated.
#[derive(Debug, Clone, Default)]
pub struct MaybePrincipal(pub Option<Principal>);

/// Authentication gate, layered over the `/api` tree.
///
/// Per-request state machine:
///
/// 1. No `Authorization` header → pass through unauthenticated.
/// 2. Extensions already hold a principal slot (re-entrant layering) →
///    pass through unchanged.
/// 3. Header present but not `Bearer`-formed → 401, stop.
/// 4. Bearer token empty after trimming → pass through unauthenticated.
/// 5. Token fails verification → 401, stop.
/// 6. Verified but the user is gone or disabled → pass through
///    unauthenticated (an orphaned token is treated as absent).
/// 7. Resolved → principal stored for downstream extractors.
pub async fn authenticate(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    if req.extensions().get::<MaybePrincipal>().is_some() {
        return next.run(req).await;
    }

    let principal = match resolve_request_principal(&state, req.headers()).await {
        Ok(principal) => principal,
        Err(err) => return err.into_response(),
    };

    req.extensions_mut().insert(MaybePrincipal(principal));
    next.run(req).await
}

async fn resolve_request_principal(
    state: &AppState,
    headers: &header::HeaderMap,
) -> Result<Option<Principal>, AppError> {
    let Some(value) = headers.get(header::AUTHORIZATION) else {
        return Ok(None);
    };

    let value = value
        .to_str()
        .map_err(|_| AppError::unauthorized("Invalid authorization header format"))?;

    let Some(token) = value.strip_prefix("Bearer ") else {
        return Err(AppError::unauthorized(
            "Invalid authorization header format",
        ));
    };

    let token = token.trim();
    if token.is_empty() {
        return Ok(None);
    }

    let user_id = verify_session_token(token, &state.jwt_config)?;

    fetch_principal(&state.db, user_id).await
}

/// Single joined fetch of user + role. Returns `Ok(None)` when the user
/// does not exist or is disabled.
pub async fn fetch_principal(db: &PgPool, user_id: Uuid) -> Result<Option<Principal>, AppError> {
    #[derive(sqlx::FromRow)]
    struct PrincipalRow {
        id: Uuid,
        email: String,
        first_name: String,
        last_name: String,
        guardian_id: Option<Uuid>,
        role_name: Option<String>,
        permission_mask: Option<i64>,
    }

    let row = sqlx::query_as::<_, PrincipalRow>(
        r#"SELECT u.id, u.email, u.first_name, u.last_name, u.guardian_id,
                  r.name AS role_name, r.permission_mask
           FROM users u
           LEFT JOIN roles r ON r.id = u.role_id
           WHERE u.id = $1 AND u.enabled"#,
    )
    .bind(user_id)
    .fetch_optional(db)
    .await?;

    Ok(row.map(|row| Principal {
        id: row.id,
        email: row.email,
        first_name: row.first_name,
        last_name: row.last_name,
        guardian_id: row.guardian_id,
        role_name: row.role_name,
        permission_mask: row.permission_mask.unwrap_or(0),
    }))
}

/// Extractor for handlers that require an authenticated caller.
///
/// Reads the principal the gate stored in extensions; rejects with 401
/// when the gate left the request unauthenticated. The message here
/// ("Authentication required") is distinct from the gate's own rejection
/// ("Invalid or expired token"), which keeps the two 401 paths apart.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Principal);

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<MaybePrincipal>()
            .and_then(|slot| slot.0.clone())
            .map(CurrentUser)
            .ok_or_else(|| AppError::unauthorized("Authentication required"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn principal_with_mask(mask: i64) -> Principal {
        Principal {
            id: Uuid::new_v4(),
            email: "test@example.com".to_string(),
            first_name: "Test".to_string(),
            last_name: "User".to_string(),
            guardian_id: None,
            role_name: Some("TEACHER".to_string()),
            permission_mask: mask,
        }
    }

    #[test]
    fn has_permission_tests_single_bits() {
        let principal = principal_with_mask(
            permissions::VIEW_ATTENDANCE.bit() | permissions::EDIT_ATTENDANCE.bit(),
        );

        assert!(principal.has_permission(permissions::VIEW_ATTENDANCE));
        assert!(principal.has_permission(permissions::EDIT_ATTENDANCE));
        assert!(!principal.has_permission(permissions::MANAGE_USERS));
    }

    #[test]
    fn admin_is_the_reserved_bit_not_a_full_mask() {
        let full_minus_admin = permissions::ALL & !permissions::ADMINISTER.bit();
        assert!(!principal_with_mask(full_minus_admin).is_admin());
        assert!(principal_with_mask(permissions::ADMINISTER.bit()).is_admin());
        assert!(principal_with_mask(permissions::ALL).is_admin());
    }

    #[test]
    fn dangling_role_grants_nothing() {
        let principal = Principal {
            role_name: None,
            permission_mask: 0,
            ..principal_with_mask(0)
        };

        for p in permissions::CATALOGUE {
            assert!(!principal.has_permission(p));
        }
        assert!(!principal.is_admin());
    }
}
