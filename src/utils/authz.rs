//! Authorization guards.
//!
//! The authentication gate only resolves identity; it never enforces
//! permissions. Every business operation that needs a capability check
//! calls one of these guards explicitly with the current principal.

use rollbook_core::AppError;
use rollbook_core::permissions::Permission;

use crate::middleware::auth::Principal;

/// Fails with 403 unless the principal's role mask grants `permission`.
pub fn require(principal: &Principal, permission: Permission) -> Result<(), AppError> {
    if !principal.has_permission(permission) {
        return Err(AppError::forbidden(format!(
            "Access denied. Missing required permission: {}",
            permission.name()
        )));
    }

    Ok(())
}

/// Fails with 403 unless the principal is an administrator.
///
/// Administrator identity is the reserved `administer` bit, a different
/// condition from any fine-grained capability check. Used for privileged
/// mutations: role management, class mutations, and audit-log reads.
pub fn require_admin(principal: &Principal) -> Result<(), AppError> {
    if !principal.is_admin() {
        return Err(AppError::forbidden(
            "Access denied. Administrator privileges required.",
        ));
    }

    Ok(())
}
