//! JWT claim structures for session and password-reset tokens.

use serde::{Deserialize, Serialize};

/// Claims carried by a session token.
///
/// The subject is the user id in its string form; everything else a
/// request needs (role, permissions) is resolved fresh from the database
/// by the authentication gate, so a role edit takes effect on the user's
/// next request rather than at their next login.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User ID (subject claim)
    pub sub: String,
    /// Issuer, present only when the server has one configured
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
    /// Token expiration timestamp (Unix timestamp)
    pub exp: usize,
    /// Token issued-at timestamp (Unix timestamp)
    pub iat: usize,
}

/// Claims carried by a password-reset token.
///
/// The `reset` marker keeps a reset token from being accepted where a
/// session token is expected and vice versa.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResetTokenClaims {
    /// User ID (subject claim)
    pub sub: String,
    /// Email the reset was requested for
    pub email: String,
    /// Marker distinguishing reset tokens from session tokens
    pub reset: bool,
    /// Token expiration timestamp (Unix timestamp)
    pub exp: usize,
    /// Token issued-at timestamp (Unix timestamp)
    pub iat: usize,
}
