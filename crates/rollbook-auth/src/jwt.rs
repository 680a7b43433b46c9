//! Session-token creation and verification.
//!
//! # Example
//!
//! ```ignore
//! use rollbook_auth::{create_session_token, verify_session_token};
//! use rollbook_config::JwtConfig;
//!
//! let config = JwtConfig::from_env();
//! let token = create_session_token(user_id, &config)?;
//! let verified_id = verify_session_token(&token, &config)?;
//! assert_eq!(verified_id, user_id);
//! ```

use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use uuid::Uuid;

use rollbook_config::JwtConfig;
use rollbook_core::AppError;

use crate::claims::{Claims, ResetTokenClaims};

/// Reset tokens expire after 30 minutes regardless of the session TTL.
const RESET_TOKEN_TTL_SECS: usize = 1800;

fn invalid_token() -> AppError {
    AppError::unauthorized("Invalid or expired token")
}

/// Creates a session token for the given user.
///
/// The token carries `sub` (the user id in string form), the configured
/// issuer when one is set, `iat`, and `exp = iat + ttl`. A pure function
/// of `(user_id, now)` apart from reading the clock.
pub fn create_session_token(user_id: Uuid, jwt_config: &JwtConfig) -> Result<String, AppError> {
    let now = Utc::now().timestamp() as usize;
    let exp = now + (jwt_config.ttl_minutes * 60) as usize;

    let claims = Claims {
        sub: user_id.to_string(),
        iss: jwt_config.issuer.clone(),
        exp,
        iat: now,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(jwt_config.secret.as_bytes()),
    )
    .map_err(|e| AppError::internal(anyhow::anyhow!("Failed to create token: {}", e)))
}

/// Verifies a session token and returns the user id it was issued for.
///
/// Checks, in library order: signature, expiry, issuer equality (only
/// when the config carries an issuer), and finally that the subject
/// parses as a user id. Every rejection maps to the same opaque
/// unauthorized error — callers cannot tell a forged signature from an
/// expired token from a garbled subject.
pub fn verify_session_token(token: &str, jwt_config: &JwtConfig) -> Result<Uuid, AppError> {
    let mut validation = Validation::default();
    if let Some(issuer) = &jwt_config.issuer {
        validation.set_issuer(&[issuer]);
    }

    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(jwt_config.secret.as_bytes()),
        &validation,
    )
    .map_err(|_| invalid_token())?;

    Uuid::parse_str(data.claims.sub.trim()).map_err(|_| invalid_token())
}

/// Creates a password-reset token for the given user.
pub fn create_reset_token(
    user_id: Uuid,
    email: &str,
    jwt_config: &JwtConfig,
) -> Result<String, AppError> {
    let now = Utc::now().timestamp() as usize;

    let claims = ResetTokenClaims {
        sub: user_id.to_string(),
        email: email.to_string(),
        reset: true,
        exp: now + RESET_TOKEN_TTL_SECS,
        iat: now,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(jwt_config.secret.as_bytes()),
    )
    .map_err(|e| AppError::internal(anyhow::anyhow!("Failed to create reset token: {}", e)))
}

/// Verifies a password-reset token, returning the user id and email.
///
/// Rejects session tokens handed to the reset endpoint: the `reset`
/// marker must be present and true.
pub fn verify_reset_token(
    token: &str,
    jwt_config: &JwtConfig,
) -> Result<(Uuid, String), AppError> {
    let data = decode::<ResetTokenClaims>(
        token,
        &DecodingKey::from_secret(jwt_config.secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| invalid_token())?;

    if !data.claims.reset {
        return Err(invalid_token());
    }

    let user_id = Uuid::parse_str(data.claims.sub.trim()).map_err(|_| invalid_token())?;
    Ok((user_id, data.claims.email))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> JwtConfig {
        JwtConfig {
            secret: "test-secret-key-at-least-32-characters-long".to_string(),
            issuer: None,
            ttl_minutes: 60,
        }
    }

    fn test_config_with_issuer(issuer: &str) -> JwtConfig {
        JwtConfig {
            issuer: Some(issuer.to_string()),
            ..test_config()
        }
    }

    /// Encode arbitrary claims with the test secret, bypassing
    /// `create_session_token`, to craft expired or malformed tokens.
    fn encode_raw(claims: &Claims, config: &JwtConfig) -> String {
        encode(
            &Header::default(),
            claims,
            &EncodingKey::from_secret(config.secret.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn round_trip_returns_the_issued_user_id() {
        let config = test_config();
        let user_id = Uuid::new_v4();

        let token = create_session_token(user_id, &config).unwrap();
        let verified = verify_session_token(&token, &config).unwrap();

        assert_eq!(verified, user_id);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let config = test_config();
        let token = create_session_token(Uuid::new_v4(), &config).unwrap();

        let wrong = JwtConfig {
            secret: "different-secret-key-at-least-32-chars".to_string(),
            ..test_config()
        };

        assert!(verify_session_token(&token, &wrong).is_err());
    }

    #[test]
    fn expired_token_is_rejected() {
        let config = test_config();
        let now = Utc::now().timestamp() as usize;
        // Past the default verification leeway.
        let token = encode_raw(
            &Claims {
                sub: Uuid::new_v4().to_string(),
                iss: None,
                exp: now - 3600,
                iat: now - 7200,
            },
            &config,
        );

        assert!(verify_session_token(&token, &config).is_err());
    }

    #[test]
    fn tampered_signature_is_rejected() {
        let config = test_config();
        let token = create_session_token(Uuid::new_v4(), &config).unwrap();

        // Flip the last character of the signature segment.
        let mut tampered = token.clone();
        let last = tampered.pop().unwrap();
        tampered.push(if last == 'A' { 'B' } else { 'A' });
        assert_ne!(token, tampered);

        assert!(verify_session_token(&tampered, &config).is_err());
    }

    #[test]
    fn issuer_mismatch_is_rejected() {
        let issuing = test_config_with_issuer("rollbook-staging");
        let verifying = test_config_with_issuer("rollbook-prod");

        let token = create_session_token(Uuid::new_v4(), &issuing).unwrap();

        assert!(verify_session_token(&token, &issuing).is_ok());
        assert!(verify_session_token(&token, &verifying).is_err());
    }

    #[test]
    fn empty_verifier_issuer_skips_the_check() {
        let issuing = test_config_with_issuer("rollbook-staging");
        let verifying = test_config();

        let token = create_session_token(Uuid::new_v4(), &issuing).unwrap();

        assert!(verify_session_token(&token, &verifying).is_ok());
    }

    #[test]
    fn missing_issuer_claim_fails_against_configured_issuer() {
        let issuing = test_config();
        let verifying = test_config_with_issuer("rollbook");

        let token = create_session_token(Uuid::new_v4(), &issuing).unwrap();

        assert!(verify_session_token(&token, &verifying).is_err());
    }

    #[test]
    fn non_parseable_subject_is_rejected() {
        let config = test_config();
        let now = Utc::now().timestamp() as usize;

        for sub in ["", "   ", "not-a-uuid", "12345"] {
            let token = encode_raw(
                &Claims {
                    sub: sub.to_string(),
                    iss: None,
                    exp: now + 3600,
                    iat: now,
                },
                &config,
            );
            assert!(
                verify_session_token(&token, &config).is_err(),
                "subject {:?} should be rejected",
                sub
            );
        }
    }

    #[test]
    fn all_rejections_are_indistinguishable() {
        let config = test_config();
        let now = Utc::now().timestamp() as usize;

        let expired = encode_raw(
            &Claims {
                sub: Uuid::new_v4().to_string(),
                iss: None,
                exp: now - 3600,
                iat: now - 7200,
            },
            &config,
        );
        let mut tampered = create_session_token(Uuid::new_v4(), &config).unwrap();
        let last = tampered.pop().unwrap();
        tampered.push(if last == 'A' { 'B' } else { 'A' });
        let bad_subject = encode_raw(
            &Claims {
                sub: "garbage".to_string(),
                iss: None,
                exp: now + 3600,
                iat: now,
            },
            &config,
        );

        let errors: Vec<AppError> = [expired, tampered, bad_subject, "not-a-jwt".to_string()]
            .iter()
            .map(|t| verify_session_token(t, &config).unwrap_err())
            .collect();

        for err in &errors {
            assert_eq!(err.status.as_u16(), 401);
            assert_eq!(err.error.to_string(), errors[0].error.to_string());
        }
    }

    #[test]
    fn reset_token_round_trip() {
        let config = test_config();
        let user_id = Uuid::new_v4();

        let token = create_reset_token(user_id, "reset@example.com", &config).unwrap();
        let (verified_id, email) = verify_reset_token(&token, &config).unwrap();

        assert_eq!(verified_id, user_id);
        assert_eq!(email, "reset@example.com");
    }

    #[test]
    fn session_token_is_not_a_reset_token() {
        let config = test_config();
        let token = create_session_token(Uuid::new_v4(), &config).unwrap();

        assert!(verify_reset_token(&token, &config).is_err());
    }
}
