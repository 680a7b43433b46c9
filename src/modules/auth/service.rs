use sqlx::PgPool;
use tracing::instrument;
use uuid::Uuid;

use rollbook_auth::{create_reset_token, create_session_token, verify_reset_token};
use rollbook_config::{EmailConfig, JwtConfig};
use rollbook_core::{AppError, hash_password, verify_password};

use crate::middleware::auth::Principal;
use crate::utils::email::EmailService;

use super::model::{LoginRequest, LoginResponse, MeResponse, ResetPasswordRequest};

pub struct AuthService;

impl AuthService {
    /// Validates credentials and issues a session token.
    ///
    /// An unknown email and a wrong password produce the identical
    /// "Invalid Credentials" failure so the endpoint cannot be used to
    /// enumerate accounts. A disabled account is reported as such once
    /// the password stage is reached in order; this intentionally happens
    /// after the existence check and is therefore distinguishable —
    /// existing behavior, kept as-is.
    #[instrument(skip(db, dto, jwt_config))]
    pub async fn login(
        db: &PgPool,
        dto: LoginRequest,
        jwt_config: &JwtConfig,
    ) -> Result<LoginResponse, AppError> {
        #[derive(sqlx::FromRow)]
        struct LoginRow {
            id: Uuid,
            first_name: String,
            password: String,
            enabled: bool,
            role_name: Option<String>,
        }

        let row = sqlx::query_as::<_, LoginRow>(
            r#"SELECT u.id, u.first_name, u.password, u.enabled, r.name AS role_name
               FROM users u
               LEFT JOIN roles r ON r.id = u.role_id
               WHERE LOWER(u.email) = LOWER($1)"#,
        )
        .bind(&dto.email)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::unauthorized("Invalid Credentials"))?;

        if !row.enabled {
            return Err(AppError::unauthorized("User Is Disabled"));
        }

        if !verify_password(&dto.password, &row.password)? {
            return Err(AppError::unauthorized("Invalid Credentials"));
        }

        let token = create_session_token(row.id, jwt_config)?;

        Ok(LoginResponse {
            token,
            user_id: row.id,
            role_name: row.role_name,
            first_name: row.first_name,
        })
    }

    /// Resolves the current principal back to a fresh user record.
    ///
    /// The principal is re-fetched by email rather than trusted as-is,
    /// and the guardian link is nulled out when the referenced guardian
    /// row no longer exists (weak reference, never a hard failure).
    #[instrument(skip(db, principal))]
    pub async fn me(db: &PgPool, principal: &Principal) -> Result<MeResponse, AppError> {
        #[derive(sqlx::FromRow)]
        struct MeRow {
            id: Uuid,
            email: String,
            first_name: String,
            last_name: String,
            guardian_id: Option<Uuid>,
            role_name: Option<String>,
        }

        let row = sqlx::query_as::<_, MeRow>(
            r#"SELECT u.id, u.email, u.first_name, u.last_name, u.guardian_id,
                      r.name AS role_name
               FROM users u
               LEFT JOIN roles r ON r.id = u.role_id
               WHERE LOWER(u.email) = LOWER($1)"#,
        )
        .bind(&principal.email)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| {
            AppError::not_found(anyhow::anyhow!("User not found: {}", principal.email))
        })?;

        let guardian_id = match row.guardian_id {
            Some(guardian_id) => {
                let exists = sqlx::query_scalar::<_, bool>(
                    "SELECT EXISTS(SELECT 1 FROM guardians WHERE id = $1)",
                )
                .bind(guardian_id)
                .fetch_one(db)
                .await?;

                if exists { Some(guardian_id) } else { None }
            }
            None => None,
        };

        Ok(MeResponse {
            user_id: row.id,
            email: row.email,
            first_name: row.first_name,
            last_name: row.last_name,
            role_name: row.role_name,
            guardian_id,
        })
    }

    /// Sends a password-reset link when the account exists.
    ///
    /// The controller always answers with the same generic message, so
    /// this endpoint leaks nothing about account existence.
    #[instrument(skip(db, jwt_config, email_config))]
    pub async fn forgot_password(
        db: &PgPool,
        email: &str,
        jwt_config: &JwtConfig,
        email_config: &EmailConfig,
    ) -> Result<(), AppError> {
        #[derive(sqlx::FromRow)]
        struct UserRow {
            id: Uuid,
            email: String,
            first_name: String,
        }

        let Some(user) = sqlx::query_as::<_, UserRow>(
            "SELECT id, email, first_name FROM users WHERE LOWER(email) = LOWER($1) AND enabled",
        )
        .bind(email)
        .fetch_optional(db)
        .await?
        else {
            return Ok(());
        };

        let reset_token = create_reset_token(user.id, &user.email, jwt_config)?;

        EmailService::new(email_config.clone())
            .send_password_reset_email(&user.email, &user.first_name, &reset_token)
            .await
    }

    #[instrument(skip(db, dto, jwt_config))]
    pub async fn reset_password(
        db: &PgPool,
        dto: ResetPasswordRequest,
        jwt_config: &JwtConfig,
    ) -> Result<(), AppError> {
        let (user_id, email) = verify_reset_token(&dto.token, jwt_config)?;

        let hashed = hash_password(&dto.new_password)?;

        let result = sqlx::query(
            r#"UPDATE users SET password = $1, updated_at = NOW()
               WHERE id = $2 AND LOWER(email) = LOWER($3)"#,
        )
        .bind(&hashed)
        .bind(user_id)
        .bind(&email)
        .execute(db)
        .await?;

        // The token outlived the account it was issued for.
        if result.rows_affected() == 0 {
            return Err(AppError::unauthorized("Invalid or expired token"));
        }

        Ok(())
    }
}
