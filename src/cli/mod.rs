use sqlx::PgPool;
use uuid::Uuid;

use rollbook_core::hash_password;

/// Well-known id of the seeded ADMIN role (see migrations).
const ADMIN_ROLE_ID: Uuid = Uuid::from_u128(0x00000000_0000_0000_0000_000000000001);

/// Creates an administrator account. Administrators are bootstrapped from
/// the CLI only; the users API cannot mint the first admin.
pub async fn create_admin_user(
    db: &PgPool,
    first_name: &str,
    last_name: &str,
    email: &str,
    password: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let hashed_password =
        hash_password(password).map_err(|e| format!("Failed to hash password: {}", e.error))?;

    let result = sqlx::query(
        "INSERT INTO users (first_name, last_name, email, password, enabled, role_id)
         VALUES ($1, $2, $3, $4, TRUE, $5)
         ON CONFLICT (LOWER(email)) DO NOTHING",
    )
    .bind(first_name)
    .bind(last_name)
    .bind(email)
    .bind(hashed_password)
    .bind(ADMIN_ROLE_ID)
    .execute(db)
    .await?;

    if result.rows_affected() == 0 {
        return Err("User with this email already exists".into());
    }

    Ok(())
}
