use std::env;

/// Session-token signing configuration.
///
/// - `secret`: symmetric signing key. Startup fails when missing or empty.
/// - `issuer`: issuer claim to stamp and verify. `None` (unset or empty
///   env var) disables the issuer check entirely.
/// - `ttl_minutes`: session token time-to-live.
#[derive(Clone, Debug)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: Option<String>,
    pub ttl_minutes: i64,
}

impl JwtConfig {
    /// Loads the config from `JWT_SECRET`, `JWT_ISSUER`, and
    /// `JWT_TTL_MINUTES`.
    ///
    /// # Panics
    ///
    /// Panics when `JWT_SECRET` is unset or blank. Running with a
    /// guessable default secret would make every issued token forgeable,
    /// so a missing secret is a fatal startup error.
    pub fn from_env() -> Self {
        let secret = env::var("JWT_SECRET")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .expect("JWT_SECRET must be set to a non-empty value");

        let issuer = env::var("JWT_ISSUER")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        let ttl_minutes = env::var("JWT_TTL_MINUTES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(60);

        Self {
            secret,
            issuer,
            ttl_minutes,
        }
    }
}
