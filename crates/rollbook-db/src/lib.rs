//! # Rollbook DB
//!
//! Database pool initialization for the Rollbook API.

use std::env;

/// Initializes a PostgreSQL connection pool from `DATABASE_URL`.
///
/// Called once during application startup; the returned pool is cheaply
/// cloneable and shared through the application state.
///
/// # Panics
///
/// Panics if `DATABASE_URL` is not set or the connection fails.
pub async fn init_db_pool() -> sqlx::PgPool {
    let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    sqlx::PgPool::connect(&database_url)
        .await
        .expect("Failed to connect to database")
}

// Re-export PgPool for convenience
pub use sqlx::PgPool;
