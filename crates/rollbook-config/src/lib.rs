//! # Rollbook Config
//!
//! Typed configuration for the Rollbook API, loaded from environment
//! variables at startup. Config structs are read-only after startup and
//! cheaply cloneable into the shared application state.

pub mod cors;
pub mod email;
pub mod jwt;

pub use cors::CorsConfig;
pub use email::EmailConfig;
pub use jwt::JwtConfig;
