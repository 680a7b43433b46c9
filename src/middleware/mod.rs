//! Request-processing middleware.
//!
//! # Authentication flow
//!
//! 1. The [`auth::authenticate`] gate runs once per `/api` request and
//!    resolves the bearer token (if any) into a [`auth::Principal`]
//!    stored in the request extensions.
//! 2. Handlers that need an identity take the [`auth::CurrentUser`]
//!    extractor, which yields 401 when the request is unauthenticated.
//! 3. Services call the guards in [`crate::utils::authz`] to enforce
//!    permissions against the principal's role mask.
//!
//! The gate is deliberately asymmetric: a present-but-invalid token is
//! rejected with 401 on the spot, while an absent token (or one whose
//! user no longer exists) merely leaves the request unauthenticated and
//! lets downstream checks decide.

pub mod auth;
