//! # Rollbook Auth
//!
//! Session-token types and JWT utilities for the Rollbook API.
//!
//! Tokens are stateless bearer credentials: a signed claim set carrying a
//! user id, an optional issuer, and an expiry. There is no server-side
//! revocation list; a token is valid until it expires.
//!
//! Verification is deliberately opaque: a bad signature, an expired
//! token, an issuer mismatch, and a malformed subject all surface as the
//! same single failure, so a caller probing with forged tokens learns
//! nothing about which check rejected them.

pub mod claims;
pub mod jwt;

// Re-export commonly used types at crate root
pub use claims::{Claims, ResetTokenClaims};
pub use jwt::{
    create_reset_token, create_session_token, verify_reset_token, verify_session_token,
};
