//! Session token issuance and verification for Turnstile
//!
//! Provides:
//! - JWT token generation keyed by the shared signing secret
//! - Token validation with distinguishable rejection reasons
//! - Bearer header parsing

pub mod jwt;

pub use jwt::{extract_token_from_header, Claims, JwtValidator, TokenError};
