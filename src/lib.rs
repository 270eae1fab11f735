//! Turnstile - minimal authentication gateway
//!
//! Validates username/password pairs against a configured credential source
//! and issues signed, time-limited session tokens. The server holds no
//! session state: a token is valid iff its signature matches the shared
//! secret and it has not expired.
//!
//! ## Components
//!
//! - **Credential sources**: static list, SheetDB API, or a Google Sheets
//!   range read with a service account - all normalized to one record shape
//! - **Session tokens**: HS256 JWTs carrying username and role
//! - **HTTP API**: /api/auth/login, /api/check, and health/version probes

pub mod auth;
pub mod config;
pub mod credentials;
pub mod routes;
pub mod server;
pub mod types;

pub use config::Args;
pub use server::{run, AppState};
pub use types::{GatewayError, Result};
