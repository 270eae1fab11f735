//! HTTP routes for Turnstile

pub mod auth_routes;
pub mod health;

pub use auth_routes::{handle_check, handle_login, handle_test_users};
pub use health::{health_check, version_info};
