//! Credential sources for Turnstile
//!
//! A credential source resolves a username to zero-or-one user record. Three
//! variants exist, selected once at startup by configuration:
//! - `StaticListSource`: parsed from the USER_LIST environment string
//! - `SheetDbSource`: per-request lookup against a SheetDB-style HTTP API
//! - `SheetsSource`: a Google Sheets range read with a service account
//!
//! All variants present the same `UserRecord` shape to the caller. A remote
//! transport failure is a `SourceUnavailable` error (500), never an auth
//! failure, so infrastructure outages are not masked as bad credentials.

pub mod sheetdb;
pub mod sheets;
pub mod static_list;

pub use sheetdb::SheetDbSource;
pub use sheets::SheetsSource;
pub use static_list::StaticListSource;

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

use crate::config::Args;
use crate::types::GatewayError;

/// Role assigned when a source entry carries none
pub const DEFAULT_ROLE: &str = "Security";

/// Uniform rejection message - never reveals which field was wrong
pub const INVALID_CREDENTIALS: &str = "Invalid username or password";

/// A normalized credential record
///
/// Ephemeral: re-fetched or recomputed per login request for the remote
/// variants, never persisted by the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserRecord {
    pub username: String,
    pub password: String,
    /// Display name, defaults to the username
    #[serde(rename = "fullname")]
    pub display_name: String,
    /// Coarse authorization label, defaults to [`DEFAULT_ROLE`]
    pub role: String,
}

/// Read-only provider of username -> record lookups
#[async_trait]
pub trait CredentialSource: Send + Sync {
    /// Resolve a username to a record. Username comparison is
    /// case-insensitive; `Ok(None)` means "not found".
    async fn lookup(&self, username: &str) -> Result<Option<UserRecord>, GatewayError>;

    /// Full normalized credential list (diagnostic endpoint only)
    async fn list(&self) -> Result<Vec<UserRecord>, GatewayError>;

    /// Short variant name for logs and health output
    fn name(&self) -> &'static str;
}

/// Look up a username and check the supplied password
///
/// Not-found and wrong-password collapse into the same `Auth` error so the
/// response cannot leak which field was wrong. Password comparison is exact
/// and case-sensitive; source errors pass through unchanged.
pub async fn authenticate(
    source: &dyn CredentialSource,
    username: &str,
    password: &str,
) -> Result<UserRecord, GatewayError> {
    let record = source.lookup(username).await?;

    match record {
        Some(record) if record.password == password => Ok(record),
        _ => Err(GatewayError::Auth(INVALID_CREDENTIALS.to_string())),
    }
}

/// Build the credential source selected by configuration
///
/// Precedence: Google Sheets, then SheetDB, then the static list.
pub fn build_source(args: &Args) -> Result<Arc<dyn CredentialSource>, GatewayError> {
    if let Some(ref sheet_id) = args.sheet_id {
        let key_file = args.service_account_file.as_deref().ok_or_else(|| {
            GatewayError::Config("SERVICE_ACCOUNT_FILE is required when SHEET_ID is set".into())
        })?;
        let source = SheetsSource::new(
            sheet_id,
            &args.sheet_range,
            key_file,
            args.lookup_timeout_ms,
        )?;
        info!("Credential source: Google Sheets ({})", sheet_id);
        return Ok(Arc::new(source));
    }

    if let Some(ref url) = args.sheetdb_url {
        let source = SheetDbSource::new(url, args.lookup_timeout_ms)?;
        info!("Credential source: SheetDB ({})", url);
        return Ok(Arc::new(source));
    }

    if let Some(ref list) = args.user_list {
        let source = StaticListSource::parse(list)?;
        info!("Credential source: static list ({} users)", source.len());
        return Ok(Arc::new(source));
    }

    Err(GatewayError::Config(
        "No credential source configured: set USER_LIST, SHEETDB_URL, or SHEET_ID".into(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source() -> StaticListSource {
        StaticListSource::parse("admin:admin123:admin,security:pass123:security").unwrap()
    }

    #[tokio::test]
    async fn test_authenticate_valid_pair() {
        let src = source();
        let record = authenticate(&src, "admin", "admin123").await.unwrap();
        assert_eq!(record.username, "admin");
        assert_eq!(record.role, "admin");
    }

    #[tokio::test]
    async fn test_authenticate_username_case_insensitive() {
        let src = source();
        let record = authenticate(&src, "Admin", "admin123").await.unwrap();
        assert_eq!(record.role, "admin");
    }

    #[tokio::test]
    async fn test_authenticate_password_case_sensitive() {
        let src = source();
        let err = authenticate(&src, "admin", "ADMIN123").await.unwrap_err();
        assert!(matches!(err, GatewayError::Auth(_)));
    }

    #[tokio::test]
    async fn test_wrong_password_and_unknown_user_indistinguishable() {
        let src = source();

        let wrong_pass = authenticate(&src, "admin", "wrong").await.unwrap_err();
        let no_user = authenticate(&src, "nobody", "admin123").await.unwrap_err();

        assert_eq!(wrong_pass.client_message(), INVALID_CREDENTIALS);
        assert_eq!(no_user.client_message(), INVALID_CREDENTIALS);
    }

    #[tokio::test]
    async fn test_source_error_is_not_auth_error() {
        struct DownSource;

        #[async_trait]
        impl CredentialSource for DownSource {
            async fn lookup(&self, _: &str) -> Result<Option<UserRecord>, GatewayError> {
                Err(GatewayError::SourceUnavailable("connect refused".into()))
            }
            async fn list(&self) -> Result<Vec<UserRecord>, GatewayError> {
                Err(GatewayError::SourceUnavailable("connect refused".into()))
            }
            fn name(&self) -> &'static str {
                "down"
            }
        }

        let err = authenticate(&DownSource, "admin", "admin123")
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::SourceUnavailable(_)));
        assert_eq!(err.status(), hyper::StatusCode::INTERNAL_SERVER_ERROR);
    }
}
