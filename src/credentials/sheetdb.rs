//! SheetDB credential source
//!
//! Issues one `GET {base}/search?username=...` per login request against a
//! SheetDB-style tabular API. Response rows are JSON objects whose field
//! names vary by how the sheet was authored, so normalization goes through
//! an explicit field-mapping table instead of ad-hoc per-field fallbacks.

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use super::{CredentialSource, UserRecord, DEFAULT_ROLE};
use crate::types::GatewayError;

/// Accepted spellings per canonical field, in precedence order
const USERNAME_FIELDS: &[&str] = &["username", "Username"];
const PASSWORD_FIELDS: &[&str] = &["password", "Password"];
const FULLNAME_FIELDS: &[&str] = &["fullname", "Fullname", "Full Name"];
const ROLE_FIELDS: &[&str] = &["role", "Role", "userLevel"];

pub struct SheetDbSource {
    client: reqwest::Client,
    base_url: String,
}

impl SheetDbSource {
    pub fn new(base_url: &str, timeout_ms: u64) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .build()
            .map_err(|e| GatewayError::Config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn fetch_rows(&self, query: Option<&str>) -> Result<Vec<Value>, GatewayError> {
        let url = match query {
            Some(_) => format!("{}/search", self.base_url),
            None => self.base_url.clone(),
        };

        let mut request = self.client.get(&url);
        if let Some(username) = query {
            request = request.query(&[("username", username)]);
        }

        let response = request
            .send()
            .await
            .map_err(|e| GatewayError::SourceUnavailable(format!("SheetDB request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(GatewayError::SourceUnavailable(format!(
                "SheetDB returned status {}",
                response.status()
            )));
        }

        let body: Value = response.json().await.map_err(|e| {
            GatewayError::SourceUnavailable(format!("SheetDB returned invalid JSON: {e}"))
        })?;

        // A non-list body (error object, null) is treated as no rows
        match body {
            Value::Array(rows) => Ok(rows),
            other => {
                debug!("SheetDB returned non-array response: {}", other);
                Ok(Vec::new())
            }
        }
    }
}

/// Normalize one SheetDB row into the canonical record shape
///
/// Rows without a username are dropped. Display name defaults to the
/// username, role to [`DEFAULT_ROLE`].
pub fn normalize_row(row: &Value) -> Option<UserRecord> {
    let obj = row.as_object()?;

    let first = |fields: &[&str]| -> Option<String> {
        fields
            .iter()
            .find_map(|f| obj.get(*f))
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
            .map(|s| s.to_string())
    };

    let username = first(USERNAME_FIELDS)?;
    let password = first(PASSWORD_FIELDS).unwrap_or_default();
    let display_name = first(FULLNAME_FIELDS).unwrap_or_else(|| username.clone());
    let role = first(ROLE_FIELDS).unwrap_or_else(|| DEFAULT_ROLE.to_string());

    Some(UserRecord {
        username,
        password,
        display_name,
        role,
    })
}

#[async_trait]
impl CredentialSource for SheetDbSource {
    async fn lookup(&self, username: &str) -> Result<Option<UserRecord>, GatewayError> {
        let rows = self.fetch_rows(Some(username)).await?;

        // The API matches exactly; fall back to our own case-insensitive
        // comparison across the returned rows.
        Ok(rows
            .iter()
            .filter_map(normalize_row)
            .find(|r| r.username.eq_ignore_ascii_case(username)))
    }

    async fn list(&self) -> Result<Vec<UserRecord>, GatewayError> {
        let rows = self.fetch_rows(None).await?;
        Ok(rows.iter().filter_map(normalize_row).collect())
    }

    fn name(&self) -> &'static str {
        "sheetdb"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_normalize_lowercase_fields() {
        let row = json!({
            "username": "admin",
            "password": "admin123",
            "fullname": "Site Admin",
            "role": "admin"
        });
        let record = normalize_row(&row).unwrap();
        assert_eq!(record.username, "admin");
        assert_eq!(record.password, "admin123");
        assert_eq!(record.display_name, "Site Admin");
        assert_eq!(record.role, "admin");
    }

    #[test]
    fn test_normalize_capitalized_fields() {
        let row = json!({
            "Username": "security",
            "Password": "pass123",
            "Full Name": "Night Watch",
            "userLevel": "security"
        });
        let record = normalize_row(&row).unwrap();
        assert_eq!(record.username, "security");
        assert_eq!(record.password, "pass123");
        assert_eq!(record.display_name, "Night Watch");
        assert_eq!(record.role, "security");
    }

    #[test]
    fn test_normalize_defaults_for_partial_rows() {
        let row = json!({ "username": "guest", "password": "guest1" });
        let record = normalize_row(&row).unwrap();
        assert_eq!(record.display_name, "guest");
        assert_eq!(record.role, DEFAULT_ROLE);
    }

    #[test]
    fn test_normalize_prefers_lowercase_spelling() {
        // Both spellings present: the lowercase one wins
        let row = json!({
            "username": "alice",
            "Username": "ALICE",
            "password": "pw"
        });
        assert_eq!(normalize_row(&row).unwrap().username, "alice");
    }

    #[test]
    fn test_normalize_rejects_unusable_rows() {
        assert!(normalize_row(&json!({ "password": "pw" })).is_none());
        assert!(normalize_row(&json!({ "username": "" })).is_none());
        assert!(normalize_row(&json!("not an object")).is_none());
        assert!(normalize_row(&json!(null)).is_none());
    }
}
