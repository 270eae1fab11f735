//! Google Sheets credential source
//!
//! Reads a fixed cell range (header row + data rows) through the Sheets
//! values API, authenticated with a service account. Each lookup fetches the
//! range fresh; the gateway keeps no copy of the sheet.
//!
//! Auth flow: sign an RS256 JWT grant with the service account private key,
//! exchange it at the OAuth token endpoint, then call the values API with
//! the resulting bearer token. No token caching - one grant per lookup.

use async_trait::async_trait;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{CredentialSource, UserRecord, DEFAULT_ROLE};
use crate::types::GatewayError;

const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const SHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets.readonly";

/// Fixed column positions within the configured range
const COL_USERNAME: usize = 0;
const COL_PASSWORD: usize = 1;
const COL_DISPLAY_NAME: usize = 2;
const COL_ROLE: usize = 3;

/// Subset of a Google service account key file we need
#[derive(Debug, Clone, Deserialize)]
struct ServiceAccountKey {
    client_email: String,
    private_key: String,
}

/// Claims for the OAuth JWT grant (RFC 7523)
#[derive(Debug, Serialize)]
struct GrantClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: u64,
    exp: u64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct ValuesResponse {
    #[serde(default)]
    values: Vec<Vec<String>>,
}

pub struct SheetsSource {
    client: reqwest::Client,
    sheet_id: String,
    range: String,
    key: ServiceAccountKey,
    signing_key: EncodingKey,
}

impl SheetsSource {
    pub fn new(
        sheet_id: &str,
        range: &str,
        key_file: &str,
        timeout_ms: u64,
    ) -> Result<Self, GatewayError> {
        let raw = std::fs::read_to_string(key_file).map_err(|e| {
            GatewayError::Config(format!("Failed to read service account file {key_file}: {e}"))
        })?;
        let key: ServiceAccountKey = serde_json::from_str(&raw).map_err(|e| {
            GatewayError::Config(format!("Invalid service account file {key_file}: {e}"))
        })?;

        let signing_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
            .map_err(|e| GatewayError::Config(format!("Invalid service account key: {e}")))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .build()
            .map_err(|e| GatewayError::Config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            sheet_id: sheet_id.to_string(),
            range: range.to_string(),
            key,
            signing_key,
        })
    }

    /// Exchange a signed JWT grant for a short-lived access token
    async fn access_token(&self) -> Result<String, GatewayError> {
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);

        let claims = GrantClaims {
            iss: &self.key.client_email,
            scope: SHEETS_SCOPE,
            aud: TOKEN_URL,
            iat: now,
            exp: now + 3600,
        };

        let assertion = encode(&Header::new(Algorithm::RS256), &claims, &self.signing_key)
            .map_err(|e| GatewayError::Internal(format!("Failed to sign OAuth grant: {e}")))?;

        let response = self
            .client
            .post(TOKEN_URL)
            .form(&[
                ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                ("assertion", assertion.as_str()),
            ])
            .send()
            .await
            .map_err(|e| {
                GatewayError::SourceUnavailable(format!("OAuth token request failed: {e}"))
            })?;

        if !response.status().is_success() {
            return Err(GatewayError::SourceUnavailable(format!(
                "OAuth token endpoint returned status {}",
                response.status()
            )));
        }

        let token: TokenResponse = response.json().await.map_err(|e| {
            GatewayError::SourceUnavailable(format!("Invalid OAuth token response: {e}"))
        })?;

        Ok(token.access_token)
    }

    /// Fetch all data rows from the configured range (header row dropped)
    async fn fetch_records(&self) -> Result<Vec<UserRecord>, GatewayError> {
        let token = self.access_token().await?;

        let url = format!(
            "https://sheets.googleapis.com/v4/spreadsheets/{}/values/{}",
            self.sheet_id, self.range
        );

        let response = self
            .client
            .get(&url)
            .bearer_auth(&token)
            .send()
            .await
            .map_err(|e| {
                GatewayError::SourceUnavailable(format!("Sheets request failed: {e}"))
            })?;

        if !response.status().is_success() {
            return Err(GatewayError::SourceUnavailable(format!(
                "Sheets API returned status {}",
                response.status()
            )));
        }

        let body: ValuesResponse = response.json().await.map_err(|e| {
            GatewayError::SourceUnavailable(format!("Invalid Sheets response: {e}"))
        })?;

        Ok(records_from_values(&body.values))
    }
}

/// Map raw sheet rows to records, skipping the header row
pub fn records_from_values(values: &[Vec<String>]) -> Vec<UserRecord> {
    values
        .iter()
        .skip(1)
        .filter_map(|row| record_from_row(row))
        .collect()
}

/// Map one data row by fixed column position
///
/// Missing cells default the display name to the username and the role to
/// [`DEFAULT_ROLE`]. Rows without a username or password are dropped.
pub fn record_from_row(row: &[String]) -> Option<UserRecord> {
    let cell = |i: usize| row.get(i).map(|s| s.trim()).filter(|s| !s.is_empty());

    let username = cell(COL_USERNAME)?.to_string();
    let password = cell(COL_PASSWORD)?.to_string();
    let display_name = cell(COL_DISPLAY_NAME)
        .map(|s| s.to_string())
        .unwrap_or_else(|| username.clone());
    let role = cell(COL_ROLE)
        .map(|s| s.to_string())
        .unwrap_or_else(|| DEFAULT_ROLE.to_string());

    Some(UserRecord {
        username,
        password,
        display_name,
        role,
    })
}

#[async_trait]
impl CredentialSource for SheetsSource {
    async fn lookup(&self, username: &str) -> Result<Option<UserRecord>, GatewayError> {
        let records = self.fetch_records().await?;
        Ok(records
            .into_iter()
            .find(|r| r.username.eq_ignore_ascii_case(username)))
    }

    async fn list(&self) -> Result<Vec<UserRecord>, GatewayError> {
        self.fetch_records().await
    }

    fn name(&self) -> &'static str {
        "google-sheets"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_record_from_full_row() {
        let record = record_from_row(&row(&["admin", "admin123", "Site Admin", "admin"])).unwrap();
        assert_eq!(record.username, "admin");
        assert_eq!(record.password, "admin123");
        assert_eq!(record.display_name, "Site Admin");
        assert_eq!(record.role, "admin");
    }

    #[test]
    fn test_record_from_short_row_defaults() {
        let record = record_from_row(&row(&["guest", "guest1"])).unwrap();
        assert_eq!(record.display_name, "guest");
        assert_eq!(record.role, DEFAULT_ROLE);
    }

    #[test]
    fn test_record_rejects_incomplete_rows() {
        assert!(record_from_row(&row(&["onlyuser"])).is_none());
        assert!(record_from_row(&row(&["", "pw"])).is_none());
        assert!(record_from_row(&row(&[])).is_none());
    }

    #[test]
    fn test_header_row_is_skipped() {
        let values = vec![
            row(&["username", "password", "fullname", "role"]),
            row(&["admin", "admin123", "Site Admin", "admin"]),
            row(&["security", "pass123"]),
        ];

        let records = records_from_values(&values);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].username, "admin");
        assert_eq!(records[1].role, DEFAULT_ROLE);
    }

    #[test]
    fn test_empty_range_yields_no_records() {
        assert!(records_from_values(&[]).is_empty());
        // Header only
        let values = vec![row(&["username", "password"])];
        assert!(records_from_values(&values).is_empty());
    }
}
