//! Configuration for Turnstile
//!
//! CLI arguments and environment variable handling using clap.
//! Everything here is parsed once at startup and read-only afterwards;
//! request handlers see it through the shared `AppState`.

use clap::Parser;
use std::net::SocketAddr;
use uuid::Uuid;

/// Turnstile - minimal authentication gateway
///
/// Validates username/password pairs against a configured credential source
/// and issues signed, time-limited session tokens.
#[derive(Parser, Debug, Clone)]
#[command(name = "turnstile")]
#[command(about = "Authentication gateway issuing signed session tokens")]
pub struct Args {
    /// Unique node identifier for this gateway instance
    #[arg(long, env = "NODE_ID", default_value_t = Uuid::new_v4())]
    pub node_id: Uuid,

    /// Address to listen on
    #[arg(long, env = "LISTEN", default_value = "0.0.0.0:5000")]
    pub listen: SocketAddr,

    /// Secret for session token signing (required in production)
    #[arg(long, env = "JWT_SECRET")]
    pub jwt_secret: Option<String>,

    /// Session token expiry in seconds
    #[arg(long, env = "TOKEN_EXPIRY_SECONDS", default_value = "7200")]
    pub token_expiry_seconds: u64,

    /// Static credential list: `user:pass[:displayName]:role` entries,
    /// comma separated. Role defaults to "Security" when omitted.
    #[arg(long, env = "USER_LIST")]
    pub user_list: Option<String>,

    /// Base URL of a SheetDB-style tabular API used for credential lookups
    /// (e.g. "https://sheetdb.io/api/v1/a35j8mg76r4oo")
    #[arg(long, env = "SHEETDB_URL")]
    pub sheetdb_url: Option<String>,

    /// Google Sheets spreadsheet ID for the spreadsheet credential source
    #[arg(long, env = "SHEET_ID")]
    pub sheet_id: Option<String>,

    /// Cell range read from the spreadsheet (header row + data rows)
    #[arg(long, env = "SHEET_RANGE", default_value = "Sheet1!A1:D100")]
    pub sheet_range: String,

    /// Path to a Google service account key file (JSON) for the
    /// spreadsheet credential source
    #[arg(long, env = "SERVICE_ACCOUNT_FILE")]
    pub service_account_file: Option<String>,

    /// Comma-separated list of origins allowed by CORS
    #[arg(
        long,
        env = "ALLOWED_ORIGINS",
        default_value = "http://127.0.0.1:5500,http://localhost:5500"
    )]
    pub allowed_origins: String,

    /// Expose the /api/test-users diagnostic endpoint.
    /// The endpoint returns raw credential data - never enable in production.
    #[arg(long, env = "DEBUG_ENDPOINTS", default_value = "false")]
    pub debug_endpoints: bool,

    /// Enable development mode (allows a default insecure signing secret)
    #[arg(long, env = "DEV_MODE", default_value = "false")]
    pub dev_mode: bool,

    /// Timeout for outbound credential lookups in milliseconds
    #[arg(long, env = "LOOKUP_TIMEOUT_MS", default_value = "5000")]
    pub lookup_timeout_ms: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Args {
    /// Get effective JWT secret (uses default in dev mode)
    pub fn jwt_secret(&self) -> String {
        if self.dev_mode {
            self.jwt_secret
                .clone()
                .unwrap_or_else(|| "dev-only-insecure-secret".to_string())
        } else {
            self.jwt_secret
                .clone()
                .expect("JWT_SECRET is required in production mode")
        }
    }

    /// Get the list of allowed CORS origins
    pub fn allowed_origin_list(&self) -> Vec<String> {
        self.allowed_origins
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }

    /// Check whether an Origin header value is on the allow list
    pub fn origin_allowed(&self, origin: &str) -> bool {
        self.allowed_origin_list().iter().any(|o| o == origin)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if !self.dev_mode && self.jwt_secret.is_none() {
            return Err("JWT_SECRET is required in production mode".to_string());
        }

        if self.user_list.is_none() && self.sheetdb_url.is_none() && self.sheet_id.is_none() {
            return Err(
                "No credential source configured: set USER_LIST, SHEETDB_URL, or SHEET_ID"
                    .to_string(),
            );
        }

        if self.sheet_id.is_some() && self.service_account_file.is_none() {
            return Err("SERVICE_ACCOUNT_FILE is required when SHEET_ID is set".to_string());
        }

        Ok(())
    }
}
