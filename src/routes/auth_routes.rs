//! HTTP routes for authentication
//!
//! Provides the JSON API endpoints:
//! - POST /api/auth/login  - Validate credentials and issue a session token
//! - GET  /api/check       - Verify a bearer token and echo the identity
//! - GET  /api/test-users  - Dump the normalized credential list (debug only)

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::{Request, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::auth::{extract_token_from_header, TokenError};
use crate::credentials::authenticate;
use crate::server::AppState;
use crate::types::GatewayError;

type BoxBody = http_body_util::combinators::BoxBody<Bytes, hyper::Error>;

// =============================================================================
// Request/Response Types
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub username: String,
    pub fullname: String,
    #[serde(rename = "userLevel")]
    pub user_level: String,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct CheckResponse {
    pub message: String,
    pub user: String,
    pub level: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub message: String,
}

// =============================================================================
// Response Helpers
// =============================================================================

fn json_response<T: Serialize>(
    status: StatusCode,
    body: &T,
    cors_origin: Option<&str>,
) -> Response<BoxBody> {
    let json = serde_json::to_string(body).unwrap_or_else(|_| "{}".to_string());

    let mut builder = Response::builder()
        .status(status)
        .header("Content-Type", "application/json");

    if let Some(origin) = cors_origin {
        builder = builder
            .header("Access-Control-Allow-Origin", origin)
            .header("Access-Control-Allow-Credentials", "true");
    }

    builder.body(full_body(json)).unwrap()
}

fn error_response(
    status: StatusCode,
    message: impl Into<String>,
    cors_origin: Option<&str>,
) -> Response<BoxBody> {
    json_response(
        status,
        &ErrorResponse {
            message: message.into(),
        },
        cors_origin,
    )
}

fn full_body(data: impl Into<Bytes>) -> BoxBody {
    Full::new(data.into())
        .map_err(|never| match never {})
        .boxed()
}

async fn parse_json_body<T: for<'de> Deserialize<'de>>(
    req: Request<hyper::body::Incoming>,
) -> Result<T, GatewayError> {
    let body = req
        .collect()
        .await
        .map_err(|e| GatewayError::Http(format!("Failed to read body: {}", e)))?;

    let bytes = body.to_bytes();
    if bytes.len() > 10240 {
        return Err(GatewayError::Validation("Request body too large".into()));
    }

    serde_json::from_slice(&bytes)
        .map_err(|e| GatewayError::Validation(format!("Invalid JSON body: {}", e)))
}

fn get_auth_header(req: &Request<hyper::body::Incoming>) -> Option<&str> {
    req.headers()
        .get(hyper::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
}

// =============================================================================
// Route Handlers
// =============================================================================

/// POST /api/auth/login
///
/// Flow, terminal on first match:
/// 1. Reject missing/empty username or password (400) before any lookup
/// 2. Look up the user in the configured credential source
/// 3. Exact-match password check; not-found and mismatch get the same 401
/// 4. Issue a session token and return it with the profile fields
pub async fn handle_login(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
    cors_origin: Option<String>,
) -> Response<BoxBody> {
    let cors = cors_origin.as_deref();

    let body: LoginRequest = match parse_json_body(req).await {
        Ok(b) => b,
        Err(e) => return error_response(e.status(), e.client_message(), cors),
    };

    if body.username.is_empty() || body.password.is_empty() {
        return error_response(
            StatusCode::BAD_REQUEST,
            "Username and password required",
            cors,
        );
    }

    let record = match authenticate(state.source.as_ref(), &body.username, &body.password).await {
        Ok(record) => record,
        Err(e @ GatewayError::Auth(_)) => {
            warn!("Login failed for {}", body.username);
            return error_response(e.status(), e.client_message(), cors);
        }
        Err(e) => {
            error!("Credential lookup failed: {}", e);
            return error_response(e.status(), e.client_message(), cors);
        }
    };

    let (token, _expires_at) = match state.jwt.issue_token(&record.username, &record.role) {
        Ok(t) => t,
        Err(e) => {
            error!("Token issuance failed: {}", e);
            return error_response(e.status(), e.client_message(), cors);
        }
    };

    info!(
        "Login successful: {} ({}) - {}",
        record.username, record.role, record.display_name
    );

    json_response(
        StatusCode::OK,
        &LoginResponse {
            token,
            message: format!("Welcome {}", record.display_name),
            username: record.username,
            fullname: record.display_name.clone(),
            user_level: record.role,
        },
        cors,
    )
}

/// GET /api/check
///
/// Verifies the Authorization bearer token and returns the decoded identity.
/// Each rejection reason gets its own message; no identity is cached across
/// requests.
pub async fn handle_check(
    req: Request<hyper::body::Incoming>,
    state: Arc<AppState>,
    cors_origin: Option<String>,
) -> Response<BoxBody> {
    let cors = cors_origin.as_deref();

    let token = extract_token_from_header(get_auth_header(&req));

    let result = match token {
        Some(t) => state.jwt.verify_token(t),
        None => Err(TokenError::Missing),
    };

    let claims = match result {
        Ok(claims) => claims,
        Err(e) => {
            let message = match e {
                TokenError::Missing => "No token provided",
                TokenError::Expired => "Token expired",
                TokenError::Malformed | TokenError::InvalidSignature => "Invalid or expired token",
            };
            return error_response(StatusCode::UNAUTHORIZED, message, cors);
        }
    };

    json_response(
        StatusCode::OK,
        &CheckResponse {
            message: "Authorized".to_string(),
            user: claims.user,
            level: claims.level,
        },
        cors,
    )
}

/// GET /api/test-users
///
/// Returns the full normalized credential list from the active source,
/// passwords included. The server only routes here when DEBUG_ENDPOINTS is
/// set; without the flag the path 404s.
pub async fn handle_test_users(
    state: Arc<AppState>,
    cors_origin: Option<String>,
) -> Response<BoxBody> {
    let cors = cors_origin.as_deref();

    match state.source.list().await {
        Ok(users) => {
            warn!(
                "Served /api/test-users ({} records from {})",
                users.len(),
                state.source.name()
            );
            json_response(StatusCode::OK, &users, cors)
        }
        Err(e) => {
            error!("Failed to list credential source: {}", e);
            error_response(e.status(), e.client_message(), cors)
        }
    }
}
