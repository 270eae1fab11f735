//! HTTP server implementation
//!
//! Uses hyper http1 with TokioIo for async handling. One task per accepted
//! connection; request handling is stateless, the only shared state is the
//! read-only `AppState` built at startup.

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

use crate::auth::JwtValidator;
use crate::config::Args;
use crate::credentials::{build_source, CredentialSource};
use crate::routes;
use crate::types::GatewayError;

type BoxBody = http_body_util::combinators::BoxBody<Bytes, hyper::Error>;

/// Shared application state
///
/// Constructed once at process start; immutable thereafter. Handlers receive
/// it behind an `Arc` and never mutate it, so no locking is needed.
pub struct AppState {
    pub args: Args,
    /// Active credential source, selected by configuration
    pub source: Arc<dyn CredentialSource>,
    /// Token issuer/verifier keyed by the shared secret
    pub jwt: JwtValidator,
    /// Process start, for uptime reporting
    pub started_at: Instant,
}

impl AppState {
    pub fn new(args: Args) -> Result<Self, GatewayError> {
        let source = build_source(&args)?;
        let jwt = JwtValidator::new(&args.jwt_secret(), args.token_expiry_seconds);

        Ok(Self {
            args,
            source,
            jwt,
            started_at: Instant::now(),
        })
    }
}

pub async fn run(state: Arc<AppState>) -> Result<(), GatewayError> {
    let listener = TcpListener::bind(state.args.listen).await?;

    info!(
        "Turnstile listening on {} as node {}",
        state.args.listen, state.args.node_id
    );

    if state.args.dev_mode {
        warn!("Development mode enabled - insecure default signing secret permitted");
    }
    if state.args.debug_endpoints {
        warn!("/api/test-users enabled - this endpoint exposes credential data");
    }

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let state = Arc::clone(&state);
                tokio::spawn(async move {
                    let io = TokioIo::new(stream);

                    let service = service_fn(move |req| {
                        let state = Arc::clone(&state);
                        async move { handle_request(state, addr, req).await }
                    });

                    if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                        error!("Error serving connection from {}: {:?}", addr, err);
                    }
                });
            }
            Err(e) => {
                error!("Error accepting connection: {:?}", e);
            }
        }
    }
}

/// Route incoming HTTP requests
async fn handle_request(
    state: Arc<AppState>,
    addr: SocketAddr,
    req: Request<Incoming>,
) -> Result<Response<BoxBody>, hyper::Error> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    debug!("[{}] {} {}", addr, method, path);

    // Origin allow-listing. Requests without an Origin header (curl, server
    // to server) pass through without CORS headers; allowed origins get the
    // origin echoed back; blocked origins are logged and get no headers.
    let origin = req
        .headers()
        .get(hyper::header::ORIGIN)
        .and_then(|h| h.to_str().ok())
        .map(|s| s.to_string());

    let cors_origin = match origin {
        Some(ref o) if state.args.origin_allowed(o) => Some(o.clone()),
        Some(ref o) => {
            warn!("CORS blocked origin: {}", o);
            if method == Method::OPTIONS {
                return Ok(error_json(
                    StatusCode::FORBIDDEN,
                    "Not allowed by CORS",
                ));
            }
            None
        }
        None => None,
    };

    let response = match (method, path.as_str()) {
        (Method::OPTIONS, _) => preflight_response(cors_origin.as_deref()),

        (Method::POST, "/api/auth/login") => {
            routes::handle_login(req, Arc::clone(&state), cors_origin).await
        }

        (Method::GET, "/api/check") => {
            routes::handle_check(req, Arc::clone(&state), cors_origin).await
        }

        // Diagnostic route, only wired up when the debug flag is set
        (Method::GET, "/api/test-users") if state.args.debug_endpoints => {
            routes::handle_test_users(Arc::clone(&state), cors_origin).await
        }

        // Liveness probe
        (Method::GET, "/health") | (Method::GET, "/healthz") => {
            to_boxed(routes::health_check(Arc::clone(&state)))
        }

        (Method::GET, "/version") => to_boxed(routes::version_info()),

        _ => not_found_response(&path),
    };

    Ok(response)
}

fn to_boxed(response: Response<Full<Bytes>>) -> Response<BoxBody> {
    response.map(|body| body.map_err(|never| match never {}).boxed())
}

fn preflight_response(cors_origin: Option<&str>) -> Response<BoxBody> {
    let mut builder = Response::builder().status(StatusCode::NO_CONTENT);

    if let Some(origin) = cors_origin {
        builder = builder
            .header("Access-Control-Allow-Origin", origin)
            .header("Access-Control-Allow-Methods", "GET, POST, OPTIONS")
            .header("Access-Control-Allow-Headers", "Content-Type, Authorization")
            .header("Access-Control-Allow-Credentials", "true")
            .header("Access-Control-Max-Age", "86400");
    }

    builder
        .body(Full::new(Bytes::new()).map_err(|never| match never {}).boxed())
        .unwrap()
}

fn not_found_response(path: &str) -> Response<BoxBody> {
    error_json(
        StatusCode::NOT_FOUND,
        &format!("Not found: {}", path),
    )
}

fn error_json(status: StatusCode, message: &str) -> Response<BoxBody> {
    let body = serde_json::json!({ "message": message }).to_string();

    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .body(Full::new(Bytes::from(body)).map_err(|never| match never {}).boxed())
        .unwrap()
}
