//! # Permissions Demo Server
//!
//! Small HTTP server showing route-level permission checks.
//!
//! Claims are read from the `x-claims` header as base64url-encoded JSON,
//! e.g. `{"sub":"alice","scope":"read,user:*"}`. The header is NOT verified;
//! in a real deployment an authentication layer decodes a signed token.
//!
//! ## Endpoints
//!
//! - `GET /documents` - requires `read`
//! - `POST /users` - requires `user:add`
//! - `DELETE /documents/:id` - requires `write`, or `moderator`
//! - `GET /feed` - requires `read` and not `suspended`
//! - `GET /admin` - admins only (`admin: true` in the claims)
//! - `GET /me` - requires `read`; reports ad-hoc checks
//! - `GET /health` - unguarded
//!
//! ## Configuration
//!
//! - `PORT` - HTTP server port (default: 8080)
//! - `RUST_LOG` - Log level (default: info)

use anyhow::Context;
use axum::{
    extract::{Extension, Request},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Json, Response},
    routing::{delete, get, post},
    serve, Router,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use cretoai_permissions::{
    http::{authorize, AuthDocument},
    AttachedPermissions, Guard, GuardOptions, Middleware,
};
use serde::Serialize;
use serde_json::{json, Value};
use std::net::SocketAddr;
use tokio::signal;
use tower::ServiceBuilder;
use tower_http::trace::{DefaultOnResponse, TraceLayer};
use tracing::{error, info, warn, Level};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const CLAIMS_HEADER: &str = "x-claims";

/// Error response body
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
}

/// Decode the claims header into the token document read by guards
async fn decode_claims(mut request: Request, next: Next) -> Response {
    let header = match request.headers().get(CLAIMS_HEADER) {
        Some(header) => header,
        None => return next.run(request).await,
    };

    let claims = header
        .to_str()
        .ok()
        .and_then(|encoded| URL_SAFE_NO_PAD.decode(encoded.trim()).ok())
        .and_then(|bytes| serde_json::from_slice::<Value>(&bytes).ok());

    match claims {
        Some(claims) => {
            request
                .extensions_mut()
                .insert(AuthDocument(json!({ "user": claims })));
            next.run(request).await
        }
        None => {
            warn!("Rejecting undecodable {} header", CLAIMS_HEADER);
            let body = Json(ErrorResponse {
                error: "bad_request".to_string(),
                message: format!("{} must be base64url-encoded JSON", CLAIMS_HEADER),
            });
            (StatusCode::BAD_REQUEST, body).into_response()
        }
    }
}

/// GET /me - Report the caller's permissions
async fn me(Extension(attached): Extension<AttachedPermissions>) -> Json<Value> {
    let Some(permissions) = attached.get("permissions") else {
        return Json(json!({ "admin": false, "granted": [] }));
    };

    let granted: Vec<&str> = permissions.granted().iter().map(|p| p.as_str()).collect();
    let can_add_users = permissions
        .has_permission(["user:add"])
        .await
        .unwrap_or(false);

    Json(json!({
        "admin": permissions.is_admin(),
        "granted": granted,
        "canAddUsers": can_add_users,
    }))
}

/// GET /health - Health check endpoint
async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "version": cretoai_permissions::VERSION,
    }))
}

/// Router guarded by one middleware
fn guarded(router: Router, check: Middleware) -> Router {
    router.route_layer(middleware::from_fn_with_state(check, authorize))
}

/// Create the HTTP router with all endpoints
fn create_router(guard: &Guard) -> anyhow::Result<Router> {
    let trace = TraceLayer::new_for_http().on_response(DefaultOnResponse::new().level(Level::INFO));

    let read = guarded(
        Router::new()
            .route("/documents", get(|| async { "documents" }))
            .route("/me", get(me)),
        guard.check(["read"])?,
    );
    let add_user = guarded(
        Router::new().route("/users", post(|| async { StatusCode::CREATED })),
        guard.check(["user:add"])?,
    );
    let remove = guarded(
        Router::new().route("/documents/:id", delete(|| async { StatusCode::NO_CONTENT })),
        guard.check(["write"])?.or(["moderator"])?,
    );
    let feed = guarded(
        Router::new().route("/feed", get(|| async { "feed" })),
        guard.check(["read"])?.not(["suspended"])?,
    );
    let admin = guarded(
        Router::new().route("/admin", get(|| async { "admin" })),
        guard.check(Vec::<&str>::new())?,
    );

    Ok(Router::new()
        .merge(read)
        .merge(add_user)
        .merge(remove)
        .merge(feed)
        .merge(admin)
        .route("/health", get(health_check))
        .layer(
            ServiceBuilder::new()
                .layer(trace)
                .layer(middleware::from_fn(decode_claims)),
        ))
}

/// Graceful shutdown handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        }
        _ = terminate => {
            info!("Received SIGTERM signal");
        }
    }

    info!("Starting graceful shutdown");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting permissions demo v{}", cretoai_permissions::VERSION);

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(8080);

    let guard = Guard::new(GuardOptions::new().with_admin_key("admin"))
        .context("invalid guard options")?;
    let app = create_router(&guard).context("invalid route permissions")?;

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    info!("Listening on {}", addr);

    serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("Server shut down gracefully");
    Ok(())
}
