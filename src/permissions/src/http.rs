//! axum integration
//!
//! An upstream authentication layer decodes the access token and stores it
//! as an [`AuthDocument`] extension (e.g. `{"user": {...claims}}`). The
//! [`authorize`] middleware then runs a route's [`Middleware`] and, on
//! success, leaves an [`AttachedPermissions`] extension for handlers.
//!
//! ```rust,no_run
//! use axum::{middleware, routing::get, Router};
//! use cretoai_permissions::{http::authorize, Guard, GuardOptions};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let guard = Guard::new(GuardOptions::new())?;
//!
//! let app: Router = Router::new()
//!     .route("/documents", get(|| async { "documents" }))
//!     .route_layer(middleware::from_fn_with_state(guard.check(["read"])?, authorize));
//! # Ok(())
//! # }
//! ```

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::error;

use crate::config::KeyPath;
use crate::error::GuardError;
use crate::guard::{AttachedPermissions, GuardRequest, Middleware, Permissions};

/// Decoded token document placed in request extensions by authentication
#[derive(Debug, Clone)]
pub struct AuthDocument(pub Value);

impl<B> GuardRequest for axum::http::Request<B> {
    fn token_root(&self) -> Option<&Value> {
        self.extensions().get::<AuthDocument>().map(|doc| &doc.0)
    }

    fn describe(&self) -> Value {
        json!({
            "method": self.method().as_str(),
            "path": self.uri().path(),
        })
    }

    fn attach(&mut self, property: &KeyPath, permissions: Permissions) {
        let extensions = self.extensions_mut();
        match extensions.get_mut::<AttachedPermissions>() {
            Some(attached) => attached.insert(property, permissions),
            None => {
                let mut attached = AttachedPermissions::default();
                attached.insert(property, permissions);
                extensions.insert(attached);
            }
        }
    }
}

/// Route middleware for `axum::middleware::from_fn_with_state`
///
/// Failures are returned as the error response; the inner service is only
/// called once the check passes or is skipped.
pub async fn authorize(
    State(middleware): State<Middleware>,
    mut request: Request,
    next: Next,
) -> Result<Response, GuardError> {
    middleware.authorize(&mut request).await?;
    Ok(next.run(request).await)
}

/// Error response body
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
}

impl IntoResponse for GuardError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let message = if self.is_exposed() {
            self.to_string()
        } else {
            error!(code = self.code(), error = %self, "Authorization failed internally");
            "Internal server error".to_string()
        };

        let body = Json(ErrorResponse {
            error: self.code().to_string(),
            message,
        });

        (status, body).into_response()
    }
}
