//! Admin endpoints for breaker inspection.
//!
//! Mounted on the gateway router when `admin.enabled` is set. Every route
//! requires `Authorization: Bearer <admin.api_key>`.

pub mod auth;
pub mod handlers;

use axum::{middleware, routing::get, Router};

use self::auth::admin_auth_middleware;
use self::handlers::{get_breakers, get_status};
use crate::http::server::AppState;

pub fn router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/breakers", get(get_breakers))
        .route_layer(middleware::from_fn_with_state(state, admin_auth_middleware))
}
