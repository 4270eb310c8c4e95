//! Admin API: the settings-save surface for path masks.
//!
//! ```text
//! GET  /admin/status  engine generation, table size, artifact location
//! GET  /admin/paths   sanitized segments and the internal layout
//! PUT  /admin/paths   save raw segments (422 on collisions)
//! GET  /admin/rules   rendered rule block, table entries, route rules
//! ```
//!
//! Every route requires `Authorization: Bearer <admin.api_key>`.

pub mod auth;
pub mod handlers;

use axum::{middleware, routing::get, Router};

use self::auth::admin_auth_middleware;
use self::handlers::*;
use crate::http::server::AppState;

pub fn setup_admin_router(state: AppState) -> Router {
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/paths", get(get_paths).put(put_paths))
        .route("/admin/rules", get(get_rules))
        .layer(middleware::from_fn_with_state(state.clone(), admin_auth_middleware))
        .with_state(state)
}
