//! Administrative surface.
//!
//! - `POST /admin/config`: `action=update_url&new_url=...` replaces the persisted target
//! - `GET /admin/status`: version and the currently resolved target
//!
//! Both sit behind a bearer token; see `auth.rs`.

pub mod auth;
pub mod handlers;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use self::auth::admin_auth_middleware;
use self::handlers::*;
use crate::http::server::AppState;

pub fn setup_admin_router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/config", post(update_config))
        .route_layer(middleware::from_fn_with_state(state, admin_auth_middleware))
}
