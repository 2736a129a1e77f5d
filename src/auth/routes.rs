//! Authentication routes

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use super::handlers;
use super::middleware::require_auth;

/// Creates and returns the authentication router
///
/// # Routes
/// - `GET /auth/microsoft` - Start Microsoft sign-in
/// - `GET /auth/microsoft/callback` - Provider redirect target
/// - `POST /auth/signout` - Sign out (client-side credential removal)
/// - `GET /auth/me` - Current user (gated)
pub fn auth_routes() -> Router {
    let protected = Router::new()
        .route("/auth/me", get(handlers::me_handler))
        .route_layer(middleware::from_fn(require_auth));

    Router::new()
        .route("/auth/microsoft", get(handlers::microsoft_login))
        .route("/auth/microsoft/callback", get(handlers::microsoft_callback))
        .route("/auth/signout", post(handlers::signout_handler))
        .merge(protected)
}
