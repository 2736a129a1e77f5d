use super::handlers;
use crate::auth::middleware::require_auth;
use axum::{middleware, routing::get, Router};

/// Creates the posts router. Every route sits behind the access gate.
pub fn posts_routes() -> Router {
    Router::new()
        .route(
            "/posts",
            get(handlers::list_posts).post(handlers::create_post),
        )
        .route(
            "/posts/:id",
            get(handlers::get_post)
                .put(handlers::update_post)
                .delete(handlers::delete_post),
        )
        .route_layer(middleware::from_fn(require_auth))
}
