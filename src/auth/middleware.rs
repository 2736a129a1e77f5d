//! Gate layer for protected routers

use axum::{
    extract::{Extension, Request},
    middleware::Next,
    response::Response,
};

use super::extractors::{authenticate, reject};
use crate::common::{ApiError, SharedState};

/// Reject unauthenticated requests before they reach a handler and bind the
/// verified identity into request extensions.
///
/// Use with `route_layer(middleware::from_fn(require_auth))`.
pub async fn require_auth(
    Extension(state): Extension<SharedState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let user = authenticate(request.headers(), &state.credentials)
        .map_err(|rejection| reject(rejection, request.uri().path()))?;

    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}
