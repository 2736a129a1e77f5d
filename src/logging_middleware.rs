// src/logging_middleware.rs
//! Request/response logging
//!
//! Records method, path, status and latency. Query strings and bodies are left
//! out: the sign-in callback carries authorization codes in its query.

use axum::{extract::Request, middleware::Next, response::Response};
use std::time::Instant;
use tracing::{debug, info, warn};

pub async fn log_request_response(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let started = Instant::now();

    debug!(method = %method, path = %path, "📥 Request");

    let response = next.run(request).await;

    let status = response.status().as_u16();
    let latency_ms = started.elapsed().as_millis() as u64;

    if response.status().is_server_error() {
        warn!(method = %method, path = %path, status, latency_ms, "📤 Response");
    } else {
        info!(method = %method, path = %path, status, latency_ms, "📤 Response");
    }

    response
}
