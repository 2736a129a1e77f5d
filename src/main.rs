// src/main.rs
use axum::{
    extract::Extension,
    http::{header, HeaderValue, Method},
    middleware,
    routing::get,
    Json, Router,
};
use dotenv::dotenv;
use serde_json::json;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::path::PathBuf;
use std::{str::FromStr, sync::Arc};
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

// ============================================================================
// MODULE IMPORTS
// ============================================================================

mod auth;
mod common;
mod logging_middleware;
mod posts;
mod services;

#[cfg(test)]
mod test_support;

// ============================================================================
// COMMON IMPORTS
// ============================================================================

use auth::credentials::CredentialCodec;
use auth::service::AuthService;
use common::{AppConfig, AppState, SharedState};
use services::{MicrosoftService, UserService};

// ============================================================================
// ROUTER COMPOSITION
// ============================================================================

async fn health_handler() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

/// Full application router over an already built state
pub fn app_router(state: SharedState) -> Router {
    let cors = {
        let origins: Vec<HeaderValue> = state
            .config
            .app_url
            .parse()
            .ok()
            .into_iter()
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
            .allow_credentials(true)
    };

    Router::new()
        // ====================================================================
        // AUTHENTICATION ROUTES
        // ====================================================================
        .merge(auth::auth_routes())
        // ====================================================================
        // POST ROUTES (gated)
        // ====================================================================
        .merge(posts::posts_routes())
        .route("/health", get(health_handler))
        // ====================================================================
        // MIDDLEWARE AND LAYERS
        // ====================================================================
        .layer(middleware::from_fn(logging_middleware::log_request_response))
        .layer(Extension(state))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

// ============================================================================
// MAIN APPLICATION ENTRY POINT
// ============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    // ========================================================================
    // ENVIRONMENT CONFIGURATION
    // ========================================================================

    let config = AppConfig::from_env();
    info!(config = ?config, "Configuration loaded");

    if config.uses_default_secret() {
        warn!("JWT_SECRET is not set - using the built-in development secret. Run `cargo run --bin generate_secret` for a real one");
    }
    if config.microsoft.client_id.is_empty() || config.microsoft.client_secret.is_empty() {
        warn!("MICROSOFT_CLIENT_ID / MICROSOFT_CLIENT_SECRET not set - Microsoft sign-in will fail");
    }

    // ========================================================================
    // DATABASE SETUP
    // ========================================================================

    if let Some(path_part) = config.database_url.strip_prefix("sqlite://") {
        let path_without_params = path_part.split('?').next().unwrap_or("");
        if !path_without_params.is_empty() && !path_without_params.starts_with(':') {
            let db_path = PathBuf::from(path_without_params);
            if let Some(parent) = db_path.parent() {
                if !parent.as_os_str().is_empty() {
                    tokio::fs::create_dir_all(parent).await?;
                }
            }
        }
    }

    let connect_options =
        SqliteConnectOptions::from_str(&config.database_url)?.create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .connect_with(connect_options)
        .await?;

    // Run database migrations
    common::migrations::run_migrations(&pool).await?;

    // ========================================================================
    // SERVICE INITIALIZATION
    // ========================================================================

    let credentials = Arc::new(CredentialCodec::new(
        &config.jwt_secret,
        config.jwt_expiration_minutes,
    ));
    info!(ttl_minutes = credentials.ttl().num_minutes(), "CredentialCodec initialized");

    let microsoft = Arc::new(MicrosoftService::new(config.microsoft.clone())?);
    info!(tenant = %config.microsoft.tenant_id, "MicrosoftService initialized");

    let auth_service = Arc::new(AuthService::new(
        microsoft,
        UserService::new(pool.clone()),
        credentials.clone(),
    ));
    info!("AuthService initialized");

    // ========================================================================
    // APPLICATION STATE
    // ========================================================================

    let bind_address = config.bind_address();
    let shared: SharedState = Arc::new(AppState {
        db: pool,
        config: Arc::new(config),
        credentials,
        auth_service,
    });

    let app = app_router(shared);

    // ========================================================================
    // SERVER STARTUP
    // ========================================================================

    info!("Listening on {}", bind_address);
    let listener = TcpListener::bind(&bind_address).await?;
    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}
