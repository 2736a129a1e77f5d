// Application state shared across all modules

use sqlx::SqlitePool;
use std::sync::Arc;

use super::config::AppConfig;
use crate::auth::credentials::CredentialCodec;
use crate::auth::service::AuthService;

/// Application state containing database pool, services, and configuration.
/// Built once at startup and only ever read afterwards.
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub config: Arc<AppConfig>,
    pub credentials: Arc<CredentialCodec>,
    pub auth_service: Arc<AuthService>,
}

pub type SharedState = Arc<AppState>;
