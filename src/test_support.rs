//! Shared fixtures for service and router tests

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header::AUTHORIZATION, Method, Request},
    response::Response,
    Router,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tower::ServiceExt;

use crate::auth::credentials::CredentialCodec;
use crate::auth::models::User;
use crate::auth::service::AuthService;
use crate::common::migrations::setup_test_db;
use crate::common::{AppConfig, AppState, SharedState};
use crate::services::identity_provider::{
    IdentityProvider, ProviderError, ProviderProfile, ProviderToken,
};
use crate::services::users::UserService;

pub const TEST_SECRET: &str = "router-test-signing-secret";
pub const TEST_APP_URL: &str = "http://localhost:3000";

/// In-process identity provider keyed by authorization code.
///
/// A code mapped to `None` exchanges fine but its profile fetch fails.
#[derive(Default)]
pub struct StubProvider {
    profiles: HashMap<String, Option<ProviderProfile>>,
    exchanges: AtomicUsize,
}

impl StubProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_profile(mut self, code: &str, email: &str, name: &str) -> Self {
        self.profiles.insert(
            code.to_string(),
            Some(ProviderProfile {
                email: email.to_string(),
                name: name.to_string(),
            }),
        );
        self
    }

    pub fn with_broken_profile(mut self, code: &str) -> Self {
        self.profiles.insert(code.to_string(), None);
        self
    }

    pub fn exchange_count(&self) -> usize {
        self.exchanges.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IdentityProvider for StubProvider {
    fn login_url(&self, state: &str) -> String {
        format!(
            "https://login.example.test/authorize?client_id=test&state={}",
            state
        )
    }

    async fn exchange_code(&self, code: &str) -> Result<ProviderToken, ProviderError> {
        self.exchanges.fetch_add(1, Ordering::SeqCst);
        if !self.profiles.contains_key(code) {
            return Err(ProviderError::ExchangeFailed(
                "token endpoint returned 400: invalid_grant".to_string(),
            ));
        }
        Ok(ProviderToken {
            access_token: format!("access-{}", code),
            token_type: "Bearer".to_string(),
            expires_in: Some(3600),
            refresh_token: None,
            scope: None,
        })
    }

    async fn fetch_profile(&self, access_token: &str) -> Result<ProviderProfile, ProviderError> {
        access_token
            .strip_prefix("access-")
            .and_then(|code| self.profiles.get(code))
            .cloned()
            .flatten()
            .ok_or_else(|| ProviderError::ProfileFetchFailed("profile endpoint returned 401".to_string()))
    }
}

pub struct TestApp {
    pub state: SharedState,
    pub provider: Arc<StubProvider>,
}

pub async fn test_app(provider: StubProvider) -> TestApp {
    let pool = setup_test_db().await;
    let config = AppConfig::from_lookup(|key| match key {
        "JWT_SECRET" => Some(TEST_SECRET.to_string()),
        "APP_URL" => Some(TEST_APP_URL.to_string()),
        _ => None,
    });

    let credentials = Arc::new(CredentialCodec::new(
        &config.jwt_secret,
        config.jwt_expiration_minutes,
    ));
    let provider = Arc::new(provider);
    let auth_service = Arc::new(AuthService::new(
        provider.clone(),
        UserService::new(pool.clone()),
        credentials.clone(),
    ));

    TestApp {
        state: Arc::new(AppState {
            db: pool,
            config: Arc::new(config),
            credentials,
            auth_service,
        }),
        provider,
    }
}

impl TestApp {
    pub fn router(&self) -> Router {
        crate::app_router(self.state.clone())
    }

    pub async fn send(&self, request: Request<Body>) -> Response {
        self.router().oneshot(request).await.unwrap()
    }

    /// Signed-in user plus a valid bearer credential for it
    pub async fn sign_in(&self, email: &str, name: &str) -> (User, String) {
        let user = UserService::new(self.state.db.clone())
            .reconcile(&ProviderProfile {
                email: email.to_string(),
                name: name.to_string(),
            })
            .await
            .unwrap();
        let issued = self
            .state
            .credentials
            .mint(&user.id, &user.email, &user.name)
            .unwrap();
        (user, issued.details.access_token)
    }
}

pub fn request(method: Method, uri: &str, token: Option<&str>, body: Option<serde_json::Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(AUTHORIZATION, format!("Bearer {}", token));
    }
    match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
