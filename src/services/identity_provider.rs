// src/services/identity_provider.rs
//
// Seam between the sign-in flow and the external identity provider

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("authorization code exchange failed: {0}")]
    ExchangeFailed(String),

    #[error("profile fetch failed: {0}")]
    ProfileFetchFailed(String),
}

/// Tokens returned by the provider's token endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderToken {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: Option<i64>,
    pub refresh_token: Option<String>,
    pub scope: Option<String>,
}

/// The two profile fields the sign-in flow relies on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderProfile {
    pub email: String,
    pub name: String,
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Authorization endpoint URL echoing `state` back to the callback
    fn login_url(&self, state: &str) -> String;

    /// Exchange a single-use authorization code. Never retried.
    async fn exchange_code(&self, code: &str) -> Result<ProviderToken, ProviderError>;

    /// Fetch the signed-in principal's profile with the provider access token
    async fn fetch_profile(&self, access_token: &str) -> Result<ProviderProfile, ProviderError>;
}
