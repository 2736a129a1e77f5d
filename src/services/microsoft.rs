// src/services/microsoft.rs
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, error, info, warn};

use crate::common::config::MicrosoftConfig;
use crate::services::identity_provider::{
    IdentityProvider, ProviderError, ProviderProfile, ProviderToken,
};

/// Scopes requested at sign-in:
/// - openid, profile, email: basic identity
/// - offline_access: refresh token (informational, never redeemed here)
/// - User.Read: Microsoft Graph `/me`
const SCOPES: [&str; 5] = ["openid", "profile", "email", "offline_access", "User.Read"];

/// Subset of the Graph `/me` payload. Both fields must be present.
#[derive(Debug, Deserialize)]
struct GraphProfile {
    #[serde(rename = "userPrincipalName")]
    user_principal_name: Option<String>,
    #[serde(rename = "displayName")]
    display_name: Option<String>,
}

impl TryFrom<GraphProfile> for ProviderProfile {
    type Error = ProviderError;

    fn try_from(profile: GraphProfile) -> Result<Self, Self::Error> {
        let required = |value: Option<String>, field: &str| {
            value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or_else(|| {
                    ProviderError::ProfileFetchFailed(format!("profile is missing {}", field))
                })
        };

        Ok(ProviderProfile {
            email: required(profile.user_principal_name, "userPrincipalName")?,
            name: required(profile.display_name, "displayName")?,
        })
    }
}

/// Microsoft identity platform (Entra ID) client for the authorization-code flow
#[derive(Debug, Clone)]
pub struct MicrosoftService {
    config: MicrosoftConfig,
    client: Client,
}

impl MicrosoftService {
    /// Outbound calls share one client bounded by the configured timeout
    pub fn new(config: MicrosoftConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { config, client })
    }

    fn authorize_endpoint(&self) -> String {
        format!(
            "{}/{}/oauth2/v2.0/authorize",
            self.config.authority_url, self.config.tenant_id
        )
    }

    fn token_endpoint(&self) -> String {
        format!(
            "{}/{}/oauth2/v2.0/token",
            self.config.authority_url, self.config.tenant_id
        )
    }

    fn profile_endpoint(&self) -> String {
        format!("{}/v1.0/me", self.config.graph_url)
    }
}

#[async_trait]
impl IdentityProvider for MicrosoftService {
    fn login_url(&self, state: &str) -> String {
        let scope_param = SCOPES.join(" ");

        format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&state={}",
            self.authorize_endpoint(),
            urlencoding::encode(&self.config.client_id),
            urlencoding::encode(&self.config.redirect_uri),
            urlencoding::encode(&scope_param),
            urlencoding::encode(state)
        )
    }

    async fn exchange_code(&self, code: &str) -> Result<ProviderToken, ProviderError> {
        let scope_param = SCOPES.join(" ");
        let params = [
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("code", code),
            ("redirect_uri", self.config.redirect_uri.as_str()),
            ("grant_type", "authorization_code"),
            ("scope", scope_param.as_str()),
        ];

        debug!(tenant = %self.config.tenant_id, "Exchanging authorization code for tokens");

        let response = self
            .client
            .post(self.token_endpoint())
            .form(&params)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, timeout = e.is_timeout(), "Token endpoint request failed");
                ProviderError::ExchangeFailed(e.to_string())
            })?;

        let status = response.status();

        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            warn!(status = %status, error = %error_text, "Token exchange rejected");
            return Err(ProviderError::ExchangeFailed(format!("HTTP {}", status)));
        }

        let token = response.json::<ProviderToken>().await.map_err(|e| {
            error!(error = %e, "Token endpoint returned an undecodable body");
            ProviderError::ExchangeFailed(format!("invalid token response: {}", e))
        })?;

        info!(
            has_refresh_token = token.refresh_token.is_some(),
            "Exchanged authorization code for tokens"
        );
        Ok(token)
    }

    async fn fetch_profile(&self, access_token: &str) -> Result<ProviderProfile, ProviderError> {
        let response = self
            .client
            .get(self.profile_endpoint())
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, timeout = e.is_timeout(), "Graph profile request failed");
                ProviderError::ProfileFetchFailed(e.to_string())
            })?;

        let status = response.status();
        if !status.is_success() {
            warn!(status = %status, "Graph profile request rejected");
            return Err(ProviderError::ProfileFetchFailed(format!("HTTP {}", status)));
        }

        let profile = response.json::<GraphProfile>().await.map_err(|e| {
            error!(error = %e, "Graph profile body could not be decoded");
            ProviderError::ProfileFetchFailed(format!("invalid profile response: {}", e))
        })?;

        ProviderProfile::try_from(profile)
    }
}
