//! Sign-in orchestration
//!
//! `start_login` issues the anti-forgery state and provider URL; `complete_login`
//! turns an authorization code into a local user and a minted credential.
//! Nothing is persisted between the two calls except the state the client
//! round-trips through its cookie.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};

use super::credentials::{CredentialCodec, CredentialError};
use super::models::{TokenDetails, User};
use crate::common::safe_email_log;
use crate::services::identity_provider::{IdentityProvider, ProviderError};
use crate::services::users::{ReconcileError, UserService};

/// Bytes of randomness behind each anti-forgery state value
pub const STATE_BYTES: usize = 32;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("anti-forgery state missing or mismatched")]
    StateMismatch,

    #[error("could not generate anti-forgery state: {0}")]
    StateGeneration(String),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Reconcile(#[from] ReconcileError),

    #[error(transparent)]
    Credential(#[from] CredentialError),
}

impl AuthError {
    /// Pipeline step that failed, for logs only
    pub fn stage(&self) -> &'static str {
        match self {
            AuthError::StateMismatch => "state_check",
            AuthError::StateGeneration(_) => "state_generation",
            AuthError::Provider(ProviderError::ExchangeFailed(_)) => "code_exchange",
            AuthError::Provider(ProviderError::ProfileFetchFailed(_)) => "profile_fetch",
            AuthError::Reconcile(_) => "reconcile",
            AuthError::Credential(_) => "mint",
        }
    }
}

/// A login attempt: the state the client must hold and the URL to send it to
#[derive(Debug, Clone)]
pub struct LoginAttempt {
    pub state: String,
    pub login_url: String,
}

pub struct AuthService {
    provider: Arc<dyn IdentityProvider>,
    users: UserService,
    credentials: Arc<CredentialCodec>,
}

impl fmt::Debug for AuthService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthService")
            .field("users", &self.users)
            .field("credentials", &self.credentials)
            .finish_non_exhaustive()
    }
}

/// 32 random bytes from the OS, URL-safe Base64 without padding
pub fn generate_state() -> Result<String, AuthError> {
    let mut bytes = [0u8; STATE_BYTES];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| AuthError::StateGeneration(e.to_string()))?;
    Ok(URL_SAFE_NO_PAD.encode(bytes))
}

/// Equality whose running time depends only on the lengths of the inputs
pub(crate) fn constant_time_eq(a: &str, b: &str) -> bool {
    let (a, b) = (a.as_bytes(), b.as_bytes());
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

impl AuthService {
    pub fn new(
        provider: Arc<dyn IdentityProvider>,
        users: UserService,
        credentials: Arc<CredentialCodec>,
    ) -> Self {
        Self {
            provider,
            users,
            credentials,
        }
    }

    pub fn start_login(&self) -> Result<LoginAttempt, AuthError> {
        let state = generate_state()?;
        let login_url = self.provider.login_url(&state);
        Ok(LoginAttempt { state, login_url })
    }

    /// Compare the state issued at login with the one returned on callback
    pub fn verify_state(&self, issued: Option<&str>, returned: Option<&str>) -> Result<(), AuthError> {
        match (issued, returned) {
            (Some(issued), Some(returned)) if !issued.is_empty() && constant_time_eq(issued, returned) => {
                Ok(())
            }
            (issued, returned) => {
                warn!(
                    has_issued_state = issued.is_some(),
                    has_returned_state = returned.is_some(),
                    "Anti-forgery state check failed"
                );
                Err(AuthError::StateMismatch)
            }
        }
    }

    /// Exchange code, fetch profile, reconcile the user, mint a credential.
    /// Any failure aborts the whole attempt.
    pub async fn complete_login(&self, code: &str) -> Result<(TokenDetails, User), AuthError> {
        let provider_token = self.provider.exchange_code(code).await.map_err(|e| {
            error!(error = %e, operation = "code_exchange", "Failed to exchange code for token");
            AuthError::from(e)
        })?;

        let profile = self
            .provider
            .fetch_profile(&provider_token.access_token)
            .await
            .map_err(|e| {
                error!(error = %e, operation = "profile_fetch", "Failed to get user info");
                AuthError::from(e)
            })?;

        let user = self.users.reconcile(&profile).await.map_err(|e| {
            error!(
                error = %e,
                operation = "reconcile",
                email = %safe_email_log(&profile.email),
                "Failed to reconcile user"
            );
            AuthError::from(e)
        })?;

        let issued = self
            .credentials
            .mint(&user.id, &user.email, &user.name)
            .map_err(|e| {
                error!(error = %e, operation = "mint", user_id = %user.id, "Failed to generate JWT token");
                AuthError::from(e)
            })?;

        info!(
            user_id = %user.id,
            email = %safe_email_log(&user.email),
            "User logged in"
        );

        Ok((issued.details, user))
    }
}
