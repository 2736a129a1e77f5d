//! Access gate and the `AuthedUser` extractor

use async_trait::async_trait;
use axum::{
    extract::{Extension, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};
use thiserror::Error;
use tracing::{debug, warn};

use super::credentials::{CredentialCodec, CredentialError};
use crate::common::{safe_email_log, ApiError, SharedState};

/// Identity bound to a request by a verified bearer credential
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthedUser {
    pub id: String,
    pub email: String,
    pub name: String,
}

#[derive(Debug, Error, PartialEq)]
pub enum GateRejection {
    #[error("missing Authorization header")]
    MissingHeader,

    #[error("Authorization header is not a bearer credential")]
    InvalidScheme,

    #[error("invalid credential: {0}")]
    InvalidCredential(#[from] CredentialError),
}

/// Verify the bearer credential in `headers` and return the identity it names.
///
/// The scheme match is case-insensitive and an empty token counts as a bad
/// scheme. No store lookup happens here.
pub fn authenticate(headers: &HeaderMap, codec: &CredentialCodec) -> Result<AuthedUser, GateRejection> {
    let header = headers
        .get(AUTHORIZATION)
        .ok_or(GateRejection::MissingHeader)?;
    let value = header.to_str().map_err(|_| GateRejection::InvalidScheme)?;
    let token = bearer_token(value).ok_or(GateRejection::InvalidScheme)?;

    let claims = codec.verify(token)?;

    debug!(
        user_id = %claims.sub,
        email = %safe_email_log(&claims.email),
        "Bearer credential accepted"
    );

    Ok(AuthedUser {
        id: claims.sub,
        email: claims.email,
        name: claims.name,
    })
}

fn bearer_token(value: &str) -> Option<&str> {
    let (scheme, token) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

/// Log the cause and collapse it to the uniform 401
pub(crate) fn reject(rejection: GateRejection, path: &str) -> ApiError {
    warn!(reason = %rejection, path = %path, "Authentication failed");
    ApiError::unauthorized()
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthedUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        // Already bound by `require_auth`
        if let Some(user) = parts.extensions.get::<AuthedUser>() {
            return Ok(user.clone());
        }

        let Extension(app_state): Extension<SharedState> = Extension::from_request_parts(parts, state)
            .await
            .map_err(|_| ApiError::InternalServer("missing app state".to_string()))?;

        authenticate(&parts.headers, &app_state.credentials)
            .map_err(|rejection| reject(rejection, parts.uri.path()))
    }
}
