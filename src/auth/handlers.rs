//! Authentication handlers

use axum::{
    extract::{Extension, Json, Query},
    http::{header::SET_COOKIE, HeaderMap, HeaderValue},
    response::{AppendHeaders, IntoResponse, Redirect, Response},
};
use serde_json::json;
use tracing::{debug, error, info, warn};

use super::cookies::{clear_state_cookie, read_cookie, state_cookie, STATE_COOKIE};
use super::extractors::AuthedUser;
use super::models::{CallbackQuery, LoginUrlResponse};
use crate::common::{safe_token_log, ApiError, AppState, SharedState};
use crate::services::users::UserService;

/// GET /auth/microsoft
/// Starts a sign-in attempt
///
/// # Response
/// ```json
/// {
///   "login_url": "https://login.microsoftonline.com/..."
/// }
/// ```
/// plus a `Set-Cookie` carrying the anti-forgery state.
pub async fn microsoft_login(
    Extension(state): Extension<SharedState>,
) -> Result<impl IntoResponse, ApiError> {
    let attempt = state.auth_service.start_login().map_err(|e| {
        error!(error = %e, "Failed to start Microsoft login");
        ApiError::InternalServer("Failed to initiate login".to_string())
    })?;

    info!("Issued Microsoft login URL");

    let cookie = state_cookie(&attempt.state, state.config.cookie_secure);
    Ok((
        AppendHeaders([(SET_COOKIE, cookie)]),
        Json(LoginUrlResponse {
            login_url: attempt.login_url,
        }),
    ))
}

/// GET /auth/microsoft/callback
/// Provider redirect target. Redirects to `{APP_URL}/login` with the
/// credential and user on success. The state cookie is cleared on every
/// outcome.
pub async fn microsoft_callback(
    Extension(state): Extension<SharedState>,
    headers: HeaderMap,
    Query(query): Query<CallbackQuery>,
) -> Response {
    let mut response = match handle_callback(&state, &headers, query).await {
        Ok(redirect) => redirect.into_response(),
        Err(e) => e.into_response(),
    };

    if let Ok(value) = HeaderValue::from_str(&clear_state_cookie(state.config.cookie_secure)) {
        response.headers_mut().append(SET_COOKIE, value);
    }
    response
}

async fn handle_callback(
    state: &AppState,
    headers: &HeaderMap,
    query: CallbackQuery,
) -> Result<Redirect, ApiError> {
    state
        .auth_service
        .verify_state(read_cookie(headers, STATE_COOKIE), query.state.as_deref())
        .map_err(|_| ApiError::unauthorized())?;

    if let Some(oauth_error) = &query.error {
        warn!(
            oauth_error = %oauth_error,
            description = ?query.error_description,
            "Microsoft returned an authorization error"
        );
        return Err(ApiError::BadRequest("Authorization was not granted".to_string()));
    }

    let code = match query.code.as_deref() {
        Some(code) if !code.is_empty() => code,
        _ => {
            warn!("Callback without authorization code");
            return Err(ApiError::BadRequest("Code not found".to_string()));
        }
    };

    debug!(code = %safe_token_log(code), "Received Microsoft authorization code");

    let (token, user) = state.auth_service.complete_login(code).await.map_err(|e| {
        error!(error = %e, stage = e.stage(), "Failed to handle Microsoft callback");
        ApiError::AuthenticationFailed("Failed to authenticate".to_string())
    })?;

    let token_json = serde_json::to_string(&token).map_err(|e| {
        error!(error = %e, user_id = %user.id, "Failed to serialize token details");
        ApiError::InternalServer("Failed to authenticate".to_string())
    })?;
    let user_json = serde_json::to_string(&user).map_err(|e| {
        error!(error = %e, user_id = %user.id, "Failed to serialize user");
        ApiError::InternalServer("Failed to authenticate".to_string())
    })?;

    let target = format!(
        "{}/login?token={}&user={}",
        state.config.app_url,
        urlencoding::encode(&token_json),
        urlencoding::encode(&user_json)
    );
    Ok(Redirect::temporary(&target))
}

/// POST /auth/signout
/// Stateless: the client drops its credential. Issued credentials stay valid
/// until they expire.
pub async fn signout_handler(authed: Option<AuthedUser>) -> Json<serde_json::Value> {
    match authed {
        Some(user) => info!(user_id = %user.id, "User signed out"),
        None => info!("Anonymous sign-out"),
    }
    Json(json!({ "message": "Successfully signed out" }))
}

/// GET /auth/me
pub async fn me_handler(
    Extension(state): Extension<SharedState>,
    authed: AuthedUser,
) -> Result<Json<serde_json::Value>, ApiError> {
    let user = UserService::new(state.db.clone())
        .find_by_id(&authed.id)
        .await?
        .ok_or_else(|| {
            warn!(user_id = %authed.id, "Credential names a user that no longer exists");
            ApiError::NotFound("User not found".to_string())
        })?;

    Ok(Json(json!({ "user": user })))
}
