//! Authentication data models

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// JWT claims structure
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Claims {
    pub sub: String,
    pub email: String,
    pub name: String,
    pub iat: i64,
    pub nbf: i64,
    pub exp: i64,
    pub jti: String,
    pub iss: String,
    pub aud: String,
}

/// Credential handed to the client after sign-in
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct TokenDetails {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

/// User database model
///
/// `name` is exposed as `username` and `deleted_at` is never serialized.
#[derive(FromRow, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: String,
    pub email: String,
    #[serde(rename = "username")]
    pub name: String,
    pub created_at: String,
    pub updated_at: String,
    #[serde(skip_serializing, default)]
    pub deleted_at: Option<String>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct LoginUrlResponse {
    pub login_url: String,
}

/// Query parameters the provider appends to the callback redirect
#[derive(Deserialize, Debug, Default)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}
