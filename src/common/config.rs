// src/common/config.rs
//! Process configuration loaded once at startup
//! Built from environment variables (after `.env` is applied) and never mutated afterwards

use std::env;
use std::fmt;
use std::time::Duration;

const DEFAULT_JWT_SECRET: &str = "replace_with_strong_secret";

/// Credential lifetimes above one year fall back to the default
pub const MAX_JWT_EXPIRATION_MINUTES: i64 = 525_600;

/// Microsoft identity platform settings used by the sign-in flow
#[derive(Clone)]
pub struct MicrosoftConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub tenant_id: String,
    pub authority_url: String,
    pub graph_url: String,
    pub timeout: Duration,
}

impl fmt::Debug for MicrosoftConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MicrosoftConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("redirect_uri", &self.redirect_uri)
            .field("tenant_id", &self.tenant_id)
            .field("authority_url", &self.authority_url)
            .field("graph_url", &self.graph_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Application configuration
#[derive(Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub jwt_secret: String,
    pub jwt_expiration_minutes: i64,
    pub app_url: String,
    pub cookie_secure: bool,
    pub microsoft: MicrosoftConfig,
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database_url", &self.database_url)
            .field("jwt_secret", &"<redacted>")
            .field("jwt_expiration_minutes", &self.jwt_expiration_minutes)
            .field("app_url", &self.app_url)
            .field("cookie_secure", &self.cookie_secure)
            .field("microsoft", &self.microsoft)
            .finish()
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    /// Empty values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str, default: &str| -> String {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        let port = get("PORT", "8080").parse::<u16>().unwrap_or(8080);

        let jwt_expiration_minutes = get("JWT_EXPIRATION_MINUTES", "60")
            .parse::<i64>()
            .ok()
            .filter(|m| (1..=MAX_JWT_EXPIRATION_MINUTES).contains(m))
            .unwrap_or(60);

        let timeout_secs = get("PROVIDER_TIMEOUT_SECS", "10")
            .parse::<u64>()
            .ok()
            .filter(|s| *s > 0)
            .unwrap_or(10);

        let cookie_secure = get("COOKIE_SECURE", "false").to_lowercase() == "true";

        Self {
            host: get("HOST", "0.0.0.0"),
            port,
            database_url: get("DATABASE_URL", "sqlite://social_auth_api.db"),
            jwt_secret: get("JWT_SECRET", DEFAULT_JWT_SECRET),
            jwt_expiration_minutes,
            app_url: get("APP_URL", "http://localhost:3000")
                .trim_end_matches('/')
                .to_string(),
            cookie_secure,
            microsoft: MicrosoftConfig {
                client_id: get("MICROSOFT_CLIENT_ID", ""),
                client_secret: get("MICROSOFT_CLIENT_SECRET", ""),
                redirect_uri: get(
                    "MICROSOFT_REDIRECT_URI",
                    "http://localhost:8080/auth/microsoft/callback",
                ),
                tenant_id: get("MICROSOFT_TENANT_ID", "common"),
                authority_url: get(
                    "MICROSOFT_AUTHORITY_URL",
                    "https://login.microsoftonline.com",
                )
                .trim_end_matches('/')
                .to_string(),
                graph_url: get("MICROSOFT_GRAPH_URL", "https://graph.microsoft.com")
                    .trim_end_matches('/')
                    .to_string(),
                timeout: Duration::from_secs(timeout_secs),
            },
        }
    }

    pub fn uses_default_secret(&self) -> bool {
        self.jwt_secret == DEFAULT_JWT_SECRET
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
