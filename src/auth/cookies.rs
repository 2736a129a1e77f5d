// Anti-forgery state cookie helpers

use axum::http::{header::COOKIE, HeaderMap};

pub const STATE_COOKIE: &str = "oauth_state";

/// Lifetime of a login attempt's state cookie
pub const STATE_COOKIE_MAX_AGE_SECS: u64 = 600;

/// `Set-Cookie` value carrying the state issued at login
pub fn state_cookie(value: &str, secure: bool) -> String {
    let mut cookie = format!(
        "{}={}; Path=/; Max-Age={}; HttpOnly; SameSite=Lax",
        STATE_COOKIE, value, STATE_COOKIE_MAX_AGE_SECS
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// `Set-Cookie` value expiring the state cookie
pub fn clear_state_cookie(secure: bool) -> String {
    let mut cookie = format!("{}=; Path=/; Max-Age=0; HttpOnly; SameSite=Lax", STATE_COOKIE);
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// First value of cookie `name` across all `Cookie` headers
pub fn read_cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_state_cookie_attributes() {
        let cookie = state_cookie("abc", false);
        assert_eq!(
            cookie,
            "oauth_state=abc; Path=/; Max-Age=600; HttpOnly; SameSite=Lax"
        );
        assert!(state_cookie("abc", true).ends_with("; Secure"));
    }

    #[test]
    fn test_clear_cookie_expires_immediately() {
        let cookie = clear_state_cookie(false);
        assert!(cookie.starts_with("oauth_state=;"));
        assert!(cookie.contains("Max-Age=0"));
        assert!(!cookie.contains("Secure"));
    }

    #[test]
    fn test_read_cookie_among_several() {
        let mut headers = HeaderMap::new();
        headers.append(COOKIE, HeaderValue::from_static("theme=dark"));
        headers.append(COOKIE, HeaderValue::from_static("lang=en; oauth_state=xyz-123"));

        assert_eq!(read_cookie(&headers, STATE_COOKIE), Some("xyz-123"));
        assert_eq!(read_cookie(&headers, "theme"), Some("dark"));
        assert_eq!(read_cookie(&headers, "missing"), None);
    }

    #[test]
    fn test_read_cookie_does_not_match_prefix() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("oauth_state_old=stale"));

        assert_eq!(read_cookie(&headers, STATE_COOKIE), None);
    }
}
