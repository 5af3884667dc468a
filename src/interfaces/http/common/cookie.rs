//! `auth_token` session cookie

use axum::http::header::{HeaderValue, COOKIE};
use axum::http::HeaderMap;

pub const SESSION_COOKIE: &str = "auth_token";

/// `Max-Age` comes from the same TTL that sets the token's `exp` claim.
pub fn session_cookie(token: &str, max_age_secs: i64, secure: bool) -> String {
    let mut cookie = format!(
        "{}={}; HttpOnly; Path=/; Max-Age={}; SameSite=Lax",
        SESSION_COOKIE, token, max_age_secs
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

pub fn clear_session_cookie(secure: bool) -> String {
    let mut cookie = format!(
        "{}=; HttpOnly; Path=/; Max-Age=0; Expires=Thu, 01 Jan 1970 00:00:00 GMT; SameSite=Lax",
        SESSION_COOKIE
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

pub fn session_token_from_cookies(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value: &HeaderValue| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == SESSION_COOKIE && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cookie_attributes() {
        let cookie = session_cookie("abc", 3600, false);
        assert_eq!(cookie, "auth_token=abc; HttpOnly; Path=/; Max-Age=3600; SameSite=Lax");
        assert!(session_cookie("abc", 60, true).ends_with("; Secure"));

        let cleared = clear_session_cookie(false);
        assert!(cleared.starts_with("auth_token=;"));
        assert!(cleared.contains("Max-Age=0"));
        assert!(cleared.contains("Expires=Thu, 01 Jan 1970 00:00:00 GMT"));
    }

    #[test]
    fn reads_token_among_other_cookies() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("theme=dark; auth_token=tok.en.x; lang=en"));
        assert_eq!(session_token_from_cookies(&headers).as_deref(), Some("tok.en.x"));

        let mut empty = HeaderMap::new();
        empty.insert(COOKIE, HeaderValue::from_static("auth_token="));
        assert!(session_token_from_cookies(&empty).is_none());
    }
}
