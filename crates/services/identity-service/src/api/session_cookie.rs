//! Session cookie read and write.

use axum::http::HeaderMap;
use axum_extra::extract::cookie::CookieJar;

use common::SessionConfig;

/// `Set-Cookie` value carrying a session id for `max_age_secs`.
pub fn session_cookie(config: &SessionConfig, session_id: &str, max_age_secs: i64) -> String {
    let mut cookie = format!(
        "{}={}; HttpOnly; SameSite=Strict; Path=/; Max-Age={}",
        config.cookie_name,
        session_id,
        max_age_secs.max(0)
    );
    if config.cookie_secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// `Set-Cookie` value that makes the browser drop the session cookie.
pub fn expired_session_cookie(config: &SessionConfig) -> String {
    session_cookie(config, "", 0)
}

/// Session id from the request cookies, if any.
pub fn read_session_cookie(headers: &HeaderMap, config: &SessionConfig) -> Option<String> {
    CookieJar::from_headers(headers)
        .get(&config.cookie_name)
        .map(|cookie| cookie.value().to_string())
        .filter(|value| !value.is_empty())
}
