use tower_cookies::{
    cookie::{
        time::{Duration, OffsetDateTime},
        SameSite,
    },
    Cookie, Cookies,
};

pub const SESSION_COOKIE: &str = "token";

/// Lifetime of the session cookie.
pub const SESSION_COOKIE_TTL: Duration = Duration::days(1);

pub fn set_session_cookie(cookies: &Cookies, token: &str) {
    let cookie = Cookie::build((SESSION_COOKIE, token.to_string()))
        .path("/")
        .http_only(true)
        .secure(true)
        .same_site(SameSite::None)
        .expires(OffsetDateTime::now_utc() + SESSION_COOKIE_TTL)
        .build();
    cookies.add(cookie);
}

/// Overwrites the session cookie with an empty, already-expired value.
pub fn clear_session_cookie(cookies: &Cookies) {
    let cookie = Cookie::build((SESSION_COOKIE, ""))
        .path("/")
        .http_only(true)
        .secure(true)
        .same_site(SameSite::None)
        .expires(OffsetDateTime::UNIX_EPOCH)
        .build();
    cookies.add(cookie);
}

pub fn session_token(cookies: &Cookies) -> Option<String> {
    cookies
        .get(SESSION_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty())
}
