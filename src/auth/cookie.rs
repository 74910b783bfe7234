//! Session cookie policy and cookie parsing.

use axum::http::header;

/// Cookie name for the access token (short-lived, 15 minutes).
pub const ACCESS_COOKIE_NAME: &str = "access_token";

/// Cookie name for the refresh token (long-lived, 7 days).
pub const REFRESH_COOKIE_NAME: &str = "refresh_token";

/// Cookie attributes for the current deployment, resolved once at startup.
///
/// Production spans distinct sites, so cookies must be delivered cross-site
/// (`SameSite=None`), which browsers only accept together with `Secure`.
/// Development runs over plain HTTP on localhost ports, where neither works.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookiePolicy {
    pub is_production: bool,
    pub path: String,
}

impl CookiePolicy {
    pub fn new(is_production: bool) -> Self {
        Self {
            is_production,
            path: "/".to_string(),
        }
    }

    pub fn production() -> Self {
        Self::new(true)
    }

    pub fn development() -> Self {
        Self::new(false)
    }

    /// The attribute set shared by `set` and `clear`.
    /// A browser only removes a cookie when these match the ones it was set with.
    pub fn attributes(&self) -> String {
        if self.is_production {
            format!("HttpOnly; Path={}; SameSite=None; Secure", self.path)
        } else {
            format!("HttpOnly; Path={}; SameSite=Strict", self.path)
        }
    }

    /// Build a `Set-Cookie` value storing `value` for `max_age` seconds.
    pub fn set(&self, name: &str, value: &str, max_age: u64) -> String {
        format!("{}={}; {}; Max-Age={}", name, value, self.attributes(), max_age)
    }

    /// Build a `Set-Cookie` value that removes the cookie.
    pub fn clear(&self, name: &str) -> String {
        format!("{}=; {}; Max-Age=0", name, self.attributes())
    }
}

impl Default for CookiePolicy {
    fn default() -> Self {
        Self::development()
    }
}

/// Extract a cookie value from the Cookie header.
pub fn get_cookie<'a>(headers: &'a axum::http::HeaderMap, name: &str) -> Option<&'a str> {
    let cookie_header = headers.get(header::COOKIE)?.to_str().ok()?;
    for part in cookie_header.split(';') {
        let part = part.trim();
        if let Some((key, value)) = part.split_once('=') {
            if key.trim() == name {
                let value = value.trim();
                // An emptied cookie is the same as no cookie.
                return (!value.is_empty()).then_some(value);
            }
        }
    }
    None
}
