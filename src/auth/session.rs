//! Session lifecycle: login issuance, refresh, and logout.
//!
//! Sessions are stateless. Nothing here touches the store, and nothing is
//! revoked server-side: logout only tells the browser to drop its cookies.

use axum::http::HeaderMap;
use serde_json::Value;
use tracing::{error, warn};

use super::cookie::{ACCESS_COOKIE_NAME, CookiePolicy, REFRESH_COOKIE_NAME, get_cookie};
use super::errors::AuthErrorKind;
use crate::jwt::{Claims, JwtConfig, JwtError};

/// Whether `/refresh` also hands out a new refresh token.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RefreshRotation {
    /// The refresh token is left alone and stays valid for its full lifetime.
    #[default]
    Disabled,
    /// A new refresh cookie with the same claims and a fresh lifetime is set.
    /// The presented token is not revoked and keeps verifying until it expires.
    Reissue,
}

/// Sign an access and a refresh token from the same claims and return the
/// two `Set-Cookie` values, access first.
pub fn issue_session(
    jwt: &JwtConfig,
    cookies: &CookiePolicy,
    claims: &Claims,
) -> Result<[String; 2], JwtError> {
    let access = jwt.access().sign(claims)?;
    let refresh = jwt.refresh().sign(claims)?;

    Ok([
        cookies.set(ACCESS_COOKIE_NAME, &access.token, access.duration),
        cookies.set(REFRESH_COOKIE_NAME, &refresh.token, refresh.duration),
    ])
}

/// Claims carried into a refreshed access token: only `email`, copied as-is
/// (an explicit `null` stays `null`, an absent one stays absent).
///
/// Everything else from login (`uid`, `name`, `photo`, ...) is dropped, so a
/// refreshed access token is poorer than the one issued at login.
pub fn narrow_refreshed_claims(claims: &Claims) -> Claims {
    let mut narrowed = Claims::new();
    if let Some(email) = claims.get("email") {
        narrowed.insert("email".to_string(), Value::clone(email));
    }
    narrowed
}

/// Verify the refresh cookie and mint a new access token from it.
/// Returns the `Set-Cookie` values to send, access cookie first.
pub fn refresh_session(
    jwt: &JwtConfig,
    cookies: &CookiePolicy,
    headers: &HeaderMap,
    rotation: RefreshRotation,
) -> Result<Vec<String>, AuthErrorKind> {
    let refresh_token =
        get_cookie(headers, REFRESH_COOKIE_NAME).ok_or(AuthErrorKind::MissingCredential)?;

    let claims = jwt.refresh().verify(refresh_token).map_err(|e| {
        warn!(kind = jwt.refresh().kind().as_str(), error = %e, "Rejected token");
        AuthErrorKind::InvalidCredential
    })?;

    let access = jwt
        .access()
        .sign(&narrow_refreshed_claims(&claims))
        .map_err(|e| {
            error!(error = %e, "Failed to generate access token");
            AuthErrorKind::Internal
        })?;

    let mut set_cookies = vec![cookies.set(ACCESS_COOKIE_NAME, &access.token, access.duration)];

    if rotation == RefreshRotation::Reissue {
        let refresh = jwt.refresh().sign(&claims).map_err(|e| {
            error!(error = %e, "Failed to generate refresh token");
            AuthErrorKind::Internal
        })?;
        set_cookies.push(cookies.set(REFRESH_COOKIE_NAME, &refresh.token, refresh.duration));
    }

    Ok(set_cookies)
}

/// `Set-Cookie` values that remove both session cookies.
pub fn terminate_session(cookies: &CookiePolicy) -> [String; 2] {
    [
        cookies.clear(ACCESS_COOKIE_NAME),
        cookies.clear(REFRESH_COOKIE_NAME),
    ]
}
