//! Axum extractors for authentication.

use axum::{extract::FromRequestParts, http::request::Parts};
use tracing::warn;

use super::cookie::{ACCESS_COOKIE_NAME, get_cookie};
use super::errors::{AuthError, AuthErrorKind};
use super::state::HasAuthBackend;
use super::types::Identity;

/// Verify the access cookie on a request.
/// Never refreshes: an expired access token is rejected and the client must
/// call `/refresh` itself.
pub fn authenticate_request<S>(parts: &Parts, state: &S) -> Result<Identity, AuthErrorKind>
where
    S: HasAuthBackend,
{
    let access_token =
        get_cookie(&parts.headers, ACCESS_COOKIE_NAME).ok_or(AuthErrorKind::MissingCredential)?;

    let codec = state.jwt().access();
    let claims = codec.verify(access_token).map_err(|e| {
        warn!(
            kind = codec.kind().as_str(),
            error = %e,
            path = %parts.uri.path(),
            "Rejected token"
        );
        AuthErrorKind::InvalidCredential
    })?;

    Ok(Identity::new(claims))
}

/// Extractor for routes that require a valid access token.
/// Rejects with 401 when no cookie is sent and 403 when it fails verification.
/// On success the identity is also stored in the request extensions.
pub struct Auth(pub Identity);

impl<S> FromRequestParts<S> for Auth
where
    S: HasAuthBackend + Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(identity) = parts.extensions.get::<Identity>() {
            return Ok(Auth(identity.clone()));
        }

        let identity = authenticate_request(parts, state)?;
        parts.extensions.insert(identity.clone());
        Ok(Auth(identity))
    }
}
