//! Cookie-carried JWT authentication.
//!
//! Dual-token system: short-lived access tokens (15 min) gate protected
//! routes, long-lived refresh tokens (7 days) mint new access tokens on
//! request. Both are stateless and signed with independent secrets.

mod cookie;
mod errors;
mod extractors;
mod session;
mod state;
mod types;

pub use cookie::{ACCESS_COOKIE_NAME, CookiePolicy, REFRESH_COOKIE_NAME, get_cookie};
pub use errors::{AuthError, AuthErrorKind};
pub use extractors::{Auth, authenticate_request};
pub use session::{
    RefreshRotation, issue_session, narrow_refreshed_claims, refresh_session, terminate_session,
};
pub use state::HasAuthBackend;
pub use types::Identity;
