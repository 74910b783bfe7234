//! Authentication state trait and macro.

use super::cookie::CookiePolicy;
use crate::jwt::JwtConfig;

/// Trait for state types that provide token codecs and cookie policy.
pub trait HasAuthBackend {
    fn jwt(&self) -> &JwtConfig;
    fn cookies(&self) -> &CookiePolicy;
}

/// Macro to implement `HasAuthBackend` for state structs with the standard fields.
///
/// The struct must have these fields:
/// - `jwt: Arc<JwtConfig>`
/// - `cookies: CookiePolicy`
///
/// # Example
/// ```ignore
/// use crate::impl_has_auth_backend;
///
/// #[derive(Clone)]
/// pub struct MyState {
///     pub jwt: Arc<JwtConfig>,
///     pub cookies: CookiePolicy,
///     // ... other fields
/// }
///
/// impl_has_auth_backend!(MyState);
/// ```
#[macro_export]
macro_rules! impl_has_auth_backend {
    ($state_type:ty) => {
        impl $crate::auth::HasAuthBackend for $state_type {
            fn jwt(&self) -> &$crate::jwt::JwtConfig {
                &self.jwt
            }
            fn cookies(&self) -> &$crate::auth::CookiePolicy {
                &self.cookies
            }
        }
    };
}
