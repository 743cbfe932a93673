//! Error types for the cookie subsystem

/// A cookie could not be serialized into a `Set-Cookie` header.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CookieError {
    #[error("Invalid cookie name: {0:?}")]
    InvalidName(String),
    #[error("Invalid cookie value: {0:?}")]
    InvalidValue(String),
    #[error("Invalid cookie domain: {0:?}")]
    InvalidDomain(String),
    #[error("Invalid cookie path: {0:?}")]
    InvalidPath(String),
    #[error("Invalid SameSite value: {0:?}")]
    InvalidSameSite(String),
}

/// Failure reported by the host cookie API.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Cookie API error: {0}")]
pub struct CookieApiError(pub String);

/// Error type for cookie filtering.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FilteringError {
    #[error("Cookie permission not granted")]
    PermissionNotGranted,
    #[error(transparent)]
    Api(#[from] CookieApiError),
}
