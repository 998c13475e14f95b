use crate::allowlist::DenyReason;

/// Errors produced while authorizing an inbound request.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("missing bearer token")]
    MissingToken,
    #[error("unsupported algorithm")]
    UnsupportedAlgorithm,
    #[error("missing key id")]
    MissingKeyId,
    #[error("signing key not found")]
    SigningKeyNotFound,
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("jwt error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),
    #[error("caller not authorized: {reason}")]
    UnauthorizedPrincipal { reason: DenyReason },
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl AuthError {
    /// Internal rejection reason recorded in logs and metrics.
    ///
    /// Every token-shaped failure collapses to `invalid-token`; only an
    /// allow-list denial is distinguished. Neither string is ever returned
    /// to the caller.
    pub fn reject_reason(&self) -> &'static str {
        match self {
            AuthError::UnauthorizedPrincipal { .. } => "unauthorized-principal",
            _ => "invalid-token",
        }
    }
}

pub type AuthResult<T> = Result<T, AuthError>;
