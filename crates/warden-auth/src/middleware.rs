//! Request-pipeline authorization middleware.
//!
//! # Purpose
//! Runs the full inbound decision (bearer extraction, token validation,
//! claim extraction, allow-list match) before any protected handler, and
//! turns every failure into a uniform 401. Handlers only ever observe
//! accepted requests.
//!
//! # Architectural role
//! The environment gate is a builder-time branch: `RequestAuthorizer` is
//! constructed once at startup as either the enforcing validator or the
//! permissive pass-through, both behind the same `authorize` call. The
//! request path never branches on mode.
//!
//! # Security boundary
//! The 401 body is identical for every failure cause; rejection reasons,
//! principal identifiers, and the allow-list appear in server-side logs
//! only.
use axum::Json;
use axum::body::Body;
use axum::extract::{FromRequestParts, Request};
use axum::http::{HeaderMap, StatusCode, request::Parts};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tower::{Layer, Service};

use crate::allowlist::{AllowList, Decision};
use crate::claims;
use crate::config::AuthConfig;
use crate::error::{AuthError, AuthResult};
use crate::validator::TokenValidator;

/// Identity of an accepted caller, available to handlers as a request
/// extension for the duration of the request only.
#[derive(Debug, Clone)]
pub struct CallerIdentity {
    /// Extracted principal identifier; `None` when the allow-list is empty
    /// or validation is bypassed.
    pub principal_id: Option<String>,
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for CallerIdentity
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CallerIdentity>()
            .cloned()
            .ok_or_else(|| {
                error_response(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal",
                    "authorization middleware not installed",
                )
            })
    }
}

/// Enforcing-side decision pipeline: validate the token, extract the
/// principal, match the allow-list.
#[derive(Debug, Clone)]
pub struct TokenAuthorizer {
    validator: TokenValidator,
    allow_list: AllowList,
}

impl TokenAuthorizer {
    pub fn new(validator: TokenValidator, allow_list: AllowList) -> Self {
        Self {
            validator,
            allow_list,
        }
    }

    pub async fn authorize(&self, headers: &HeaderMap) -> AuthResult<CallerIdentity> {
        let token = extract_bearer(headers).ok_or(AuthError::MissingToken)?;
        let claims = self.validator.validate(token).await?;
        let principal = claims::extract_principal(&claims).map(str::to_string);
        match self.allow_list.check(principal.as_deref()) {
            Decision::Allowed => Ok(CallerIdentity {
                principal_id: principal,
            }),
            Decision::Denied(reason) => Err(AuthError::UnauthorizedPrincipal { reason }),
        }
    }
}

/// Startup-constructed authorizer, enforcing or pass-through.
#[derive(Debug, Clone)]
pub enum RequestAuthorizer {
    Enforcing(TokenAuthorizer),
    Permissive,
}

impl RequestAuthorizer {
    /// Build the authorizer the process will use for its whole lifetime.
    ///
    /// # Errors
    /// - `AuthError::Configuration` when enforcing without an expected
    ///   audience or tenant.
    /// - `AuthError::Http` when the validator's HTTP client cannot be built.
    pub fn from_config(config: &AuthConfig) -> AuthResult<Self> {
        if config.mode.is_enforcing() {
            if config.expected_audience.is_empty() || config.tenant_id.is_empty() {
                return Err(AuthError::Configuration(
                    "expected audience and tenant must be set before enforcing validation"
                        .to_string(),
                ));
            }
            let validator = TokenValidator::from_config(config)?;
            Ok(RequestAuthorizer::Enforcing(TokenAuthorizer::new(
                validator,
                config.allowed_callers.clone(),
            )))
        } else {
            tracing::warn!(
                mode = %config.mode,
                "token validation bypassed for this process; every request will be accepted"
            );
            Ok(RequestAuthorizer::Permissive)
        }
    }

    pub async fn authorize(&self, headers: &HeaderMap) -> AuthResult<CallerIdentity> {
        match self {
            RequestAuthorizer::Enforcing(authorizer) => authorizer.authorize(headers).await,
            RequestAuthorizer::Permissive => Ok(CallerIdentity { principal_id: None }),
        }
    }
}

/// Layer that applies the authorizer to every request of a router.
#[derive(Clone)]
pub struct AuthLayer {
    authorizer: Arc<RequestAuthorizer>,
}

impl AuthLayer {
    pub fn new(authorizer: RequestAuthorizer) -> Self {
        Self {
            authorizer: Arc::new(authorizer),
        }
    }
}

impl<S> Layer<S> for AuthLayer {
    type Service = AuthService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AuthService {
            inner,
            authorizer: self.authorizer.clone(),
        }
    }
}

#[derive(Clone)]
pub struct AuthService<S> {
    inner: S,
    authorizer: Arc<RequestAuthorizer>,
}

impl<S> Service<Request<Body>> for AuthService<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send,
{
    type Response = Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut request: Request<Body>) -> Self::Future {
        let authorizer = self.authorizer.clone();
        let not_ready_inner = self.inner.clone();
        let mut ready_inner = std::mem::replace(&mut self.inner, not_ready_inner);

        Box::pin(async move {
            match authorizer.authorize(request.headers()).await {
                Ok(identity) => {
                    metrics::counter!("warden_auth_decisions_total", "outcome" => "accepted")
                        .increment(1);
                    request.extensions_mut().insert(identity);
                    ready_inner.call(request).await
                }
                Err(err) => {
                    // Allow-list denials already wrote their audit event.
                    if !matches!(err, AuthError::UnauthorizedPrincipal { .. }) {
                        tracing::error!(error = %err, "bearer token rejected");
                    }
                    metrics::counter!(
                        "warden_auth_decisions_total",
                        "outcome" => "rejected",
                        "reason" => err.reject_reason()
                    )
                    .increment(1);
                    Ok(unauthorized_response())
                }
            }
        })
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: String,
    message: String,
}

fn error_response(status: StatusCode, code: &str, message: &str) -> Response {
    (
        status,
        Json(ErrorBody {
            code: code.to_string(),
            message: message.to_string(),
        }),
    )
        .into_response()
}

/// Uniform rejection: the body never distinguishes failure causes.
fn unauthorized_response() -> Response {
    error_response(
        StatusCode::UNAUTHORIZED,
        "unauthorized",
        "authentication required",
    )
}

fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(axum::http::header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn permissive_authorizer_accepts_without_header() {
        let authorizer = RequestAuthorizer::Permissive;
        let identity = authorizer
            .authorize(&HeaderMap::new())
            .await
            .expect("permissive accepts");
        assert!(identity.principal_id.is_none());
    }

    #[test]
    fn enforcing_without_audience_is_a_configuration_error() {
        let config = AuthConfig {
            expected_audience: String::new(),
            tenant_id: "tenant-1".to_string(),
            authority: "https://login.example.test".to_string(),
            allowed_callers: AllowList::default(),
            mode: warden_common::EnvironmentMode::Enforcing,
        };
        let err = RequestAuthorizer::from_config(&config).expect_err("missing audience");
        assert!(matches!(err, AuthError::Configuration(_)));
    }

    #[tokio::test]
    async fn enforcing_authorizer_requires_bearer() {
        let validator = TokenValidator::new(
            "https://login.example.test/tenant-1/v2.0".to_string(),
            "aud-1".to_string(),
            std::time::Duration::from_secs(60),
            std::time::Duration::from_secs(60),
            5,
        )
        .expect("validator");
        let authorizer = TokenAuthorizer::new(validator, AllowList::default());
        let err = authorizer
            .authorize(&HeaderMap::new())
            .await
            .expect_err("no header");
        assert!(matches!(err, AuthError::MissingToken));
    }

    #[test]
    fn bearer_extraction_requires_scheme_prefix() {
        let mut headers = HeaderMap::new();
        headers.insert(
            axum::http::header::AUTHORIZATION,
            "Bearer abc.def.ghi".parse().expect("header"),
        );
        assert_eq!(extract_bearer(&headers), Some("abc.def.ghi"));

        let mut headers = HeaderMap::new();
        headers.insert(
            axum::http::header::AUTHORIZATION,
            "Basic abc".parse().expect("header"),
        );
        assert_eq!(extract_bearer(&headers), None);
    }

    #[tokio::test]
    async fn unauthorized_response_is_generic() {
        let response = unauthorized_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        let body: serde_json::Value = serde_json::from_slice(&bytes).expect("json");
        assert_eq!(body["code"], "unauthorized");
        assert_eq!(body["message"], "authentication required");
    }
}
