//! Per-request credential attachment for outbound calls.
//!
//! # Purpose
//! Wraps an HTTP client so that every request to the protected peer first
//! acquires a token for the configured scope and carries it as
//! `Authorization: Bearer`. Acquisition failure fails the call before
//! anything is sent; there is no unauthenticated fallback and no retry in
//! this layer.
use std::sync::Arc;
use std::time::Duration;

use crate::config::CredentialConfig;
use crate::error::{CredentialError, CredentialResult};
use crate::source::{IdentityAgentSource, TokenSource};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP client that authenticates every request to one protected peer.
#[derive(Clone)]
pub struct AuthenticatedClient {
    http: reqwest::Client,
    source: Arc<dyn TokenSource>,
    scope: String,
}

impl std::fmt::Debug for AuthenticatedClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthenticatedClient")
            .field("scope", &self.scope)
            .finish_non_exhaustive()
    }
}

impl AuthenticatedClient {
    pub fn new(source: Arc<dyn TokenSource>, scope: String) -> CredentialResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            source,
            scope,
        })
    }

    /// Build a client backed by the local identity agent.
    ///
    /// # Errors
    /// - `CredentialError::Configuration` when the target scope is missing;
    ///   a caller in an enforcing environment must not start without one.
    pub fn from_config(config: &CredentialConfig) -> CredentialResult<Self> {
        if config.target_scope.is_empty() {
            return Err(CredentialError::Configuration(
                "target scope is not configured".to_string(),
            ));
        }
        let source = IdentityAgentSource::new(
            config.identity_endpoint.clone(),
            config.client_id.clone(),
        )?;
        Self::new(Arc::new(source), config.target_scope.clone())
    }

    pub async fn get(&self, url: &str) -> CredentialResult<reqwest::Response> {
        self.send(self.http.get(url)).await
    }

    pub async fn post(&self, url: &str) -> CredentialResult<reqwest::Response> {
        self.send(self.http.post(url)).await
    }

    /// Acquire a token and send the request with it attached.
    ///
    /// Acquisition happens for every call; caching and refresh belong to
    /// the identity agent. When acquisition fails the request is never
    /// sent.
    pub async fn send(
        &self,
        request: reqwest::RequestBuilder,
    ) -> CredentialResult<reqwest::Response> {
        let token = match self.source.token(&self.scope).await {
            Ok(token) => {
                metrics::counter!("warden_credential_acquisitions_total", "outcome" => "ok")
                    .increment(1);
                token
            }
            Err(err) => {
                metrics::counter!("warden_credential_acquisitions_total", "outcome" => "error")
                    .increment(1);
                tracing::error!(error = %err, scope = %self.scope, "token acquisition failed");
                return Err(err);
            }
        };
        let response = request.bearer_auth(token.secret).send().await?;
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_config_rejects_missing_scope() {
        let config = CredentialConfig {
            target_scope: String::new(),
            client_id: None,
            identity_endpoint: "http://127.0.0.1:1/token".to_string(),
            mode: warden_common::EnvironmentMode::Enforcing,
        };
        let err = AuthenticatedClient::from_config(&config).expect_err("missing scope");
        assert!(matches!(err, CredentialError::Configuration(_)));
    }
}
