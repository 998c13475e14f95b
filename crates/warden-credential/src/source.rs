//! Token acquisition from the local identity agent.
//!
//! # Purpose
//! Requests a bearer token scoped to the target peer from the workload
//! identity agent running next to the process. The agent owns caching and
//! refresh-before-expiry; this module never caches and asks again for every
//! outgoing call.
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use crate::error::{CredentialError, CredentialResult};

/// Default local identity agent endpoint (instance metadata service).
pub const DEFAULT_IDENTITY_ENDPOINT: &str =
    "http://169.254.169.254/metadata/identity/oauth2/token";

const AGENT_API_VERSION: &str = "2018-02-01";
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(10);

/// An acquired bearer token for one target scope.
///
/// Opaque to this crate beyond the secret itself; held only for the single
/// request being prepared.
#[derive(Debug, Clone)]
pub struct AccessToken {
    pub secret: String,
    pub expires_in: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct AgentTokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

/// Source of bearer tokens for outbound calls.
#[async_trait]
pub trait TokenSource: Send + Sync {
    /// Acquire a token for the given scope.
    ///
    /// # Errors
    /// - `CredentialError::Acquisition` when the agent rejects the scope or
    ///   returns an unusable response.
    /// - `CredentialError::Http` when the agent is unreachable.
    async fn token(&self, scope: &str) -> CredentialResult<AccessToken>;
}

/// Identity-agent-backed token source.
///
/// Issues an IMDS-style GET per acquisition: `resource` carries the scope
/// and `client_id`, when configured, selects one of several identities
/// assigned to the host.
pub struct IdentityAgentSource {
    client: reqwest::Client,
    endpoint: String,
    client_id: Option<String>,
}

impl IdentityAgentSource {
    pub fn new(endpoint: String, client_id: Option<String>) -> CredentialResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(ACQUIRE_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            endpoint,
            client_id,
        })
    }
}

#[async_trait]
impl TokenSource for IdentityAgentSource {
    async fn token(&self, scope: &str) -> CredentialResult<AccessToken> {
        let mut request = self
            .client
            .get(&self.endpoint)
            .header("Metadata", "true")
            .query(&[("api-version", AGENT_API_VERSION), ("resource", scope)]);
        if let Some(client_id) = &self.client_id {
            request = request.query(&[("client_id", client_id.as_str())]);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            let status = response.status();
            tracing::error!(%status, scope, "identity agent refused token request");
            return Err(CredentialError::Acquisition(format!(
                "identity agent returned {status}"
            )));
        }

        let body: AgentTokenResponse = response
            .json()
            .await
            .map_err(|err| CredentialError::Acquisition(format!("invalid agent response: {err}")))?;
        if body.access_token.is_empty() {
            return Err(CredentialError::Acquisition(
                "identity agent returned an empty token".to_string(),
            ));
        }
        Ok(AccessToken {
            secret: body.access_token,
            expires_in: body.expires_in,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unreachable_agent_surfaces_http_error() {
        let source = IdentityAgentSource::new("http://127.0.0.1:1/token".to_string(), None)
            .expect("source");
        let err = source.token("scope-a").await.expect_err("unreachable");
        assert!(matches!(err, CredentialError::Http(_)));
    }
}
