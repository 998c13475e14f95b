//! Bearer-token validation with cached discovery and JWKS fetching.
//!
//! # Purpose
//! Verifies inbound IdP bearer tokens against the single configured issuer
//! and audience: signature via the issuer's published JWKS, then issuer,
//! audience, and lifetime claims.
//!
//! # Key invariants
//! - Only RS256 is accepted; the algorithm is pinned before any network work.
//! - The expected issuer is constructed from the configured tenant and the
//!   fixed `/v2.0` suffix; no other issuer format is accepted.
//! - The audience must equal the configured bare application identifier.
//!   Tokens carrying the `api://`-prefixed form fail validation; that
//!   mismatch is a configuration bug on one side, never auto-corrected here.
//! - JWKS and discovery caches are time-bounded and refreshed on demand; a
//!   fetch failure rejects the request rather than letting it through.
//!
//! # Concurrency model
//! Caches live in `DashMap` for concurrent access across request tasks
//! without a global lock. The validator is cheap to clone and share.
use dashmap::DashMap;
use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode, decode_header};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::AuthConfig;
use crate::error::{AuthError, AuthResult};

const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
struct CachedJwks {
    jwks: JwkSet,
    expires_at: Instant,
}

#[derive(Debug, Clone)]
struct CachedDiscovery {
    jwks_url: String,
    expires_at: Instant,
}

#[derive(Debug, Deserialize)]
struct DiscoveryDocument {
    jwks_uri: String,
}

/// Validator for inbound bearer tokens with cached discovery/JWKS.
#[derive(Debug, Clone)]
pub struct TokenValidator {
    client: reqwest::Client,
    jwks_cache: Arc<DashMap<String, CachedJwks>>,
    discovery_cache: Arc<DashMap<String, CachedDiscovery>>,
    jwks_ttl: Duration,
    discovery_ttl: Duration,
    leeway_seconds: u64,
    expected_issuer: String,
    expected_audience: String,
}

impl TokenValidator {
    pub fn from_config(config: &AuthConfig) -> AuthResult<Self> {
        Self::new(
            config.expected_issuer(),
            config.expected_audience.clone(),
            Duration::from_secs(3600),
            Duration::from_secs(3600),
            60,
        )
    }

    pub fn new(
        expected_issuer: String,
        expected_audience: String,
        jwks_ttl: Duration,
        discovery_ttl: Duration,
        leeway_seconds: u64,
    ) -> AuthResult<Self> {
        let client = reqwest::Client::builder().timeout(HTTP_TIMEOUT).build()?;
        Ok(Self {
            client,
            jwks_cache: Arc::new(DashMap::new()),
            discovery_cache: Arc::new(DashMap::new()),
            jwks_ttl,
            discovery_ttl,
            leeway_seconds,
            expected_issuer,
            expected_audience,
        })
    }

    /// Validate a bearer token and return its claims.
    ///
    /// # Errors
    /// - `AuthError::UnsupportedAlgorithm` for anything but RS256.
    /// - `AuthError::MissingKeyId` when the header lacks a `kid`.
    /// - `AuthError::SigningKeyNotFound` when the key is absent even after
    ///   a refresh.
    /// - `AuthError::Http` when discovery or JWKS cannot be fetched.
    /// - `AuthError::Jwt` for signature, issuer, audience, or lifetime
    ///   failures.
    pub async fn validate(&self, token: &str) -> AuthResult<Value> {
        // Step 1: Check the header algorithm before any heavy work.
        let header = decode_header(token)?;
        if !matches!(header.alg, Algorithm::RS256) {
            return Err(AuthError::UnsupportedAlgorithm);
        }
        let kid = header.kid.as_deref().ok_or(AuthError::MissingKeyId)?;

        // Step 2: Resolve and fetch JWKS, retrying once on a miss.
        // The retry handles key rotation between cache refreshes.
        let jwks_url = self.resolve_jwks_url().await?;
        let jwks = self.get_jwks(&jwks_url).await?;
        let decoding_key = match find_jwk(&jwks, kid) {
            Some(key) => DecodingKey::from_jwk(key)?,
            None => {
                let refreshed = self.refresh_jwks(&jwks_url).await?;
                let key = find_jwk(&refreshed, kid).ok_or(AuthError::SigningKeyNotFound)?;
                DecodingKey::from_jwk(key)?
            }
        };

        // Step 3: Pin issuer and audience, then verify signature and claims.
        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_issuer(&[self.expected_issuer.as_str()]);
        validation.set_audience(&[self.expected_audience.as_str()]);
        validation
            .required_spec_claims
            .extend(["iss".to_string(), "aud".to_string(), "nbf".to_string()]);
        validation.validate_nbf = true;
        validation.leeway = self.leeway_seconds;

        let token = decode::<Value>(token, &decoding_key, &validation)?;
        Ok(token.claims)
    }

    async fn resolve_jwks_url(&self) -> AuthResult<String> {
        let discovery_url = format!(
            "{}/.well-known/openid-configuration",
            self.expected_issuer.trim_end_matches('/')
        );

        if let Some(entry) = self.discovery_cache.get(&discovery_url)
            && entry.expires_at > Instant::now()
        {
            return Ok(entry.jwks_url.clone());
        }

        let doc: DiscoveryDocument = self
            .client
            .get(&discovery_url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        self.discovery_cache.insert(
            discovery_url,
            CachedDiscovery {
                jwks_url: doc.jwks_uri.clone(),
                expires_at: Instant::now() + self.discovery_ttl,
            },
        );
        Ok(doc.jwks_uri)
    }

    async fn get_jwks(&self, jwks_url: &str) -> AuthResult<JwkSet> {
        if let Some(entry) = self.jwks_cache.get(jwks_url)
            && entry.expires_at > Instant::now()
        {
            return Ok(entry.jwks.clone());
        }
        self.refresh_jwks(jwks_url).await
    }

    async fn refresh_jwks(&self, jwks_url: &str) -> AuthResult<JwkSet> {
        let jwks: JwkSet = self
            .client
            .get(jwks_url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        self.jwks_cache.insert(
            jwks_url.to_string(),
            CachedJwks {
                jwks: jwks.clone(),
                expires_at: Instant::now() + self.jwks_ttl,
            },
        );
        Ok(jwks)
    }
}

fn find_jwk<'a>(jwks: &'a JwkSet, kid: &str) -> Option<&'a jsonwebtoken::jwk::Jwk> {
    jwks.keys
        .iter()
        .find(|key| key.common.key_id.as_deref() == Some(kid))
}
