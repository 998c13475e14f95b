//! Inbound validation configuration.
//!
//! # Purpose
//! Loads the expected audience, tenant, and caller allow-list from the
//! environment (with an optional YAML override file) and validates them at
//! startup. A misconfigured enforcing deployment must fail before serving
//! traffic, never degrade per-request.
use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::fs;
use warden_common::EnvironmentMode;

use crate::allowlist::AllowList;

/// Default token authority; override for sovereign clouds or tests.
pub const DEFAULT_AUTHORITY: &str = "https://login.microsoftonline.com";

/// Suffix appended to `{authority}/{tenant}` to form the expected issuer.
/// Only this issuer format is supported; legacy-format issuers fail
/// validation.
pub const ISSUER_VERSION_SUFFIX: &str = "v2.0";

#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Expected audience claim: the bare application identifier. A
    /// URI-prefixed value (`api://<id>`) will never match tokens whose
    /// audience is the bare id; configure the bare id and nothing else.
    pub expected_audience: String,
    /// Tenant identifier used to construct the expected issuer.
    pub tenant_id: String,
    /// Authority base URL the issuer is constructed from.
    pub authority: String,
    /// Permitted caller principal identifiers.
    pub allowed_callers: AllowList,
    pub mode: EnvironmentMode,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
struct AuthConfigOverride {
    expected_audience: Option<String>,
    tenant_id: Option<String>,
    authority: Option<String>,
    allowed_callers: Option<Vec<String>>,
}

impl AuthConfig {
    pub fn from_env() -> Result<Self> {
        let config = Self::from_env_unchecked();
        config.validate()?;
        Ok(config)
    }

    /// Load from the environment, then apply the YAML override file named
    /// by `WARDEN_AUTH_CONFIG` when present. The mode is never overridable
    /// from a file; it comes from the deployment-environment signal only.
    pub fn from_env_or_yaml() -> Result<Self> {
        let mut config = Self::from_env_unchecked();
        if let Ok(path) = std::env::var("WARDEN_AUTH_CONFIG") {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("read WARDEN_AUTH_CONFIG: {path}"))?;
            let override_cfg: AuthConfigOverride =
                serde_yaml::from_str(&contents).with_context(|| "parse auth config yaml")?;
            if let Some(value) = override_cfg.expected_audience {
                config.expected_audience = value;
            }
            if let Some(value) = override_cfg.tenant_id {
                config.tenant_id = value;
            }
            if let Some(value) = override_cfg.authority {
                config.authority = value;
            }
            if let Some(value) = override_cfg.allowed_callers {
                config.allowed_callers = AllowList::new(value);
            }
        }
        config.validate()?;
        Ok(config)
    }

    fn from_env_unchecked() -> Self {
        Self {
            expected_audience: std::env::var("WARDEN_EXPECTED_AUDIENCE").unwrap_or_default(),
            tenant_id: std::env::var("WARDEN_TENANT_ID").unwrap_or_default(),
            authority: std::env::var("WARDEN_AUTHORITY")
                .unwrap_or_else(|_| DEFAULT_AUTHORITY.to_string()),
            allowed_callers: AllowList::from_csv(
                &std::env::var("WARDEN_ALLOWED_CALLERS").unwrap_or_default(),
            ),
            mode: EnvironmentMode::from_deployment_env(),
        }
    }

    fn validate(&self) -> Result<()> {
        if !self.mode.is_enforcing() {
            return Ok(());
        }
        if self.expected_audience.is_empty() {
            bail!("WARDEN_EXPECTED_AUDIENCE is required when token validation is enforcing");
        }
        if self.tenant_id.is_empty() {
            bail!("WARDEN_TENANT_ID is required when token validation is enforcing");
        }
        if self.allowed_callers.is_empty() {
            tracing::warn!(
                "caller allow-list is empty; every authenticated caller will be accepted"
            );
        }
        Ok(())
    }

    /// Expected issuer, constructed as `{authority}/{tenant}/v2.0`.
    pub fn expected_issuer(&self) -> String {
        format!(
            "{}/{}/{}",
            self.authority.trim_end_matches('/'),
            self.tenant_id,
            ISSUER_VERSION_SUFFIX
        )
    }
}
