//! Outbound credential configuration.
//!
//! # Purpose
//! Loads the target scope, the optional workload-identity selector, and the
//! identity agent endpoint. In an enforcing environment a missing scope is
//! a startup error; outbound calls must never silently go unauthenticated.
use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::fs;
use warden_common::EnvironmentMode;

use crate::source::DEFAULT_IDENTITY_ENDPOINT;

#[derive(Debug, Clone)]
pub struct CredentialConfig {
    /// Scope string of the target peer (the audience it expects).
    pub target_scope: String,
    /// Workload-identity selector when several identities are assigned.
    pub client_id: Option<String>,
    /// Local identity agent endpoint.
    pub identity_endpoint: String,
    pub mode: EnvironmentMode,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
struct CredentialConfigOverride {
    target_scope: Option<String>,
    client_id: Option<String>,
    identity_endpoint: Option<String>,
}

impl CredentialConfig {
    pub fn from_env() -> Result<Self> {
        let config = Self::from_env_unchecked();
        config.validate()?;
        Ok(config)
    }

    /// Load from the environment, then apply the YAML override file named
    /// by `WARDEN_CREDENTIAL_CONFIG` when present.
    pub fn from_env_or_yaml() -> Result<Self> {
        let mut config = Self::from_env_unchecked();
        if let Ok(path) = std::env::var("WARDEN_CREDENTIAL_CONFIG") {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("read WARDEN_CREDENTIAL_CONFIG: {path}"))?;
            let override_cfg: CredentialConfigOverride =
                serde_yaml::from_str(&contents).with_context(|| "parse credential config yaml")?;
            if let Some(value) = override_cfg.target_scope {
                config.target_scope = value;
            }
            if let Some(value) = override_cfg.client_id {
                config.client_id = Some(value);
            }
            if let Some(value) = override_cfg.identity_endpoint {
                config.identity_endpoint = value;
            }
        }
        config.validate()?;
        Ok(config)
    }

    fn from_env_unchecked() -> Self {
        Self {
            target_scope: std::env::var("WARDEN_TARGET_SCOPE").unwrap_or_default(),
            client_id: std::env::var("WARDEN_CLIENT_ID").ok().filter(|v| !v.is_empty()),
            identity_endpoint: std::env::var("WARDEN_IDENTITY_ENDPOINT")
                .unwrap_or_else(|_| DEFAULT_IDENTITY_ENDPOINT.to_string()),
            mode: EnvironmentMode::from_deployment_env(),
        }
    }

    fn validate(&self) -> Result<()> {
        if self.mode.is_enforcing() && self.target_scope.is_empty() {
            bail!("WARDEN_TARGET_SCOPE is required when running against a protected peer");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    struct EnvGuard {
        key: &'static str,
        prev: Option<String>,
    }

    impl EnvGuard {
        fn set(key: &'static str, value: &str) -> Self {
            let prev = std::env::var(key).ok();
            unsafe {
                std::env::set_var(key, value);
            }
            Self { key, prev }
        }

        fn unset(key: &'static str) -> Self {
            let prev = std::env::var(key).ok();
            unsafe {
                std::env::remove_var(key);
            }
            Self { key, prev }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            match &self.prev {
                Some(value) => unsafe {
                    std::env::set_var(self.key, value);
                },
                None => unsafe {
                    std::env::remove_var(self.key);
                },
            }
        }
    }

    #[test]
    #[serial]
    fn enforcing_requires_target_scope() {
        let _env = EnvGuard::set("DEPLOYMENT_ENVIRONMENT", "production");
        let _scope = EnvGuard::unset("WARDEN_TARGET_SCOPE");

        let err = CredentialConfig::from_env().expect_err("missing scope");
        assert!(err.to_string().contains("WARDEN_TARGET_SCOPE"));
    }

    #[test]
    #[serial]
    fn permissive_mode_tolerates_missing_scope() {
        let _env = EnvGuard::set("DEPLOYMENT_ENVIRONMENT", "development");
        let _scope = EnvGuard::unset("WARDEN_TARGET_SCOPE");

        let config = CredentialConfig::from_env().expect("config");
        assert!(config.target_scope.is_empty());
    }

    #[test]
    #[serial]
    fn endpoint_defaults_to_local_agent() {
        let _env = EnvGuard::set("DEPLOYMENT_ENVIRONMENT", "production");
        let _scope = EnvGuard::set("WARDEN_TARGET_SCOPE", "scope-a");
        let _endpoint = EnvGuard::unset("WARDEN_IDENTITY_ENDPOINT");
        let _client = EnvGuard::unset("WARDEN_CLIENT_ID");

        let config = CredentialConfig::from_env().expect("config");
        assert_eq!(config.identity_endpoint, DEFAULT_IDENTITY_ENDPOINT);
        assert!(config.client_id.is_none());
    }

    #[test]
    #[serial]
    fn blank_client_id_is_treated_as_absent() {
        let _env = EnvGuard::set("DEPLOYMENT_ENVIRONMENT", "production");
        let _scope = EnvGuard::set("WARDEN_TARGET_SCOPE", "scope-a");
        let _client = EnvGuard::set("WARDEN_CLIENT_ID", "");

        let config = CredentialConfig::from_env().expect("config");
        assert!(config.client_id.is_none());
    }
}
