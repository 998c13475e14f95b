// Shared types used by both sides of the warden auth layer.

use std::fmt;

/// Name of the deployment-environment signal set by the hosting platform.
pub const DEPLOYMENT_ENVIRONMENT_VAR: &str = "DEPLOYMENT_ENVIRONMENT";

/// Process-wide validation mode, fixed at startup.
///
/// Derived from the deployment-environment signal, never from a
/// warden-specific flag: `production` enforces, `development`/`dev`/`local`
/// bypasses, and a missing or unrecognized signal fails closed to enforcing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvironmentMode {
    Enforcing,
    Permissive,
}

impl EnvironmentMode {
    pub fn from_deployment_env() -> Self {
        let value = std::env::var(DEPLOYMENT_ENVIRONMENT_VAR).ok();
        Self::from_signal(value.as_deref())
    }

    pub fn from_signal(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
            Some("production") => EnvironmentMode::Enforcing,
            Some("development" | "dev" | "local") => EnvironmentMode::Permissive,
            Some(other) => {
                tracing::warn!(
                    signal = other,
                    "unrecognized deployment environment; enforcing token validation"
                );
                EnvironmentMode::Enforcing
            }
            None => {
                tracing::warn!(
                    "deployment environment signal missing; enforcing token validation"
                );
                EnvironmentMode::Enforcing
            }
        }
    }

    pub fn is_enforcing(self) -> bool {
        matches!(self, EnvironmentMode::Enforcing)
    }
}

impl fmt::Display for EnvironmentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnvironmentMode::Enforcing => f.write_str("enforcing"),
            EnvironmentMode::Permissive => f.write_str("permissive"),
        }
    }
}
