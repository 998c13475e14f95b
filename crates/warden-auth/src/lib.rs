//! Inbound service-to-service authorization for warden-protected services.
//!
//! # Purpose
//! Validates IdP-issued bearer tokens on every protected request and
//! enforces a caller allow-list keyed by security-principal identifier.
//!
//! # How it fits
//! A callee wires `AuthLayer` into its router at startup; the caller side
//! attaches tokens with `warden-credential`. Handlers behind the layer only
//! ever see accepted requests and can read the caller via `CallerIdentity`.
//!
//! # Key invariants
//! - Tokens are RS256 and must verify against the issuer's published JWKS.
//! - The expected issuer is `{authority}/{tenant}/v2.0`; the audience is the
//!   bare application identifier, never a URI-prefixed form.
//! - Rejections are uniform 401s; internals stay in server-side logs.
//! - In permissive deployments (development signal) the validator is never
//!   installed; the pass-through authorizer accepts everything.
//!
//! # Important configuration
//! `WARDEN_EXPECTED_AUDIENCE`, `WARDEN_TENANT_ID`, `WARDEN_ALLOWED_CALLERS`,
//! `WARDEN_AUTHORITY`, and the platform-set `DEPLOYMENT_ENVIRONMENT`.
//!
//! # Common pitfalls
//! - Configuring the audience as `api://<id>` while tokens carry the bare
//!   id (or vice versa) rejects every caller with `invalid-token`.
//! - An empty allow-list admits every authenticated caller; it is logged
//!   loudly at startup but not an error.

mod allowlist;
pub mod claims;
mod config;
mod error;
mod middleware;
mod validator;

pub use allowlist::{AllowList, Decision, DenyReason};
pub use config::{AuthConfig, DEFAULT_AUTHORITY, ISSUER_VERSION_SUFFIX};
pub use error::{AuthError, AuthResult};
pub use middleware::{AuthLayer, AuthService, CallerIdentity, RequestAuthorizer, TokenAuthorizer};
pub use validator::TokenValidator;
