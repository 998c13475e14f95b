//! Outbound credential attachment for callers of warden-protected peers.
//!
//! # Purpose
//! Acquires bearer tokens from the local workload identity agent and
//! attaches them to every outgoing request destined for a protected peer.
//!
//! # How it fits
//! The callee validates these tokens with `warden-auth`. This crate is the
//! caller half: it never caches tokens (the agent does), never retries, and
//! never sends a request it could not authenticate.
//!
//! # Important configuration
//! `WARDEN_TARGET_SCOPE`, `WARDEN_CLIENT_ID` (optional selector),
//! `WARDEN_IDENTITY_ENDPOINT`, and the platform-set
//! `DEPLOYMENT_ENVIRONMENT`.
//!
//! # Common pitfalls
//! - A missing scope in an enforcing environment is a startup error, not a
//!   per-request one; catch it before serving traffic.
//! - The agent endpoint is only reachable where a workload identity is
//!   actually assigned; locally, point it at a stub.

mod attach;
mod config;
mod error;
mod source;

pub use attach::AuthenticatedClient;
pub use config::CredentialConfig;
pub use error::{CredentialError, CredentialResult};
pub use source::{AccessToken, DEFAULT_IDENTITY_ENDPOINT, IdentityAgentSource, TokenSource};
