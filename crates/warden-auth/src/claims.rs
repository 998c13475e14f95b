//! Principal-identifier extraction from validated token claims.
//!
//! # Purpose
//! Different issuance paths populate different claim names for the caller's
//! security-principal identifier: workload-identity tokens carry the
//! fully-qualified legacy claim-type URIs, interactive tokens the short
//! `oid`, and some only `sub`. Extraction walks a fixed priority list and
//! takes the first non-empty match.
use serde_json::Value;

/// Full-URI object-identifier claim emitted on workload-identity tokens.
pub const OBJECT_ID_CLAIM: &str =
    "http://schemas.microsoft.com/identity/claims/objectidentifier";

/// Full-URI legacy name-identifier claim.
pub const NAME_ID_CLAIM: &str =
    "http://schemas.xmlsoap.org/ws/2005/05/identity/claims/nameidentifier";

/// Short-form object-identifier claim.
pub const SHORT_OBJECT_ID_CLAIM: &str = "oid";

/// Generic subject claim, the last resort.
pub const SUBJECT_CLAIM: &str = "sub";

/// Claim names consulted in order; the first non-empty value wins.
pub const PRINCIPAL_CLAIM_PRIORITY: [&str; 4] = [
    OBJECT_ID_CLAIM,
    NAME_ID_CLAIM,
    SHORT_OBJECT_ID_CLAIM,
    SUBJECT_CLAIM,
];

/// Extract the caller's principal identifier from validated claims.
///
/// An empty-string value counts as absent and the search continues with the
/// next variant. Returns `None` when no variant carries a value; whether
/// that is a rejection is the allow-list's call, not this function's.
pub fn extract_principal(claims: &Value) -> Option<&str> {
    PRINCIPAL_CLAIM_PRIORITY
        .iter()
        .filter_map(|name| string_claim(claims, name))
        .next()
}

fn string_claim<'a>(claims: &'a Value, name: &str) -> Option<&'a str> {
    // Only accept non-empty string-valued claims; other types are ignored.
    claims
        .get(name)
        .and_then(|value| value.as_str())
        .filter(|value| !value.is_empty())
}
