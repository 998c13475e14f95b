//! Caller allow-list matching and audit logging.
//!
//! # Purpose
//! Decides whether an extracted principal identifier may call this service
//! and emits a structured audit event for every decision. Entries are
//! security-principal object identifiers, not application identifiers.
use std::fmt;

/// Why a caller was denied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    NoIdentifierPresent,
    IdentifierNotInList,
}

impl DenyReason {
    pub fn as_str(self) -> &'static str {
        match self {
            DenyReason::NoIdentifierPresent => "no-identifier-present",
            DenyReason::IdentifierNotInList => "identifier-not-in-list",
        }
    }
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of an allow-list check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allowed,
    Denied(DenyReason),
}

/// Immutable set of permitted caller principal identifiers.
///
/// Parsed once at startup and shared read-only across requests. An empty
/// list allows every caller; see `check` for how that is logged.
#[derive(Debug, Clone, Default)]
pub struct AllowList {
    entries: Vec<String>,
}

impl AllowList {
    pub fn new(entries: Vec<String>) -> Self {
        Self { entries }
    }

    /// Parse a comma-separated list, trimming entries and dropping empties.
    pub fn from_csv(raw: &str) -> Self {
        let entries = raw
            .split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(str::to_string)
            .collect();
        Self { entries }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    /// Decide whether the extracted principal may call this service.
    ///
    /// An empty list means the allow-list was never configured and every
    /// caller is allowed, including one with no identifier. A non-empty
    /// list requires an exact, case-sensitive match (identifiers are
    /// canonical lowercase GUIDs). The audit event is emitted only after
    /// the decision is final.
    pub fn check(&self, principal: Option<&str>) -> Decision {
        if self.entries.is_empty() {
            tracing::debug!(
                principal = principal.unwrap_or("(null)"),
                "allow-list empty; caller allowed without identity check"
            );
            return Decision::Allowed;
        }

        let decision = match principal {
            None => Decision::Denied(DenyReason::NoIdentifierPresent),
            Some(id) if self.entries.iter().any(|entry| entry == id) => Decision::Allowed,
            Some(_) => Decision::Denied(DenyReason::IdentifierNotInList),
        };

        match decision {
            Decision::Allowed => {
                tracing::info!(principal = principal.unwrap_or("(null)"), "caller authorized");
            }
            Decision::Denied(reason) => {
                tracing::warn!(
                    principal = principal.unwrap_or("(null)"),
                    allowed = ?self.entries,
                    reason = reason.as_str(),
                    "caller rejected"
                );
            }
        }
        decision
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_list_allows_anyone() {
        let list = AllowList::default();
        assert_eq!(list.check(Some("any-caller")), Decision::Allowed);
        assert_eq!(list.check(None), Decision::Allowed);
    }

    #[test]
    fn listed_identifier_is_allowed() {
        let list = AllowList::new(vec!["id-a".to_string(), "id-b".to_string()]);
        assert_eq!(list.check(Some("id-a")), Decision::Allowed);
        assert_eq!(list.check(Some("id-b")), Decision::Allowed);
    }

    #[test]
    fn unlisted_identifier_is_denied() {
        let list = AllowList::new(vec!["id-a".to_string(), "id-b".to_string()]);
        assert_eq!(
            list.check(Some("id-c")),
            Decision::Denied(DenyReason::IdentifierNotInList)
        );
    }

    #[test]
    fn missing_identifier_is_denied_when_list_configured() {
        let list = AllowList::new(vec!["id-a".to_string()]);
        assert_eq!(
            list.check(None),
            Decision::Denied(DenyReason::NoIdentifierPresent)
        );
    }

    #[test]
    fn matching_is_case_sensitive() {
        let list = AllowList::new(vec!["5e9ccc1b-12c0-460f-be42-585ac084ba52".to_string()]);
        assert_eq!(
            list.check(Some("5E9CCC1B-12C0-460F-BE42-585AC084BA52")),
            Decision::Denied(DenyReason::IdentifierNotInList)
        );
    }

    #[test]
    fn csv_parsing_trims_and_drops_empty_entries() {
        let list = AllowList::from_csv(" id-a , ,id-b,, id-c ");
        assert_eq!(list.entries(), ["id-a", "id-b", "id-c"]);
    }

    #[test]
    fn csv_parsing_of_blank_input_yields_empty_list() {
        assert!(AllowList::from_csv("").is_empty());
        assert!(AllowList::from_csv(" , ,").is_empty());
    }

    #[test]
    fn deny_reasons_render_stable_strings() {
        assert_eq!(DenyReason::NoIdentifierPresent.as_str(), "no-identifier-present");
        assert_eq!(DenyReason::IdentifierNotInList.as_str(), "identifier-not-in-list");
    }
}
