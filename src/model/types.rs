//! Shared domain types for queries, results, and session bootstrap data.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Searchable domain of the content index.
///
/// `DirectLookup` is resolved entirely on the client from the pre-loaded
/// admin-menu snapshot and never appears in a wire request.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DomainId {
    #[serde(rename = "documents")]
    Documents,
    #[serde(rename = "accounts")]
    Accounts,
    #[serde(rename = "admin")]
    AdminActions,
    #[serde(rename = "direct")]
    DirectLookup,
}

impl DomainId {
    /// Key used for the `groups` mapping on the wire.
    pub fn wire_key(self) -> &'static str {
        match self {
            DomainId::Documents => "documents",
            DomainId::Accounts => "accounts",
            DomainId::AdminActions => "admin",
            DomainId::DirectLookup => "direct",
        }
    }

    /// Minimum term length before a query is attempted.
    pub fn min_term_len(self) -> usize {
        match self {
            DomainId::DirectLookup => 1,
            _ => 2,
        }
    }
}

impl std::fmt::Display for DomainId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.wire_key())
    }
}

/// Publication state of a document.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Status {
    Published,
    Draft,
    PendingReview,
    Private,
    Scheduled,
}

impl Status {
    /// Storage representation.
    pub fn as_db_str(self) -> &'static str {
        match self {
            Status::Published => "publish",
            Status::Draft => "draft",
            Status::PendingReview => "pending",
            Status::Private => "private",
            Status::Scheduled => "future",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        match s {
            "publish" => Some(Status::Published),
            "draft" => Some(Status::Draft),
            "pending" => Some(Status::PendingReview),
            "private" => Some(Status::Private),
            "future" => Some(Status::Scheduled),
            _ => None,
        }
    }

    /// Human label shown on result badges.
    pub fn label(self) -> &'static str {
        match self {
            Status::Published => "Published",
            Status::Draft => "Draft",
            Status::PendingReview => "Pending",
            Status::Private => "Private",
            Status::Scheduled => "Scheduled",
        }
    }
}

/// One entry in a ranked result group.
///
/// Identity is `(domain, id)`; `id` is domain-scoped and opaque (an integer
/// rendered as a string for documents/accounts, a slug for admin actions).
/// Collaborator field fallbacks are normalized into this single shape at the
/// boundary; nothing downstream branches on which source field was present.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResultItem {
    pub domain: DomainId,
    pub id: String,
    pub title: String,
    /// Category or role badge ("Article", "Page", "Editor", ...).
    pub kind_label: Option<String>,
    pub status_label: Option<String>,
    pub edit_locator: String,
    pub view_locator: Option<String>,
    /// Unix seconds.
    pub modified_at: Option<i64>,
    pub created_at: Option<i64>,
    pub author_label: Option<String>,
}

/// An ordered sequence of results for one domain: match tier ascending, then
/// title ascending (case-insensitive, ordinal).
pub type RankedGroup = Vec<ResultItem>;

/// Echo of the query a response answers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResponseMeta {
    pub query: String,
    pub domain: DomainId,
    pub context: String,
}

/// Grouped, ranked search results. Only non-empty groups are present;
/// `total_count` always equals the sum of group lengths.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchResponse {
    pub groups: BTreeMap<String, RankedGroup>,
    pub total_count: usize,
    pub meta: ResponseMeta,
}

impl SearchResponse {
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

/// One entry of the admin-menu snapshot: a navigable admin page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MenuPage {
    pub title: String,
    pub location: String,
    pub parent: Option<String>,
}

/// A favorites or history entry shown in the idle/browse state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PanelEntry {
    pub kind: String,
    pub id: String,
    pub title: String,
    pub locator: String,
    pub visited_at: Option<i64>,
}

/// Data fetched once at session start: the admin-menu snapshot consumed by
/// direct lookup, plus the read-only favorites/history panels.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SessionBootstrap {
    pub pages: Vec<MenuPage>,
    pub favorites: Vec<PanelEntry>,
    pub recents: Vec<PanelEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_wire_keys_round_trip() {
        for d in [
            DomainId::Documents,
            DomainId::Accounts,
            DomainId::AdminActions,
            DomainId::DirectLookup,
        ] {
            let json = serde_json::to_string(&d).unwrap();
            assert_eq!(json, format!("\"{}\"", d.wire_key()));
            let back: DomainId = serde_json::from_str(&json).unwrap();
            assert_eq!(back, d);
        }
    }

    #[test]
    fn status_db_strings_round_trip() {
        for s in [
            Status::Published,
            Status::Draft,
            Status::PendingReview,
            Status::Private,
            Status::Scheduled,
        ] {
            assert_eq!(Status::from_db_str(s.as_db_str()), Some(s));
        }
        assert_eq!(Status::from_db_str("trash"), None);
    }

    #[test]
    fn min_term_len_per_domain() {
        assert_eq!(DomainId::Documents.min_term_len(), 2);
        assert_eq!(DomainId::Accounts.min_term_len(), 2);
        assert_eq!(DomainId::AdminActions.min_term_len(), 2);
        assert_eq!(DomainId::DirectLookup.min_term_len(), 1);
    }
}
