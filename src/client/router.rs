//! Query routing: explicit domain prefixes and direct-lookup sigils.
//!
//! Routing runs on every keystroke; the prefix is stripped before the term
//! is sent anywhere, not only when the override is first detected.

use crate::model::types::DomainId;

/// Outcome of routing one raw input string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingResult {
    pub override_detected: bool,
    pub domain: DomainId,
    pub cleaned_term: String,
}

/// Domain codes accepted before a `:`. One short and one long alias each.
const DOMAIN_CODES: &[(&str, DomainId)] = &[
    ("d", DomainId::Documents),
    ("docs", DomainId::Documents),
    ("u", DomainId::Accounts),
    ("users", DomainId::Accounts),
    ("a", DomainId::AdminActions),
    ("admin", DomainId::AdminActions),
];

/// Resolve the effective domain and cleaned term for `raw_input`.
///
/// Detection order, first match wins:
/// 1. `#` followed by at least one digit: direct lookup by id.
/// 2. `/` followed by at least one character: direct lookup by slug.
/// 3. A domain code followed by `:`.
/// 4. Otherwise no override; the caller's current domain applies.
pub fn route(raw_input: &str, current_domain: DomainId) -> RoutingResult {
    let trimmed = raw_input.trim();

    if let Some(rest) = trimmed.strip_prefix('#')
        && rest.starts_with(|c: char| c.is_ascii_digit())
    {
        let digits: String = rest.chars().take_while(char::is_ascii_digit).collect();
        return RoutingResult {
            override_detected: true,
            domain: DomainId::DirectLookup,
            cleaned_term: digits,
        };
    }

    if let Some(rest) = trimmed.strip_prefix('/')
        && !rest.is_empty()
    {
        return RoutingResult {
            override_detected: true,
            domain: DomainId::DirectLookup,
            cleaned_term: rest.trim().to_string(),
        };
    }

    if let Some(colon) = trimmed.find(':') {
        let code = trimmed[..colon].to_lowercase();
        for (alias, domain) in DOMAIN_CODES {
            if code == *alias {
                return RoutingResult {
                    override_detected: true,
                    domain: *domain,
                    cleaned_term: trimmed[colon + 1..].trim().to_string(),
                };
            }
        }
    }

    RoutingResult {
        override_detected: false,
        domain: current_domain,
        cleaned_term: trimmed.to_string(),
    }
}
