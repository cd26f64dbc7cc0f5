//! Grouping of ranked per-domain results into a wire response.

use std::collections::BTreeMap;

use crate::model::types::{DomainId, RankedGroup, ResponseMeta, SearchResponse};

/// Drop empty groups and compute the total. An all-empty input still yields
/// a well-formed response with an empty `groups` mapping.
pub fn aggregate(
    per_domain: BTreeMap<DomainId, RankedGroup>,
    term: &str,
    domain: DomainId,
    context: &str,
) -> SearchResponse {
    let mut groups = BTreeMap::new();
    let mut total_count = 0usize;
    for (key, group) in per_domain {
        if group.is_empty() {
            continue;
        }
        total_count += group.len();
        groups.insert(key.wire_key().to_string(), group);
    }
    SearchResponse {
        groups,
        total_count,
        meta: ResponseMeta {
            query: term.to_string(),
            domain,
            context: context.to_string(),
        },
    }
}

/// A well-formed response with no groups at all.
pub fn empty_response(term: &str, domain: DomainId, context: &str) -> SearchResponse {
    aggregate(BTreeMap::new(), term, domain, context)
}
