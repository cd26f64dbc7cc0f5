//! Relevance ordering within one result group.
//!
//! Two-tier comparator: titles that start with the term (case-insensitive)
//! rank above titles that merely contain it; ties break alphabetically on
//! the lowercased title with a locale-independent ordinal comparison. The
//! ranker operates purely on title strings, so ordering is identical no
//! matter which storage executed the containment match.

use crate::model::types::{RankedGroup, ResultItem};

/// Match tier: 0 = starts-with, 1 = any other match.
fn tier(title: &str, needle_lower: &str) -> u8 {
    if title.to_lowercase().starts_with(needle_lower) {
        0
    } else {
        1
    }
}

/// Order `items` by tier ascending, then title ascending.
pub fn rank(term: &str, mut items: Vec<ResultItem>) -> RankedGroup {
    let needle = term.to_lowercase();
    items.sort_by(|a, b| {
        tier(&a.title, &needle)
            .cmp(&tier(&b.title, &needle))
            .then_with(|| a.title.to_lowercase().cmp(&b.title.to_lowercase()))
    });
    items
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::types::DomainId;

    fn item(title: &str) -> ResultItem {
        ResultItem {
            domain: DomainId::Documents,
            id: title.to_lowercase(),
            title: title.to_string(),
            kind_label: None,
            status_label: None,
            edit_locator: String::new(),
            view_locator: None,
            modified_at: None,
            created_at: None,
            author_label: None,
        }
    }

    fn titles(group: &RankedGroup) -> Vec<&str> {
        group.iter().map(|i| i.title.as_str()).collect()
    }

    #[test]
    fn starts_with_beats_contains_then_alphabetical() {
        let ranked = rank(
            "cat",
            vec![item("Category"), item("Bobcat"), item("catalog")],
        );
        assert_eq!(titles(&ranked), vec!["catalog", "Category", "Bobcat"]);
    }

    #[test]
    fn comparison_is_case_insensitive() {
        let ranked = rank("ann", vec![item("banner"), item("Anna")]);
        assert_eq!(titles(&ranked), vec!["Anna", "banner"]);
    }

    #[test]
    fn ordering_invariant_holds_for_any_input_order() {
        let needle = "log";
        let inputs = vec![
            item("Logbook"),
            item("Catalog"),
            item("login page"),
            item("Backlog"),
        ];
        let ranked = rank(needle, inputs);
        for pair in ranked.windows(2) {
            let ta = tier(&pair[0].title, needle);
            let tb = tier(&pair[1].title, needle);
            assert!(ta <= tb);
            if ta == tb {
                assert!(pair[0].title.to_lowercase() <= pair[1].title.to_lowercase());
            }
        }
    }
}
