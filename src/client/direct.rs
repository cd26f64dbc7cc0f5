//! Direct lookup against the pre-loaded admin-menu snapshot.
//!
//! Served entirely on the client: no network call, no request-id machinery.
//! The snapshot is read-only after session bootstrap.

use crate::model::types::{DomainId, MenuPage, ResultItem};
use crate::server::menu::slugify;

/// Admin pages fetched once at session start.
#[derive(Debug, Clone, Default)]
pub struct MenuSnapshot {
    pages: Vec<MenuPage>,
}

impl MenuSnapshot {
    pub fn new(pages: Vec<MenuPage>) -> Self {
        Self { pages }
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Case-insensitive substring containment on page titles, deduplicated
    /// by resolved location.
    pub fn lookup(&self, term: &str) -> Vec<ResultItem> {
        let needle = term.to_lowercase();
        let mut seen = std::collections::HashSet::new();
        let mut out = Vec::new();
        for page in &self.pages {
            if !page.title.to_lowercase().contains(&needle) {
                continue;
            }
            if !seen.insert(page.location.as_str()) {
                continue;
            }
            out.push(to_item(page));
        }
        out
    }
}

fn to_item(page: &MenuPage) -> ResultItem {
    let id = match &page.parent {
        Some(parent) => slugify(&format!("{parent} {}", page.title)),
        None => slugify(&page.title),
    };
    ResultItem {
        domain: DomainId::AdminActions,
        id,
        title: page.title.clone(),
        kind_label: Some("Admin".into()),
        status_label: None,
        edit_locator: page.location.clone(),
        view_locator: None,
        modified_at: None,
        created_at: None,
        author_label: page.parent.clone(),
    }
}
