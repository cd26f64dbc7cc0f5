//! Admin-menu registry and the server-side admin-actions strategy.
//!
//! Every entry maps to a required capability through an explicit table;
//! locations the table does not know require the edit capability, so an
//! unrecognized page is never more visible than a recognized one.

use std::collections::BTreeMap;

use crate::model::permission::{Capability, PermissionOracle};
use crate::model::types::{DomainId, MenuPage, ResultItem};

/// One navigable admin page, optionally nested under a parent menu.
#[derive(Debug, Clone)]
pub struct MenuEntry {
    pub title: String,
    pub location: String,
    pub parent: Option<String>,
}

impl MenuEntry {
    fn top(title: &str, location: &str) -> Self {
        Self {
            title: title.into(),
            location: location.into(),
            parent: None,
        }
    }

    fn sub(title: &str, location: &str, parent: &str) -> Self {
        Self {
            title: title.into(),
            location: location.into(),
            parent: Some(parent.into()),
        }
    }
}

/// Capability required to open a location.
pub fn required_capability(location: &str) -> Capability {
    // Query arguments never change the requirement.
    let base = location.split('?').next().unwrap_or(location);
    match base {
        "dashboard" => Capability::Read,
        "media" => Capability::UploadFiles,
        "documents" | "documents/new" | "pages" | "pages/new" | "comments" | "tools" => {
            Capability::EditDocuments
        }
        "themes" => Capability::ManageThemes,
        "plugins" => Capability::ManagePlugins,
        "accounts" => Capability::ListAccounts,
        "accounts/new" => Capability::CreateAccounts,
        "settings/general" | "settings/reading" | "settings/search" => Capability::ManageSettings,
        // Conservative default for unrecognized locations.
        _ => Capability::EditDocuments,
    }
}

/// The flat set of admin pages known to this deployment.
#[derive(Debug, Clone)]
pub struct MenuRegistry {
    entries: Vec<MenuEntry>,
}

impl MenuRegistry {
    pub fn new(entries: Vec<MenuEntry>) -> Self {
        Self { entries }
    }

    /// Registry mirroring the stock admin navigation.
    pub fn builtin() -> Self {
        Self::new(vec![
            MenuEntry::top("Dashboard", "dashboard"),
            MenuEntry::top("Documents", "documents"),
            MenuEntry::sub("New Document", "documents/new", "Documents"),
            MenuEntry::top("Media Library", "media"),
            MenuEntry::top("Pages", "pages"),
            MenuEntry::sub("New Page", "pages/new", "Pages"),
            MenuEntry::top("Comments", "comments"),
            MenuEntry::top("Appearance", "themes"),
            MenuEntry::top("Plugins", "plugins"),
            MenuEntry::top("Accounts", "accounts"),
            MenuEntry::sub("New Account", "accounts/new", "Accounts"),
            MenuEntry::top("Tools", "tools"),
            MenuEntry::sub("General Settings", "settings/general", "Settings"),
            MenuEntry::sub("Reading Settings", "settings/reading", "Settings"),
            MenuEntry::sub("Search Settings", "settings/search", "Settings"),
        ])
    }

    /// Pages the requester may open, in registry order. This is the snapshot
    /// handed to clients at session bootstrap.
    pub fn visible_pages(&self, oracle: &dyn PermissionOracle) -> Vec<MenuPage> {
        self.entries
            .iter()
            .filter(|e| oracle.can(required_capability(&e.location)))
            .map(|e| MenuPage {
                title: e.title.clone(),
                location: e.location.clone(),
                parent: e.parent.clone(),
            })
            .collect()
    }

    /// Containment match over entry titles, permission-gated per entry and
    /// deduplicated by resolved location.
    pub fn search(&self, term: &str, oracle: &dyn PermissionOracle) -> Vec<ResultItem> {
        let needle = term.to_lowercase();
        let mut found: BTreeMap<&str, &MenuEntry> = BTreeMap::new();
        for entry in &self.entries {
            if entry.title.is_empty() {
                continue;
            }
            if !oracle.can(required_capability(&entry.location)) {
                continue;
            }
            if entry.title.to_lowercase().contains(&needle) {
                found.entry(entry.location.as_str()).or_insert(entry);
            }
        }
        found.values().map(|e| to_item(e)).collect()
    }
}

fn to_item(entry: &MenuEntry) -> ResultItem {
    let id = match &entry.parent {
        Some(parent) => slugify(&format!("{parent} {}", entry.title)),
        None => slugify(&entry.title),
    };
    ResultItem {
        domain: DomainId::AdminActions,
        id,
        title: entry.title.clone(),
        kind_label: Some("Admin".into()),
        status_label: None,
        edit_locator: entry.location.clone(),
        view_locator: None,
        modified_at: None,
        created_at: None,
        author_label: entry.parent.clone(),
    }
}

/// Lowercased, dash-separated slug of a title.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut last_dash = true;
    for c in text.chars() {
        if c.is_alphanumeric() {
            slug.extend(c.to_lowercase());
            last_dash = false;
        } else if !last_dash {
            slug.push('-');
            last_dash = true;
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::permission::{PermissionLevel, TieredOracle};

    fn oracle(level: PermissionLevel) -> TieredOracle {
        TieredOracle {
            account_id: 1,
            level,
        }
    }

    #[test]
    fn search_is_permission_gated_per_entry() {
        let registry = MenuRegistry::builtin();
        let hits = registry.search("settings", &oracle(PermissionLevel::EditOwn));
        assert!(hits.is_empty());

        let hits = registry.search("settings", &oracle(PermissionLevel::EditOthers));
        assert_eq!(hits.len(), 3);
    }

    #[test]
    fn submenu_hits_carry_parent_label() {
        let registry = MenuRegistry::builtin();
        let hits = registry.search("new document", &oracle(PermissionLevel::EditOwn));
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].author_label.as_deref(), Some("Documents"));
        assert_eq!(hits[0].id, "documents-new-document");
        assert_eq!(hits[0].edit_locator, "documents/new");
    }

    #[test]
    fn duplicate_locations_are_deduplicated() {
        let registry = MenuRegistry::new(vec![
            MenuEntry::top("Media Library", "media"),
            MenuEntry::sub("Media Library", "media", "Tools"),
        ]);
        let hits = registry.search(
            "media",
            &oracle(PermissionLevel::EditOwn),
        );
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn unknown_location_requires_edit_capability() {
        assert_eq!(
            required_capability("mystery-page"),
            Capability::EditDocuments
        );
        // Query args do not change the requirement.
        assert_eq!(
            required_capability("accounts?filter=active"),
            Capability::ListAccounts
        );
    }

    #[test]
    fn visible_pages_shrink_with_tier() {
        let registry = MenuRegistry::builtin();
        let baseline = registry.visible_pages(&oracle(PermissionLevel::Baseline));
        let editor = registry.visible_pages(&oracle(PermissionLevel::EditOthers));
        assert_eq!(baseline.len(), 1);
        assert_eq!(baseline[0].location, "dashboard");
        assert_eq!(editor.len(), registry.entries.len());
    }

    #[test]
    fn slugify_collapses_separators() {
        assert_eq!(slugify("General  Settings!"), "general-settings");
        assert_eq!(slugify("  Tools "), "tools");
    }
}
