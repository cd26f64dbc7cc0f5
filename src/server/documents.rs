//! Documents strategy: title-only containment per configured category.

use anyhow::Result;
use tracing::warn;

use crate::model::permission::PermissionOracle;
use crate::model::types::{DomainId, ResultItem};
use crate::server::visibility;
use crate::storage::sqlite::{Catalog, DocumentRecord};

/// Cap applied independently to each searchable category.
pub const PER_CATEGORY_CAP: usize = 8;

/// Search each configured category independently and merge the hits into one
/// unordered list. A failing category degrades to zero results for that
/// category only.
pub fn search(
    catalog: &Catalog,
    categories: &[String],
    term: &str,
    oracle: &dyn PermissionOracle,
) -> Result<Vec<ResultItem>> {
    let statuses = visibility::allowed_statuses(oracle.level());
    let mut out = Vec::new();

    for category in categories {
        let rows = match catalog.match_documents(category, term, statuses, PER_CATEGORY_CAP) {
            Ok(rows) => rows,
            Err(e) => {
                warn!(category = %category, error = %e, "document category search failed");
                continue;
            }
        };
        for row in rows {
            // Belt-and-suspenders: status was already constrained, but the
            // specific requester must still be able to read the item.
            if !oracle.can_read(row.status, row.author_id) {
                continue;
            }
            out.push(to_item(row));
        }
    }
    Ok(out)
}

fn to_item(row: DocumentRecord) -> ResultItem {
    ResultItem {
        domain: DomainId::Documents,
        id: row.id.to_string(),
        title: row.title,
        kind_label: Some(category_label(&row.category)),
        status_label: Some(row.status.label().to_string()),
        edit_locator: format!("documents/{}/edit", row.id),
        view_locator: Some(format!("documents/{}", row.id)),
        modified_at: row.modified_at,
        created_at: row.created_at,
        author_label: None,
    }
}

/// Singular badge label for a category slug.
fn category_label(category: &str) -> String {
    let mut chars = category.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}
