//! Accounts strategy: containment over login, email, and display name.

use anyhow::Result;

use crate::model::permission::{Capability, PermissionOracle};
use crate::model::types::{DomainId, ResultItem};
use crate::storage::sqlite::{AccountRecord, Catalog};

/// Total cap for account matches.
pub const ACCOUNTS_CAP: usize = 20;

/// Search accounts. Requesters without the account-listing capability get an
/// empty result, not an error.
pub fn search(catalog: &Catalog, term: &str, oracle: &dyn PermissionOracle) -> Result<Vec<ResultItem>> {
    if !oracle.can(Capability::ListAccounts) {
        return Ok(Vec::new());
    }
    let rows = catalog.match_accounts(term, ACCOUNTS_CAP)?;
    Ok(rows.into_iter().map(to_item).collect())
}

fn to_item(row: AccountRecord) -> ResultItem {
    ResultItem {
        domain: DomainId::Accounts,
        id: row.id.to_string(),
        title: row.display_name,
        kind_label: row.role_label,
        status_label: None,
        edit_locator: format!("accounts/{}/edit", row.id),
        view_locator: None,
        modified_at: None,
        created_at: None,
        author_label: Some(row.login),
    }
}
