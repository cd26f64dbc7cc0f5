//! Multi-domain query executor.
//!
//! One domain per request. Strategy failures degrade to zero results for
//! the affected domain; a response is always well-formed.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::model::permission::{Capability, PermissionOracle};
use crate::model::types::{DomainId, SearchResponse, SessionBootstrap};
use crate::server::{accounts, aggregate, documents, menu::MenuRegistry, rank};
use crate::storage::sqlite::Catalog;

/// Default searchable document categories.
pub fn default_categories() -> Vec<String> {
    vec!["article".to_string(), "page".to_string()]
}

pub struct QueryExecutor {
    catalog: Arc<Catalog>,
    menu: MenuRegistry,
    categories: Vec<String>,
}

impl QueryExecutor {
    pub fn new(catalog: Arc<Catalog>, menu: MenuRegistry, categories: Vec<String>) -> Self {
        Self {
            catalog,
            menu,
            categories,
        }
    }

    /// Execute one single-domain query and return ranked, grouped results.
    pub fn execute(
        &self,
        term: &str,
        domain: DomainId,
        context: &str,
        oracle: &dyn PermissionOracle,
    ) -> SearchResponse {
        if term.chars().count() < domain.min_term_len() {
            // Below-minimum terms are not an error; echo an empty response.
            return aggregate::empty_response(term, domain, context);
        }

        let items = match domain {
            DomainId::Documents => {
                match documents::search(&self.catalog, &self.categories, term, oracle) {
                    Ok(items) => items,
                    Err(e) => {
                        warn!(domain = %domain, term = term, error = %e, "strategy failed");
                        Vec::new()
                    }
                }
            }
            DomainId::Accounts => match accounts::search(&self.catalog, term, oracle) {
                Ok(items) => items,
                Err(e) => {
                    warn!(domain = %domain, term = term, error = %e, "strategy failed");
                    Vec::new()
                }
            },
            DomainId::AdminActions => {
                // The admin domain as a whole requires the edit capability.
                if oracle.can(Capability::EditDocuments) {
                    self.menu.search(term, oracle)
                } else {
                    Vec::new()
                }
            }
            DomainId::DirectLookup => {
                // Resolved client-side; should never reach the executor.
                warn!(term = term, "direct-lookup query reached the executor");
                Vec::new()
            }
        };

        debug!(domain = %domain, term = term, hits = items.len(), "query executed");

        let ranked = rank::rank(term, items);
        let mut per_domain = BTreeMap::new();
        per_domain.insert(domain, ranked);
        aggregate::aggregate(per_domain, term, domain, context)
    }

    /// Session bootstrap: the menu snapshot the requester may see plus the
    /// read-only idle panels.
    pub fn bootstrap(&self, oracle: &dyn PermissionOracle) -> SessionBootstrap {
        let pages = self.menu.visible_pages(oracle);
        let favorites = self.catalog.favorites(20).unwrap_or_else(|e| {
            warn!(error = %e, "favorites fetch failed");
            Vec::new()
        });
        let recents = self.catalog.recents(20).unwrap_or_else(|e| {
            warn!(error = %e, "history fetch failed");
            Vec::new()
        });
        SessionBootstrap {
            pages,
            favorites,
            recents,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::permission::{PermissionLevel, TieredOracle};
    use crate::model::types::Status;

    fn executor() -> QueryExecutor {
        let catalog = Catalog::open_in_memory().unwrap();
        catalog
            .insert_document("article", "catalog", Status::Published, 1, None, None)
            .unwrap();
        catalog
            .insert_document("article", "Bobcat", Status::Published, 1, None, None)
            .unwrap();
        catalog
            .insert_document("article", "Category", Status::Published, 1, None, None)
            .unwrap();
        catalog
            .insert_account("anna", "anna@example.com", "anna", None)
            .unwrap();
        QueryExecutor::new(
            Arc::new(catalog),
            MenuRegistry::builtin(),
            default_categories(),
        )
    }

    fn oracle(level: PermissionLevel) -> TieredOracle {
        TieredOracle {
            account_id: 1,
            level,
        }
    }

    #[test]
    fn results_are_ranked_within_the_group() {
        let exec = executor();
        let resp = exec.execute(
            "cat",
            DomainId::Documents,
            "palette",
            &oracle(PermissionLevel::Baseline),
        );
        let titles: Vec<_> = resp.groups["documents"]
            .iter()
            .map(|i| i.title.as_str())
            .collect();
        assert_eq!(titles, vec!["catalog", "Category", "Bobcat"]);
        assert_eq!(resp.total_count, 3);
    }

    #[test]
    fn below_minimum_term_is_an_empty_well_formed_response() {
        let exec = executor();
        let resp = exec.execute(
            "c",
            DomainId::Documents,
            "palette",
            &oracle(PermissionLevel::Baseline),
        );
        assert!(resp.is_empty());
        assert_eq!(resp.meta.query, "c");
    }

    #[test]
    fn admin_domain_requires_edit_capability() {
        let exec = executor();
        let resp = exec.execute(
            "settings",
            DomainId::AdminActions,
            "palette",
            &oracle(PermissionLevel::Baseline),
        );
        assert!(resp.is_empty());

        let resp = exec.execute(
            "settings",
            DomainId::AdminActions,
            "palette",
            &oracle(PermissionLevel::EditOthers),
        );
        assert_eq!(resp.total_count, 3);
    }

    #[test]
    fn direct_lookup_never_produces_server_results() {
        let exec = executor();
        let resp = exec.execute(
            "42",
            DomainId::DirectLookup,
            "palette",
            &oracle(PermissionLevel::EditOthers),
        );
        assert!(resp.is_empty());
    }

    #[test]
    fn bootstrap_pages_respect_tier() {
        let exec = executor();
        let boot = exec.bootstrap(&oracle(PermissionLevel::Baseline));
        assert_eq!(boot.pages.len(), 1);
        let boot = exec.bootstrap(&oracle(PermissionLevel::EditOthers));
        assert!(boot.pages.len() > 10);
    }
}
